//! tonwatch Server
//!
//! Watches TON wallets through the TonAPI webhook push channel and notifies
//! their owners about new on-chain activity.

mod config;
mod notifier;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use notifier::TelegramNotifier;
use server::{build_router, run_server};
use shutdown::signal_then_broadcast;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tonwatch_core::processors::{BackfillSeeder, EventReceiver, SubscriptionSynchronizer};
use tonwatch_core::storage::SqliteStorage;
use tonwatch_core::tonapi::TonApiClient;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// tonwatch - TON wallet activity tracker
#[derive(Parser, Debug)]
#[command(name = "tonwatch-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./tonwatch.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting tonwatch-server v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    let listen_addr = config.server.listen;

    // Open the database, creating the file and schema on first run.
    let connect_options = SqliteConnectOptions::new()
        .filename(&config.storage.path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open database at {}: {}", config.storage.path, e);
            e
        })?;
    let storage = SqliteStorage::new(db_pool.clone());
    storage.migrate().await?;
    tracing::info!("Database ready at {}", config.storage.path);

    // One shutdown channel observed by every loop and in-flight upstream call.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let storage: Arc<dyn tonwatch_core::storage::Storage> = Arc::new(storage);
    let api: Arc<dyn tonwatch_core::tonapi::TonApi> = Arc::new(TonApiClient::new(
        config.tonapi.base_url.clone(),
        Some(config.tonapi.api_key.clone()),
        Duration::from_millis(config.tonapi.min_interval_ms),
        shutdown_rx.clone(),
    ));

    let sink = Arc::new(TelegramNotifier::new(
        config.notify.bot_token.clone(),
        config.notify.min_transfer_ton,
    ));
    let receiver = Arc::new(EventReceiver::new(
        storage.clone(),
        api.clone(),
        sink,
    ));

    // Register the webhook up front so pushes can arrive while the first
    // sync tick is still pending; a failure here is retried by the loop.
    let synchronizer = Arc::new(SubscriptionSynchronizer::new(
        storage.clone(),
        api.clone(),
        Some(config.webhook.endpoint.clone()),
    ));
    if synchronizer.is_enabled()
        && let Err(e) = synchronizer.init().await
    {
        tracing::warn!("Initial webhook registration failed, will retry: {}", e);
    }
    let sync_handle = tokio::spawn(synchronizer.clone().run(
        Duration::from_secs(config.webhook.sync_interval_secs),
        Duration::from_secs(config.webhook.startup_delay_secs),
        shutdown_rx.clone(),
    ));

    // Seed the dedup ledger so pre-existing activity is never re-notified.
    let seeder = BackfillSeeder::new(storage.clone(), api.clone(), config.backfill.depth);
    tokio::spawn(async move {
        seeder.run().await;
    });

    let router = build_router(AppState::new(receiver));

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(
        router,
        listen_addr,
        signal_then_broadcast(shutdown_tx.clone()),
    )
    .await;

    // The server only returns after the signal fired; make sure the loops
    // see it even if the graceful-shutdown future was dropped early.
    let _ = shutdown_tx.send(true);
    let _ = sync_handle.await;

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
