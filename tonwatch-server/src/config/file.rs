//! TOML file configuration structures.
//!
//! These structs directly map to the `tonwatch.toml` file format. Every
//! section and field has a default so a minimal file (or an empty one) still
//! produces a runnable configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tonapi: TonApiConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Upstream indexer API section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TonApiConfig {
    #[serde(default = "default_tonapi_base_url")]
    pub base_url: String,
    /// Bearer token. Empty means unauthenticated requests.
    #[serde(default)]
    pub api_key: String,
    /// Minimum spacing between upstream request starts, process-wide.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for TonApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_tonapi_base_url(),
            api_key: String::new(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

fn default_tonapi_base_url() -> String {
    "https://tonapi.io/v2".to_string()
}

fn default_min_interval_ms() -> u64 {
    250
}

/// Webhook registration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Public callback URL the upstream service pushes events to. Empty
    /// disables subscription sync entirely.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            sync_interval_secs: default_sync_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
        }
    }
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_startup_delay_secs() -> u64 {
    5
}

/// SQLite storage section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> String {
    "./tonwatch.db".to_string()
}

/// Startup backfill section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// How many recent events per wallet to mark as already processed.
    #[serde(default = "default_backfill_depth")]
    pub depth: u32,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            depth: default_backfill_depth(),
        }
    }
}

fn default_backfill_depth() -> u32 {
    5
}

/// Notification delivery section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Telegram bot token. Empty means log-only delivery.
    #[serde(default)]
    pub bot_token: String,
    /// Global floor for transfer notifications, in TON. Zero disables it.
    #[serde(default)]
    pub min_transfer_ton: f64,
}
