//! Storage collaborator.
//!
//! The processors only ever consume the small surface defined by the
//! [`Storage`] trait: listing tracked wallets, resolving a raw address to
//! its subscribers, and the atomic processed-event insert that doubles as
//! the deduplication decision. Wallet CRUD lives outside this pipeline.

mod sqlite;

use async_trait::async_trait;

pub use sqlite::SqliteStorage;

/// A wallet a subscriber asked to be notified about.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TrackedWallet {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    /// Raw (`0:...`) address, the form the upstream pushes events under.
    pub address_raw: String,
    /// User-friendly (`UQ...`/`EQ...`) address for display.
    pub address_display: String,
    /// Minimum transfer amount (in TON) below which the subscriber does not
    /// want to be notified.
    pub min_amount_ton: Option<f64>,
    /// Unix seconds.
    pub created_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistent record store operations consumed by the pipeline.
#[async_trait]
pub trait Storage: Send + Sync {
    /// All tracked wallets across all subscribers.
    async fn all_wallets(&self) -> Result<Vec<TrackedWallet>, StorageError>;

    /// Wallets whose raw address matches `address_raw`. An address may be
    /// tracked by several subscribers.
    async fn wallets_by_raw_address(
        &self,
        address_raw: &str,
    ) -> Result<Vec<TrackedWallet>, StorageError>;

    /// Atomically record (wallet, event) as processed.
    ///
    /// Returns `true` only for the caller whose insert actually created the
    /// row. This return value is the dedup decision; there is no separate
    /// existence check anywhere.
    async fn mark_event_processed(
        &self,
        wallet_id: i64,
        event_id: &str,
    ) -> Result<bool, StorageError>;
}
