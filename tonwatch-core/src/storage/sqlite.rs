//! SQLite-backed [`Storage`] implementation.

use super::{Storage, StorageError, TrackedWallet};
use async_trait::async_trait;
use sqlx::SqlitePool;

const WALLET_COLUMNS: &str =
    "id, user_id, name, address_raw, address_display, min_amount_ton, created_at";

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the schema if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS wallets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                address_raw TEXT NOT NULL,
                address_display TEXT NOT NULL,
                min_amount_ton REAL,
                created_at INTEGER NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_wallets_address_raw ON wallets(address_raw)",
            "CREATE TABLE IF NOT EXISTS processed_events (
                wallet_id INTEGER NOT NULL,
                event_id TEXT NOT NULL,
                PRIMARY KEY (wallet_id, event_id)
            )",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn all_wallets(&self) -> Result<Vec<TrackedWallet>, StorageError> {
        let wallets = sqlx::query_as::<_, TrackedWallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(wallets)
    }

    async fn wallets_by_raw_address(
        &self,
        address_raw: &str,
    ) -> Result<Vec<TrackedWallet>, StorageError> {
        let wallets = sqlx::query_as::<_, TrackedWallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE address_raw = ?1"
        ))
        .bind(address_raw)
        .fetch_all(&self.pool)
        .await?;
        Ok(wallets)
    }

    async fn mark_event_processed(
        &self,
        wallet_id: i64,
        event_id: &str,
    ) -> Result<bool, StorageError> {
        // Single constraint-checked write; rows_affected tells us whether
        // this caller won the insert.
        let result = sqlx::query(
            "INSERT OR IGNORE INTO processed_events (wallet_id, event_id) VALUES (?1, ?2)",
        )
        .bind(wallet_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
