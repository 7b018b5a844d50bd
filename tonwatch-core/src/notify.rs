//! Downstream notification seam.

use crate::storage::TrackedWallet;
use crate::tonapi::TxEvent;
use async_trait::async_trait;

pub type DeliverError = Box<dyn std::error::Error + Send + Sync>;

/// Downstream handler invoked once per newly-seen (wallet, event) pair.
///
/// Implementations own formatting and the actual delivery channel; a
/// failure here only affects this wallet's delivery and is never retried
/// by the receiver.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, wallet: &TrackedWallet, event: &TxEvent) -> Result<(), DeliverError>;
}
