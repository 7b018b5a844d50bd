//! Long-running pipeline components.
//!
//! - `SubscriptionSynchronizer`: reconciles upstream webhook subscriptions
//!   with the tracked-wallet set on a fixed interval.
//! - `EventReceiver`: deduplicates inbound webhook events and fans them out
//!   to the notification sink.
//! - `BackfillSeeder`: one-shot startup pass that marks each wallet's
//!   recent history as already processed.

pub mod backfill;
pub mod event_receiver;
pub mod subscription_sync;

pub use backfill::{BackfillSeeder, SeedSummary};
pub use event_receiver::{EventReceiver, Outcome};
pub use subscription_sync::{SubscriptionSynchronizer, SyncError, reconcile};

#[cfg(test)]
pub(crate) mod testutil;
