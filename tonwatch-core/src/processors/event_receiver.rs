//! Inbound event processing.
//!
//! The HTTP layer acknowledges a structurally valid payload immediately;
//! [`EventReceiver::process`] then runs detached from the request. For
//! each wallet tracking the event's account it makes an independent dedup
//! decision via the storage ledger and dispatches newly-seen pairs to the
//! sink concurrently, waiting for all dispatches of this event before
//! returning.

use crate::notify::EventSink;
use crate::storage::Storage;
use crate::tonapi::{TonApi, WebhookPayload, short_addr};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Non-actionable upstream notice categories; acknowledged and discarded.
pub fn is_ignorable_event_type(event_type: &str) -> bool {
    matches!(event_type, "mempool_msg" | "new_contract")
}

/// What processing a payload amounted to. Used for logging and tests; the
/// HTTP response does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    IgnoredEventType,
    MissingAccountId,
    NoMatchingWallets,
    LookupFailed,
    /// No event body could be obtained; processing aborted with no partial
    /// state written.
    EventUnavailable,
    Dispatched {
        dispatched: usize,
        suppressed: usize,
    },
}

pub struct EventReceiver {
    storage: Arc<dyn Storage>,
    api: Arc<dyn TonApi>,
    sink: Arc<dyn EventSink>,
}

impl EventReceiver {
    pub fn new(
        storage: Arc<dyn Storage>,
        api: Arc<dyn TonApi>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self { storage, api, sink }
    }

    pub async fn process(&self, payload: WebhookPayload) -> Outcome {
        if is_ignorable_event_type(&payload.event_type) {
            debug!(event_type = %payload.event_type, "ignoring non-actionable payload");
            return Outcome::IgnoredEventType;
        }

        if payload.account_id.is_empty() {
            warn!("webhook payload missing account_id");
            return Outcome::MissingAccountId;
        }

        let wallets = match self.storage.wallets_by_raw_address(&payload.account_id).await {
            Ok(wallets) => wallets,
            Err(e) => {
                error!(error = %e, "resolve wallets for account");
                return Outcome::LookupFailed;
            }
        };
        if wallets.is_empty() {
            debug!(
                account = %short_addr(&payload.account_id, 6),
                "no wallets track this account"
            );
            return Outcome::NoMatchingWallets;
        }

        let event = match payload.event {
            Some(event) => event,
            None if !payload.tx_hash.is_empty() => {
                match self.api.get_event_by_hash(&payload.tx_hash).await {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(
                            error = %e,
                            tx_hash = %short_addr(&payload.tx_hash, 6),
                            "fetch event by hash"
                        );
                        return Outcome::EventUnavailable;
                    }
                }
            }
            None => {
                warn!("payload carries neither event body nor tx_hash");
                return Outcome::EventUnavailable;
            }
        };
        if event.event_id.is_empty() {
            warn!("event has no event_id");
            return Outcome::EventUnavailable;
        }

        let event = Arc::new(event);
        let mut dispatched = 0usize;
        let mut suppressed = 0usize;
        let mut deliveries = JoinSet::new();

        for wallet in wallets {
            match self.storage.mark_event_processed(wallet.id, &event.event_id).await {
                Ok(true) => {
                    dispatched += 1;
                    let sink = self.sink.clone();
                    let event = event.clone();
                    deliveries.spawn(async move {
                        if let Err(e) = sink.deliver(&wallet, &event).await {
                            error!(
                                wallet_id = wallet.id,
                                user_id = wallet.user_id,
                                error = %e,
                                "deliver notification"
                            );
                        }
                    });
                }
                Ok(false) => {
                    debug!(
                        wallet_id = wallet.id,
                        event_id = %event.event_id,
                        "event already processed"
                    );
                    suppressed += 1;
                }
                Err(e) => {
                    // Not safe to dispatch; under-delivery beats duplicates.
                    error!(wallet_id = wallet.id, error = %e, "mark event processed");
                    suppressed += 1;
                }
            }
        }

        while let Some(result) = deliveries.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "delivery task failed");
            }
        }

        info!(
            event_id = %event.event_id,
            dispatched,
            suppressed,
            "event handled"
        );
        Outcome::Dispatched {
            dispatched,
            suppressed,
        }
    }
}
