//! Startup backfill of the processed-event ledger.
//!
//! Marks each tracked wallet's recent history as already processed so the
//! first webhook delivery (or a race with subscription sync) never
//! re-notifies pre-existing activity. Seeding never dispatches.

use crate::storage::Storage;
use crate::tonapi::TonApi;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    /// Wallets visited.
    pub wallets: usize,
    /// Ledger entries actually inserted.
    pub seeded: usize,
}

pub struct BackfillSeeder {
    storage: Arc<dyn Storage>,
    api: Arc<dyn TonApi>,
    depth: u32,
}

impl BackfillSeeder {
    pub fn new(storage: Arc<dyn Storage>, api: Arc<dyn TonApi>, depth: u32) -> Self {
        Self { storage, api, depth }
    }

    /// One-shot seeding pass. A failure on one wallet is logged and skipped
    /// without aborting the others.
    pub async fn run(&self) -> SeedSummary {
        let wallets = match self.storage.all_wallets().await {
            Ok(wallets) => wallets,
            Err(e) => {
                error!(error = %e, "load wallets for seeding");
                return SeedSummary::default();
            }
        };

        if wallets.is_empty() {
            info!("no wallets to seed");
            return SeedSummary::default();
        }

        info!(count = wallets.len(), depth = self.depth, "seeding event ledger");

        let mut summary = SeedSummary {
            wallets: wallets.len(),
            seeded: 0,
        };

        for wallet in wallets {
            let events = match self.api.get_events(&wallet.address_raw, self.depth).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(wallet_id = wallet.id, error = %e, "fetch events for seeding");
                    continue;
                }
            };

            for event in events {
                if event.event_id.is_empty() {
                    continue;
                }
                match self
                    .storage
                    .mark_event_processed(wallet.id, &event.event_id)
                    .await
                {
                    Ok(true) => summary.seeded += 1,
                    Ok(false) => {}
                    Err(e) => warn!(wallet_id = wallet.id, error = %e, "seed event"),
                }
            }
        }

        info!(seeded = summary.seeded, "seeding complete");
        summary
    }
}
