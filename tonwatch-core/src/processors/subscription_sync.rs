//! Subscription synchronizer.
//!
//! A periodic control loop that converges the set of addresses subscribed
//! at the upstream push service toward the set of addresses currently
//! tracked in storage. Each tick is self-contained and idempotent: a
//! failed or interrupted tick simply leaves a divergence that the next
//! tick corrects.

use crate::storage::{Storage, StorageError};
use crate::tonapi::{ClientError, TonApi};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Compute the incremental subscribe/unsubscribe sets for one tick.
///
/// Output is sorted so ticks are deterministic.
pub fn reconcile(
    needed: &HashSet<String>,
    subscribed: &HashSet<String>,
) -> (Vec<String>, Vec<String>) {
    let mut to_add: Vec<String> = needed.difference(subscribed).cloned().collect();
    let mut to_remove: Vec<String> = subscribed.difference(needed).cloned().collect();
    to_add.sort();
    to_remove.sort();
    (to_add, to_remove)
}

#[derive(Default)]
struct SyncState {
    webhook_id: Option<i64>,
    /// Last known upstream-subscribed set. Empty on the first tick, so the
    /// first tick subscribes everything needed and removes nothing.
    subscribed: HashSet<String>,
}

pub struct SubscriptionSynchronizer {
    storage: Arc<dyn Storage>,
    api: Arc<dyn TonApi>,
    /// `None` means no callback endpoint is configured and the component is
    /// permanently disabled. Valid configuration, not an error.
    endpoint: Option<String>,
    // The lock is held for a whole tick so ticks never overlap.
    state: Mutex<SyncState>,
}

impl SubscriptionSynchronizer {
    pub fn new(
        storage: Arc<dyn Storage>,
        api: Arc<dyn TonApi>,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            storage,
            api,
            endpoint: endpoint.filter(|e| !e.is_empty()),
            state: Mutex::new(SyncState::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Adopt an existing upstream registration for our endpoint, or create
    /// one. No-op when disabled or already initialized.
    pub async fn init(&self) -> Result<(), ClientError> {
        let Some(endpoint) = &self.endpoint else {
            info!("webhook endpoint not configured, subscription sync disabled");
            return Ok(());
        };

        let mut state = self.state.lock().await;
        if state.webhook_id.is_some() {
            return Ok(());
        }
        state.webhook_id = Some(find_or_create(self.api.as_ref(), endpoint).await?);
        Ok(())
    }

    /// Execute one sync tick.
    pub async fn sync_once(&self) -> Result<(), SyncError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        let mut state = self.state.lock().await;

        // Startup registration may have failed; re-attempt before
        // reconciling instead of no-opping forever.
        let webhook_id = match state.webhook_id {
            Some(id) => id,
            None => {
                let id = find_or_create(self.api.as_ref(), endpoint).await?;
                state.webhook_id = Some(id);
                id
            }
        };

        let wallets = self.storage.all_wallets().await?;
        let needed: HashSet<String> = wallets.into_iter().map(|w| w.address_raw).collect();
        let (to_add, to_remove) = reconcile(&needed, &state.subscribed);

        if !to_add.is_empty() {
            match self.api.subscribe_accounts(webhook_id, &to_add).await {
                Ok(()) => {
                    info!(count = to_add.len(), "subscribed accounts");
                    state.subscribed.extend(to_add);
                }
                // Cache stays unchanged; these addresses retry next tick.
                Err(e) => error!(error = %e, count = to_add.len(), "subscribe accounts"),
            }
        }

        if !to_remove.is_empty() {
            match self.api.unsubscribe_accounts(webhook_id, &to_remove).await {
                Ok(()) => {
                    info!(count = to_remove.len(), "unsubscribed accounts");
                    for address in &to_remove {
                        state.subscribed.remove(address);
                    }
                }
                Err(e) => error!(error = %e, count = to_remove.len(), "unsubscribe accounts"),
            }
        }

        Ok(())
    }

    /// Run the periodic sync loop until shutdown.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        startup_delay: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if self.endpoint.is_none() {
            return;
        }

        // Let the rest of the process finish booting first.
        tokio::select! {
            biased;
            _ = wait_shutdown(&mut shutdown) => return,
            _ = tokio::time::sleep(startup_delay) => {}
        }

        info!(interval_secs = interval.as_secs(), "subscription sync loop started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = wait_shutdown(&mut shutdown) => break,

                _ = ticker.tick() => {
                    debug!("sync tick");
                    if let Err(e) = self.sync_once().await {
                        error!(error = %e, "sync subscriptions");
                    }
                }
            }
        }

        info!("subscription sync loop stopped");
    }
}

async fn find_or_create(api: &dyn TonApi, endpoint: &str) -> Result<i64, ClientError> {
    let webhooks = api.list_webhooks().await?;
    if let Some(existing) = webhooks.iter().find(|w| w.endpoint == endpoint) {
        info!(webhook_id = existing.id, "using existing webhook registration");
        return Ok(existing.id);
    }

    let created = api.create_webhook(endpoint).await?;
    info!(webhook_id = created.id, "created webhook registration");
    Ok(created.id)
}

async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
