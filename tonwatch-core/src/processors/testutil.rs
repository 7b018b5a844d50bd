//! Shared in-memory fakes for processor tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::notify::{DeliverError, EventSink};
use crate::storage::{Storage, StorageError, TrackedWallet};
use crate::tonapi::{AccountInfo, ClientError, TonApi, TxEvent, WebhookInfo};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn wallet(id: i64, user_id: i64, address_raw: &str) -> TrackedWallet {
    TrackedWallet {
        id,
        user_id,
        name: format!("wallet-{id}"),
        address_raw: address_raw.to_string(),
        address_display: format!("UQ{address_raw}"),
        min_amount_ton: None,
        created_at: 0,
    }
}

pub fn event(event_id: &str) -> TxEvent {
    TxEvent {
        event_id: event_id.to_string(),
        timestamp: 1_700_000_000,
        ..TxEvent::default()
    }
}

fn upstream_error() -> ClientError {
    ClientError::Api {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "injected failure".to_string(),
    }
}

/// In-memory [`Storage`] with an injectable per-wallet mark failure and a
/// "was any method called" probe.
#[derive(Default)]
pub struct MockStorage {
    pub wallets: Mutex<Vec<TrackedWallet>>,
    pub ledger: Mutex<HashSet<(i64, String)>>,
    pub touched: AtomicBool,
    pub fail_mark_for: Mutex<Option<i64>>,
}

impl MockStorage {
    pub fn with_wallets(wallets: Vec<TrackedWallet>) -> Self {
        Self {
            wallets: Mutex::new(wallets),
            ..Self::default()
        }
    }

    pub fn set_wallets(&self, wallets: Vec<TrackedWallet>) {
        *self.wallets.lock().unwrap() = wallets;
    }

    pub fn ledger_len(&self) -> usize {
        self.ledger.lock().unwrap().len()
    }

    pub fn was_touched(&self) -> bool {
        self.touched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn all_wallets(&self) -> Result<Vec<TrackedWallet>, StorageError> {
        self.touched.store(true, Ordering::SeqCst);
        Ok(self.wallets.lock().unwrap().clone())
    }

    async fn wallets_by_raw_address(
        &self,
        address_raw: &str,
    ) -> Result<Vec<TrackedWallet>, StorageError> {
        self.touched.store(true, Ordering::SeqCst);
        Ok(self
            .wallets
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.address_raw == address_raw)
            .cloned()
            .collect())
    }

    async fn mark_event_processed(
        &self,
        wallet_id: i64,
        event_id: &str,
    ) -> Result<bool, StorageError> {
        self.touched.store(true, Ordering::SeqCst);
        if *self.fail_mark_for.lock().unwrap() == Some(wallet_id) {
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .insert((wallet_id, event_id.to_string())))
    }
}

/// In-memory [`TonApi`] that records subscription state and serves canned
/// events, with per-operation failure switches.
#[derive(Default)]
pub struct MockApi {
    pub webhooks: Mutex<Vec<WebhookInfo>>,
    pub subscribed: Mutex<HashSet<String>>,
    pub events_by_address: Mutex<HashMap<String, Vec<TxEvent>>>,
    pub events_by_hash: Mutex<HashMap<String, TxEvent>>,
    pub fail_list: AtomicBool,
    pub fail_subscribe: AtomicBool,
    pub fail_unsubscribe: AtomicBool,
    pub fail_get_events: AtomicBool,
}

impl MockApi {
    pub fn subscribed_set(&self) -> HashSet<String> {
        self.subscribed.lock().unwrap().clone()
    }

    pub fn put_events(&self, address: &str, events: Vec<TxEvent>) {
        self.events_by_address
            .lock()
            .unwrap()
            .insert(address.to_string(), events);
    }

    pub fn put_event_by_hash(&self, tx_hash: &str, event: TxEvent) {
        self.events_by_hash
            .lock()
            .unwrap()
            .insert(tx_hash.to_string(), event);
    }
}

#[async_trait]
impl TonApi for MockApi {
    async fn get_account_info(&self, address: &str) -> Result<AccountInfo, ClientError> {
        Ok(AccountInfo {
            address: address.to_string(),
            balance: 0,
            status: "active".to_string(),
        })
    }

    async fn get_events(&self, address: &str, limit: u32) -> Result<Vec<TxEvent>, ClientError> {
        if self.fail_get_events.load(Ordering::SeqCst) {
            return Err(upstream_error());
        }
        let events = self
            .events_by_address
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default();
        Ok(events.into_iter().take(limit as usize).collect())
    }

    async fn get_event_by_hash(&self, tx_hash: &str) -> Result<TxEvent, ClientError> {
        self.events_by_hash
            .lock()
            .unwrap()
            .get(tx_hash)
            .cloned()
            .ok_or_else(upstream_error)
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>, ClientError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(upstream_error());
        }
        Ok(self.webhooks.lock().unwrap().clone())
    }

    async fn create_webhook(&self, endpoint: &str) -> Result<WebhookInfo, ClientError> {
        let mut webhooks = self.webhooks.lock().unwrap();
        let info = WebhookInfo {
            id: webhooks.len() as i64 + 1,
            endpoint: endpoint.to_string(),
            subscribed_accounts: Vec::new(),
        };
        webhooks.push(info.clone());
        Ok(info)
    }

    async fn delete_webhook(&self, webhook_id: i64) -> Result<(), ClientError> {
        self.webhooks.lock().unwrap().retain(|w| w.id != webhook_id);
        Ok(())
    }

    async fn subscribe_accounts(
        &self,
        _webhook_id: i64,
        accounts: &[String],
    ) -> Result<(), ClientError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(upstream_error());
        }
        self.subscribed
            .lock()
            .unwrap()
            .extend(accounts.iter().cloned());
        Ok(())
    }

    async fn unsubscribe_accounts(
        &self,
        _webhook_id: i64,
        accounts: &[String],
    ) -> Result<(), ClientError> {
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(upstream_error());
        }
        let mut subscribed = self.subscribed.lock().unwrap();
        for account in accounts {
            subscribed.remove(account);
        }
        Ok(())
    }
}

/// [`EventSink`] that records deliveries and can fail for one wallet.
#[derive(Default)]
pub struct CountingSink {
    pub delivered: Mutex<Vec<(i64, String)>>,
    pub fail_for_wallet: Mutex<Option<i64>>,
}

impl CountingSink {
    pub fn deliveries(&self) -> Vec<(i64, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for CountingSink {
    async fn deliver(
        &self,
        wallet: &TrackedWallet,
        event: &TxEvent,
    ) -> Result<(), DeliverError> {
        if *self.fail_for_wallet.lock().unwrap() == Some(wallet.id) {
            return Err("injected delivery failure".into());
        }
        self.delivered
            .lock()
            .unwrap()
            .push((wallet.id, event.event_id.clone()));
        Ok(())
    }
}
