//! Rate-limited TonAPI HTTP client.
//!
//! Every outbound call to the upstream indexer goes through a single
//! [`Throttle`] so the process as a whole never exceeds the configured
//! request rate, no matter how many loops are calling concurrently.
//! Operations are also exposed through the [`TonApi`] trait so the
//! processors can be exercised against a mock upstream in tests.

pub mod types;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::debug;

pub use types::{
    AccountInfo, AccountRef, Action, JettonInfo, JettonSwap, TonTransfer, TxEvent, WebhookInfo,
    WebhookPayload, nano_to_ton, short_addr,
};
use types::{EventsResponse, WebhookListResponse};

/// Errors produced by the upstream client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream returned an error-range status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The shutdown signal fired before the call completed.
    #[error("call cancelled by shutdown")]
    Cancelled,
}

/// Process-wide minimum-interval throttle.
///
/// `acquire` hands each caller a start slot at least `min_interval` after
/// the previous one. The lock covers only the slot computation; the sleep
/// and the request itself happen outside it.
pub struct Throttle {
    min_interval: Duration,
    last_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_slot: Mutex::new(None),
        }
    }

    /// Block until this caller's slot arrives.
    pub async fn acquire(&self) {
        let slot = {
            let mut last = self.last_slot.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(prev) => (prev + self.min_interval).max(now),
                None => now,
            };
            *last = Some(slot);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Operations the rest of the system needs from the upstream indexer.
#[async_trait]
pub trait TonApi: Send + Sync {
    /// Resolve an address to canonical account info.
    async fn get_account_info(&self, address: &str) -> Result<AccountInfo, ClientError>;

    /// Fetch the most recent `limit` events for an account.
    async fn get_events(&self, address: &str, limit: u32) -> Result<Vec<TxEvent>, ClientError>;

    /// Fetch a single event by transaction hash.
    async fn get_event_by_hash(&self, tx_hash: &str) -> Result<TxEvent, ClientError>;

    /// List all webhook registrations.
    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>, ClientError>;

    /// Create a webhook registration for the given callback endpoint.
    async fn create_webhook(&self, endpoint: &str) -> Result<WebhookInfo, ClientError>;

    /// Delete a webhook registration.
    async fn delete_webhook(&self, webhook_id: i64) -> Result<(), ClientError>;

    /// Bulk-subscribe accounts under a registration.
    async fn subscribe_accounts(
        &self,
        webhook_id: i64,
        accounts: &[String],
    ) -> Result<(), ClientError>;

    /// Bulk-unsubscribe accounts under a registration.
    async fn unsubscribe_accounts(
        &self,
        webhook_id: i64,
        accounts: &[String],
    ) -> Result<(), ClientError>;
}

/// Rate-limited TonAPI client.
pub struct TonApiClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
    throttle: Throttle,
    shutdown: watch::Receiver<bool>,
}

impl TonApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        min_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            throttle: Throttle::new(min_interval),
            shutdown,
        }
    }

    /// The single "perform request" primitive every operation goes through.
    async fn perform(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, ClientError> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Err(ClientError::Cancelled);
        }

        tokio::select! {
            biased;

            _ = wait_cancelled(&mut shutdown) => Err(ClientError::Cancelled),

            result = self.perform_inner(method, path, body) => result,
        }
    }

    async fn perform_inner(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, ClientError> {
        self.throttle.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "upstream request");

        let mut request = self
            .http
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api { status, body: text });
        }

        Ok(text)
    }
}

/// Resolves once the shutdown flag flips to true. A closed channel counts
/// as shutdown.
async fn wait_cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[async_trait]
impl TonApi for TonApiClient {
    async fn get_account_info(&self, address: &str) -> Result<AccountInfo, ClientError> {
        let body = self
            .perform(Method::GET, &format!("/accounts/{address}"), None)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_events(&self, address: &str, limit: u32) -> Result<Vec<TxEvent>, ClientError> {
        let body = self
            .perform(
                Method::GET,
                &format!("/accounts/{address}/events?limit={limit}"),
                None,
            )
            .await?;
        let response: EventsResponse = serde_json::from_str(&body)?;
        Ok(response.events)
    }

    async fn get_event_by_hash(&self, tx_hash: &str) -> Result<TxEvent, ClientError> {
        let body = self
            .perform(Method::GET, &format!("/events/{tx_hash}"), None)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>, ClientError> {
        let body = self.perform(Method::GET, "/webhooks", None).await?;
        let response: WebhookListResponse = serde_json::from_str(&body)?;
        Ok(response.webhooks)
    }

    async fn create_webhook(&self, endpoint: &str) -> Result<WebhookInfo, ClientError> {
        let body = self
            .perform(
                Method::POST,
                "/webhooks",
                Some(serde_json::json!({ "endpoint": endpoint })),
            )
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn delete_webhook(&self, webhook_id: i64) -> Result<(), ClientError> {
        self.perform(Method::DELETE, &format!("/webhooks/{webhook_id}"), None)
            .await?;
        Ok(())
    }

    async fn subscribe_accounts(
        &self,
        webhook_id: i64,
        accounts: &[String],
    ) -> Result<(), ClientError> {
        self.perform(
            Method::POST,
            &format!("/webhooks/{webhook_id}/account-tx/subscribe"),
            Some(serde_json::json!({ "accounts": accounts })),
        )
        .await?;
        Ok(())
    }

    async fn unsubscribe_accounts(
        &self,
        webhook_id: i64,
        accounts: &[String],
    ) -> Result<(), ClientError> {
        self.perform(
            Method::POST,
            &format!("/webhooks/{webhook_id}/account-tx/unsubscribe"),
            Some(serde_json::json!({ "accounts": accounts })),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let throttle = Throttle::new(Duration::from_millis(250));
        let before = Instant::now();
        throttle.acquire().await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_acquires_respect_min_interval() {
        let throttle = Throttle::new(Duration::from_millis(250));
        let start = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;
        assert!(Instant::now() - start >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_are_spaced() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(250)));
        let mut tasks = JoinSet::new();
        for _ in 0..5 {
            let throttle = throttle.clone();
            tasks.spawn(async move {
                throttle.acquire().await;
                Instant::now()
            });
        }

        let mut starts = Vec::new();
        while let Some(result) = tasks.join_next().await {
            starts.push(result.expect("acquire task"));
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn shutdown_cancels_before_any_io() {
        let (tx, rx) = watch::channel(true);
        let client = TonApiClient::new(
            "http://127.0.0.1:1",
            None,
            Duration::from_millis(0),
            rx,
        );
        drop(tx);

        let err = client.list_webhooks().await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }
}
