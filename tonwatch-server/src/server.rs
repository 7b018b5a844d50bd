//! Axum server setup and router configuration.

use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tonwatch_core::tonapi::WebhookPayload;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(receive_webhook))
        .route("/health", get(health_check))
        .route("/", get(health_check))
        .with_state(state)
}

/// Inbound webhook endpoint.
///
/// Any decodable body is acked with 200 immediately; processing runs
/// detached so upstream retry timers never observe our latency. The
/// upstream treats non-200 as a delivery failure and retries, so even
/// payloads we will discard get a 200. The body is decoded from raw bytes
/// rather than through the `Json` extractor because the upstream does not
/// reliably set a Content-Type header, and a 415 would put the push into a
/// retry loop forever.
async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("undecodable webhook body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let receiver = state.receiver.clone();
    tokio::spawn(async move {
        receiver.process(payload).await;
    });
    StatusCode::OK
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server with graceful shutdown support.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use std::sync::Arc;
    use tonwatch_core::notify::{DeliverError, EventSink};
    use tonwatch_core::processors::EventReceiver;
    use tonwatch_core::storage::{Storage, StorageError, TrackedWallet};
    use tonwatch_core::tonapi::{AccountInfo, ClientError, TonApi, TxEvent, WebhookInfo};
    use tower::ServiceExt;

    struct EmptyStorage;

    #[async_trait]
    impl Storage for EmptyStorage {
        async fn all_wallets(&self) -> Result<Vec<TrackedWallet>, StorageError> {
            Ok(Vec::new())
        }

        async fn wallets_by_raw_address(
            &self,
            _address_raw: &str,
        ) -> Result<Vec<TrackedWallet>, StorageError> {
            Ok(Vec::new())
        }

        async fn mark_event_processed(
            &self,
            _wallet_id: i64,
            _event_id: &str,
        ) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    struct NoApi;

    #[async_trait]
    impl TonApi for NoApi {
        async fn get_account_info(&self, _address: &str) -> Result<AccountInfo, ClientError> {
            Err(ClientError::Cancelled)
        }

        async fn get_events(
            &self,
            _address: &str,
            _limit: u32,
        ) -> Result<Vec<TxEvent>, ClientError> {
            Err(ClientError::Cancelled)
        }

        async fn get_event_by_hash(&self, _tx_hash: &str) -> Result<TxEvent, ClientError> {
            Err(ClientError::Cancelled)
        }

        async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>, ClientError> {
            Err(ClientError::Cancelled)
        }

        async fn create_webhook(&self, _endpoint: &str) -> Result<WebhookInfo, ClientError> {
            Err(ClientError::Cancelled)
        }

        async fn delete_webhook(&self, _webhook_id: i64) -> Result<(), ClientError> {
            Err(ClientError::Cancelled)
        }

        async fn subscribe_accounts(
            &self,
            _webhook_id: i64,
            _accounts: &[String],
        ) -> Result<(), ClientError> {
            Err(ClientError::Cancelled)
        }

        async fn unsubscribe_accounts(
            &self,
            _webhook_id: i64,
            _accounts: &[String],
        ) -> Result<(), ClientError> {
            Err(ClientError::Cancelled)
        }
    }

    struct NullSink;

    #[async_trait]
    impl EventSink for NullSink {
        async fn deliver(
            &self,
            _wallet: &TrackedWallet,
            _event: &TxEvent,
        ) -> Result<(), DeliverError> {
            Ok(())
        }
    }

    fn router() -> Router {
        let receiver = Arc::new(EventReceiver::new(
            Arc::new(EmptyStorage),
            Arc::new(NoApi),
            Arc::new(NullSink),
        ));
        build_router(AppState::new(receiver))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoints_respond_ok() {
        for uri in ["/health", "/"] {
            let response = router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn valid_payload_is_acked_immediately() {
        let response = router()
            .oneshot(post_json(r#"{"account_id":"0:abc","event_type":"account_tx"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn discarded_payloads_still_get_ok() {
        // The upstream retries on non-200, so ignorable payloads ack too.
        for body in [
            r#"{"event_type":"mempool_msg","account_id":"0:abc"}"#,
            r#"{"event_type":"new_contract","account_id":"0:abc"}"#,
            r#"{}"#,
        ] {
            let response = router().oneshot(post_json(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn missing_content_type_header_is_still_accepted() {
        // The upstream does not always set Content-Type on pushes.
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .body(Body::from(r#"{"account_id":"0:abc"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn undecodable_json_is_rejected() {
        let response = router().oneshot(post_json("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_rejects_non_post_methods() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/webhook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
