//! Application state shared across all request handlers.

use std::sync::Arc;
use tonwatch_core::processors::EventReceiver;

/// Application state that is shared across all request handlers.
///
/// Cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Processes inbound webhook payloads after the handler has acked them.
    pub receiver: Arc<EventReceiver>,
}

impl AppState {
    pub fn new(receiver: Arc<EventReceiver>) -> Self {
        Self { receiver }
    }
}
