//! Wire types for the TonAPI JSON schema.
//!
//! These mirror the upstream service's own format and are treated as an
//! opaque contract. Unknown fields are ignored on deserialization.

use serde::{Deserialize, Serialize};

/// An account event as reported by the upstream indexer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub is_scam: bool,
}

/// A single typed action within an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type", default)]
    pub action_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "TonTransfer", skip_serializing_if = "Option::is_none")]
    pub ton_transfer: Option<TonTransfer>,
    #[serde(rename = "JettonSwap", skip_serializing_if = "Option::is_none")]
    pub jetton_swap: Option<JettonSwap>,
}

/// A plain TON transfer action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TonTransfer {
    #[serde(default)]
    pub sender: AccountRef,
    #[serde(default)]
    pub recipient: AccountRef,
    /// Amount in nanoTON.
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub comment: String,
}

/// A DEX swap action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JettonSwap {
    #[serde(default)]
    pub dex: String,
    #[serde(default)]
    pub ton_in: i64,
    #[serde(default)]
    pub ton_out: i64,
    #[serde(default)]
    pub amount_in: String,
    #[serde(default)]
    pub amount_out: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jetton_master_in: Option<JettonInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jetton_master_out: Option<JettonInfo>,
}

/// Jetton metadata attached to swap actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JettonInfo {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: u32,
}

/// A referenced account inside an action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountRef {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_wallet: bool,
}

/// Canonical account info returned by the accounts endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Raw (`0:...`) address format.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub status: String,
}

/// A webhook registration held by the upstream service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookInfo {
    #[serde(rename = "webhook_id", default)]
    pub id: i64,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub subscribed_accounts: Vec<String>,
}

/// Inbound push payload delivered to our webhook endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub lt: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<TxEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventsResponse {
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WebhookListResponse {
    #[serde(default)]
    pub webhooks: Vec<WebhookInfo>,
}

/// Convert nanoTON to TON.
pub fn nano_to_ton(nano: i64) -> f64 {
    nano as f64 / 1e9
}

/// Shorten an address for log lines and notifications.
///
/// Operates on chars, never byte offsets; the inputs come straight from
/// webhook payloads and are not guaranteed to be ASCII.
pub fn short_addr(addr: &str, n: usize) -> String {
    if addr.is_empty() {
        return "unknown".to_string();
    }
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() < n * 2 + 3 {
        return addr.to_string();
    }
    let head: String = chars[..n].iter().collect();
    let tail: String = chars[chars.len() - n..].iter().collect();
    format!("{head}...{tail}")
}
