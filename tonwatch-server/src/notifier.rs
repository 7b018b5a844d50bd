//! Telegram-backed notification sink.
//!
//! Summarizes a transaction event into terse one-line descriptions and
//! pushes them to the wallet owner's Telegram chat. Without a bot token it
//! degrades to logging each would-be delivery, which keeps the rest of the
//! pipeline exercisable in development.

use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tonwatch_core::notify::{DeliverError, EventSink};
use tonwatch_core::storage::TrackedWallet;
use tonwatch_core::tonapi::{Action, TxEvent, nano_to_ton, short_addr};

pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: Option<String>,
    /// Global floor for transfer notifications, in TON. Zero disables it.
    min_transfer_ton: f64,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, min_transfer_ton: f64) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            bot_token: Some(bot_token).filter(|t| !t.is_empty()),
            min_transfer_ton,
        }
    }

    async fn send_message(&self, token: &str, chat_id: i64, text: &str) -> Result<(), DeliverError> {
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("telegram api returned {status}: {body}").into());
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for TelegramNotifier {
    async fn deliver(&self, wallet: &TrackedWallet, event: &TxEvent) -> Result<(), DeliverError> {
        let lines = summarize(wallet, event, self.min_transfer_ton);
        if lines.is_empty() {
            tracing::debug!(
                wallet_id = wallet.id,
                event_id = %event.event_id,
                "nothing notable in event, skipping notification"
            );
            return Ok(());
        }

        let text = format!("{}\n{}", header(wallet, event), lines.join("\n"));

        match &self.bot_token {
            Some(token) => self.send_message(token, wallet.user_id, &text).await,
            None => {
                tracing::info!(
                    wallet_id = wallet.id,
                    user_id = wallet.user_id,
                    notification = %text,
                    "no bot token configured, logging delivery"
                );
                Ok(())
            }
        }
    }
}

fn header(wallet: &TrackedWallet, event: &TxEvent) -> String {
    let when = OffsetDateTime::from_unix_timestamp(event.timestamp)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| "unknown time".to_string());
    format!(
        "{} ({}) at {}",
        wallet.name,
        short_addr(&wallet.address_raw, 4),
        when
    )
}

/// Build the notification lines for an event, applying the per-wallet and
/// global transfer-amount floors. Scam events and failed actions produce
/// nothing.
pub fn summarize(wallet: &TrackedWallet, event: &TxEvent, min_transfer_ton: f64) -> Vec<String> {
    if event.is_scam {
        return Vec::new();
    }
    event
        .actions
        .iter()
        .filter(|action| action.status == "ok" || action.status.is_empty())
        .filter_map(|action| action_line(wallet, action, min_transfer_ton))
        .collect()
}

fn action_line(wallet: &TrackedWallet, action: &Action, min_transfer_ton: f64) -> Option<String> {
    if let Some(transfer) = &action.ton_transfer {
        let amount_ton = nano_to_ton(transfer.amount);
        let floor = wallet.min_amount_ton.unwrap_or(0.0).max(min_transfer_ton);
        if amount_ton < floor {
            return None;
        }
        // Intermediate hops in multi-action events can touch neither side
        // of the watched wallet; those say nothing to the owner.
        let line = if transfer.recipient.address == wallet.address_raw {
            format!(
                "received {amount_ton:.2} TON from {}",
                short_addr(&transfer.sender.address, 4)
            )
        } else if transfer.sender.address == wallet.address_raw {
            format!(
                "sent {amount_ton:.2} TON to {}",
                short_addr(&transfer.recipient.address, 4)
            )
        } else {
            return None;
        };
        return Some(match transfer.comment.as_str() {
            "" => line,
            comment => format!("{line} ({comment})"),
        });
    }

    if let Some(swap) = &action.jetton_swap {
        let dex = if swap.dex.is_empty() { "dex" } else { &swap.dex };
        let symbol = |info: &Option<tonwatch_core::tonapi::JettonInfo>| {
            info.as_ref()
                .map(|j| j.symbol.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "TON".to_string())
        };
        return Some(format!(
            "swapped {} -> {} on {dex}",
            symbol(&swap.jetton_master_in),
            symbol(&swap.jetton_master_out),
        ));
    }

    None
}
