use std::fmt;

use crate::api::models::NotificationBody;
use crate::store::Message;
use crate::utils::{now_ms, phone_from_chat_id};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookKind {
    IncomingMessageReceived,
    OutgoingApiMessageReceived,
    OutgoingMessageReceived,
    Other(String),
}

impl WebhookKind {
    pub fn parse(type_webhook: &str) -> Self {
        match type_webhook {
            "incomingMessageReceived" => Self::IncomingMessageReceived,
            "outgoingAPIMessageReceived" => Self::OutgoingApiMessageReceived,
            "outgoingMessageReceived" => Self::OutgoingMessageReceived,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_message(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    // Messages typed on the phone itself (OutgoingMessageReceived) land as
    // incoming; only API sends are marked outgoing.
    pub fn is_outgoing(&self) -> bool {
        matches!(self, Self::OutgoingApiMessageReceived)
    }
}

/// A message ready to be merged into the chat store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub phone_number: String,
    pub message: Message,
}

/// Why a notification produced no message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    UnsupportedKind(String),
    NoText,
    NoSender,
    Malformed(String),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::UnsupportedKind(kind) => write!(f, "unsupported webhook type {kind:?}"),
            Skip::NoText => f.write_str("no text in message data"),
            Skip::NoSender => f.write_str("no usable sender"),
            Skip::Malformed(e) => write!(f, "malformed body: {e}"),
        }
    }
}

pub fn extract(body: &NotificationBody) -> Result<InboundMessage, Skip> {
    let kind = WebhookKind::parse(&body.type_webhook);
    if !kind.is_message() {
        return Err(Skip::UnsupportedKind(body.type_webhook.clone()));
    }

    let data = body.message_data.as_ref();
    let text = data
        .and_then(|d| d.text_message_data.as_ref())
        .and_then(|t| t.text_message.as_deref())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            data.and_then(|d| d.extended_text_message_data.as_ref())
                .and_then(|t| t.text.as_deref())
                .filter(|t| !t.is_empty())
        })
        .ok_or(Skip::NoText)?;

    let phone_number = body
        .sender_data
        .as_ref()
        .and_then(|s| s.sender.as_deref())
        .and_then(phone_from_chat_id)
        .ok_or(Skip::NoSender)?;

    // Zero or out-of-range timestamps fall back to the local clock.
    let timestamp_ms = body
        .timestamp
        .filter(|&s| s != 0)
        .and_then(|s| s.checked_mul(1000))
        .unwrap_or_else(now_ms);
    Ok(InboundMessage {
        phone_number,
        message: Message {
            text: text.to_string(),
            timestamp_ms,
            is_outgoing: kind.is_outgoing(),
        },
    })
}
