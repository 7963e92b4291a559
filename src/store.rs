use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const PREVIEW_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub is_outgoing: bool,
}

impl Message {
    pub fn outgoing(text: impl Into<String>, timestamp_ms: i64) -> Self {
        Self { text: text.into(), timestamp_ms, is_outgoing: true }
    }

    pub fn incoming(text: impl Into<String>, timestamp_ms: i64) -> Self {
        Self { text: text.into(), timestamp_ms, is_outgoing: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub phone_number: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Chat {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self { phone_number: phone_number.into(), messages: Vec::new() }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Sidebar line for the chat list.
    pub fn preview(&self) -> String {
        match self.last_message() {
            Some(m) if !m.text.is_empty() => m.text.chars().take(PREVIEW_CHARS).collect(),
            _ => "Start chatting".to_string(),
        }
    }
}

/// Chats keyed by digits-only phone number.
pub type ChatStore = BTreeMap<String, Chat>;

/// Returns `store` with an (empty) chat for `phone_number`. An existing chat
/// is left untouched.
pub fn start_chat(mut store: ChatStore, phone_number: &str) -> ChatStore {
    store
        .entry(phone_number.to_string())
        .or_insert_with(|| Chat::new(phone_number));
    store
}

/// Returns `store` with `message` appended to the end of the chat for
/// `phone_number`, creating the chat first if needed.
pub fn append(mut store: ChatStore, phone_number: &str, message: Message) -> ChatStore {
    store
        .entry(phone_number.to_string())
        .or_insert_with(|| Chat::new(phone_number))
        .messages
        .push(message);
    store
}

/// Everything the view renders: the chats plus the selected one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub chats: ChatStore,
    pub active_chat: Option<String>,
}

impl ChatState {
    pub fn active(&self) -> Option<&Chat> {
        self.active_chat.as_ref().and_then(|p| self.chats.get(p))
    }
}
