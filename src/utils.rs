use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ValidationError;

pub const PERSONAL_CHAT_SUFFIX: &str = "@c.us";

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Validates user input for a new chat. Only ASCII digits are accepted; the
/// result is the key used in the chat store.
pub fn normalize_phone(input: &str) -> Result<String, ValidationError> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhoneNumber);
    }
    Ok(input.chars().filter(char::is_ascii_digit).collect())
}

pub fn chat_id(phone_number: &str) -> String {
    format!("{}{}", phone_number, PERSONAL_CHAT_SUFFIX)
}

/// Inverse of [`chat_id`]. Anything that is not a personal chat id made of
/// digits (groups, broadcast lists) yields `None`.
pub fn phone_from_chat_id(chat_id: &str) -> Option<String> {
    let number = chat_id.strip_suffix(PERSONAL_CHAT_SUFFIX).unwrap_or(chat_id);
    normalize_phone(number).ok()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
