use crate::store::{Chat, Message};

/// `HH:MM:SS` (UTC) for a millisecond timestamp.
pub fn format_time(timestamp_ms: i64) -> String {
    let secs = timestamp_ms.div_euclid(1000).rem_euclid(86_400);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

pub fn format_message(message: &Message) -> String {
    let time = format_time(message.timestamp_ms);
    if message.is_outgoing {
        format!("{:>40} [{time}] >", message.text)
    } else {
        format!("< [{time}] {}", message.text)
    }
}

pub fn render(chat: Option<&Chat>, active: Option<&str>) -> String {
    let Some(number) = active else {
        return "Enter a phone number to start chatting (/chat <number>)".to_string();
    };
    let mut out = format!("── +{number} ──\n");
    // A stale selection renders as an empty pane.
    for message in chat.map(|c| c.messages.as_slice()).unwrap_or_default() {
        out.push_str(&format_message(message));
        out.push('\n');
    }
    out
}
