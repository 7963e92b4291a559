use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "idInstance")]
    pub instance_id: String,
    #[serde(rename = "apiTokenInstance")]
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    #[serde(default)]
    pub id_message: Option<String>,
}

/// One entry of the gateway's notification queue. The body is kept raw so a
/// payload that does not fit [`NotificationBody`] still yields its receipt.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, deserialize_with = "receipt_id")]
    pub receipt_id: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl Notification {
    pub fn parse_body(&self) -> Option<Result<NotificationBody, serde_json::Error>> {
        self.body.as_ref().map(NotificationBody::deserialize)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBody {
    #[serde(default)]
    pub type_webhook: String,
    #[serde(default)]
    pub message_data: Option<MessageData>,
    #[serde(default)]
    pub sender_data: Option<SenderData>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    #[serde(default)]
    pub text_message_data: Option<TextMessageData>,
    #[serde(default)]
    pub extended_text_message_data: Option<ExtendedTextMessageData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessageData {
    #[serde(default)]
    pub text_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTextMessageData {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderData {
    #[serde(default)]
    pub sender: Option<String>,
}

// The gateway sends receipt ids as numbers; accept strings too.
fn receipt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
