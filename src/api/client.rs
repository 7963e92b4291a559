use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, Request};
use serde_json::Value;

use crate::api::models::{Credentials, Notification, SendMessageRequest, SendMessageResponse};
use crate::error::ApiError;

/// Seconds the gateway may hold a `receiveNotification` request open.
pub const RECEIVE_TIMEOUT_SECS: u64 = 5;

/// The slice of the GREEN-API surface this client consumes.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Sends `message` to `chat_id` and returns the gateway's message id.
    async fn send_message(&self, chat_id: &str, message: &str) -> Result<String, ApiError>;

    /// Waits up to [`RECEIVE_TIMEOUT_SECS`] for the next queued notification.
    async fn receive_notification(&self) -> Result<Option<Notification>, ApiError>;

    async fn delete_notification(&self, receipt_id: &str) -> Result<(), ApiError>;
}

pub struct GreenApiClient {
    http: HttpClient,
    api_url: String,
    credentials: Credentials,
}

impl GreenApiClient {
    pub fn new(api_url: &str, credentials: Credentials) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(RECEIVE_TIMEOUT_SECS + 15))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/waInstance{}/{}/{}",
            self.api_url, self.credentials.instance_id, method, self.credentials.access_token
        )
    }

    fn send_request(&self, chat_id: &str, message: &str) -> reqwest::Result<Request> {
        let body = SendMessageRequest { chat_id, message };
        self.http.post(self.endpoint("sendMessage")).json(&body).build()
    }

    fn receive_request(&self) -> reqwest::Result<Request> {
        self.http
            .get(self.endpoint("receiveNotification"))
            .query(&[("receiveTimeout", RECEIVE_TIMEOUT_SECS)])
            .build()
    }

    fn delete_request(&self, receipt_id: &str) -> reqwest::Result<Request> {
        let endpoint = format!("{}/{}", self.endpoint("deleteNotification"), receipt_id);
        self.http.delete(endpoint).build()
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), text))
    }
}

/// Maps a non-2xx reply. The body usually carries `message` or `error`;
/// anything else is reported verbatim.
pub fn status_error(status: u16, text: String) -> ApiError {
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or(text);
    ApiError::Status { status, message }
}

/// Parses a `receiveNotification` reply. An empty or `null` reply, or one
/// without a body, means the queue is empty.
pub fn parse_notification(text: &str) -> Result<Option<Notification>, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let notification: Notification = serde_json::from_str(trimmed)?;
    Ok(notification.body.is_some().then_some(notification))
}

#[async_trait]
impl Gateway for GreenApiClient {
    async fn send_message(&self, chat_id: &str, message: &str) -> Result<String, ApiError> {
        let resp = self.http.execute(self.send_request(chat_id, message)?).await?;
        let resp = Self::check(resp).await?;
        let parsed: SendMessageResponse = resp.json().await?;
        parsed
            .id_message
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingMessageId)
    }

    async fn receive_notification(&self) -> Result<Option<Notification>, ApiError> {
        let resp = self.http.execute(self.receive_request()?).await?;
        let text = Self::check(resp).await?.text().await?;
        debug!("receiveNotification: {text}");
        parse_notification(&text)
    }

    async fn delete_notification(&self, receipt_id: &str) -> Result<(), ApiError> {
        let resp = self.http.execute(self.delete_request(receipt_id)?).await?;
        Self::check(resp).await?;
        Ok(())
    }
}
