#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use greenchat::api::{Credentials, Gateway, Notification};
use greenchat::error::ApiError;
use greenchat::session::Session;
use greenchat::storage::MemoryStorage;
use tokio::sync::Notify;

/// Scripted gateway. Queued results are handed out in order; an empty
/// notification queue behaves like an idle gateway.
#[derive(Default)]
pub struct FakeGateway {
    pub send_results: Mutex<VecDeque<Result<String, ApiError>>>,
    pub notifications: Mutex<VecDeque<Result<Option<Notification>, ApiError>>>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub deleted: Mutex<Vec<String>>,
    pub receive_calls: AtomicUsize,
    pub fail_deletes: AtomicBool,
    pub hold_sends: AtomicBool,
    pub release: Notify,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply_to_send(&self, result: Result<String, ApiError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn queue(&self, json: serde_json::Value) {
        let notification = serde_json::from_value(json).unwrap();
        self.notifications.lock().unwrap().push_back(Ok(Some(notification)));
    }

    pub fn queue_error(&self, error: ApiError) {
        self.notifications.lock().unwrap().push_back(Err(error));
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn send_message(&self, chat_id: &str, message: &str) -> Result<String, ApiError> {
        self.sent.lock().unwrap().push((chat_id.to_string(), message.to_string()));
        if self.hold_sends.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::MissingMessageId))
    }

    async fn receive_notification(&self) -> Result<Option<Notification>, ApiError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        self.notifications.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn delete_notification(&self, receipt_id: &str) -> Result<(), ApiError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ApiError::Status { status: 500, message: "delete failed".into() });
        }
        self.deleted.lock().unwrap().push(receipt_id.to_string());
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials { instance_id: "100".into(), access_token: "abc".into() }
}

pub fn session_with(gateway: &Arc<FakeGateway>) -> Arc<Session> {
    let storage = Arc::new(MemoryStorage::new());
    Arc::new(Session::open(credentials(), gateway.clone(), storage).unwrap())
}

pub fn incoming(receipt: &str, kind: &str, text: &str, sender: &str, timestamp: i64) -> serde_json::Value {
    serde_json::json!({
        "receiptId": receipt,
        "body": {
            "typeWebhook": kind,
            "messageData": { "typeMessage": "textMessage", "textMessageData": { "textMessage": text } },
            "senderData": { "chatId": sender, "sender": sender },
            "timestamp": timestamp
        }
    })
}
