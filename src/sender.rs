use std::sync::atomic::Ordering;

use log::{error, info};
use scopeguard::defer;

use crate::error::{SendError, ValidationError};
use crate::session::Session;
use crate::store::Message;
use crate::utils::{chat_id, now_ms};

impl Session {
    /// Sends `text` to the active chat.
    ///
    /// The message is appended to the chat only after the gateway returns a
    /// message id; on any failure the chat store is left as it was and the
    /// caller keeps its input. A second call while one is in flight is
    /// rejected with [`SendError::Busy`].
    pub async fn send_message(&self, text: &str) -> Result<Message, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let phone_number = self.active_chat().ok_or(ValidationError::NoActiveChat)?;

        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(SendError::Busy);
        }
        defer! {
            self.busy.store(false, Ordering::Release);
        }

        match self.gateway.send_message(&chat_id(&phone_number), text).await {
            Ok(id_message) => {
                info!("sent {id_message} to {phone_number}");
                let message = Message::outgoing(text, now_ms());
                self.append(&phone_number, message.clone());
                Ok(message)
            }
            Err(e) => {
                error!("Send message error: {e}");
                Err(e.into())
            }
        }
    }
}
