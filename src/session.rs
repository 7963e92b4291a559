use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::sync::broadcast;

use crate::api::{Credentials, Gateway};
use crate::error::{StorageError, ValidationError};
use crate::storage::{self, LocalStorage};
use crate::store::{self, Chat, ChatState, ChatStore, Message};
use crate::utils::normalize_phone;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ChatStarted(String),
    ActiveChatChanged(Option<String>),
    MessageAppended { phone_number: String, message: Message },
}

/// Everything that lives for one logged-in instance: the gateway, the local
/// store and the chat state loaded from it.
///
/// State changes go through [`Session::commit`], which applies a reducer to
/// the latest state and writes the result back to local storage before
/// releasing the lock. Sends and poll ticks therefore never overwrite each
/// other's updates.
pub struct Session {
    credentials: Credentials,
    pub(crate) gateway: Arc<dyn Gateway>,
    storage: Arc<dyn LocalStorage>,
    state: Mutex<ChatState>,
    pub(crate) busy: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn open(
        credentials: Credentials,
        gateway: Arc<dyn Gateway>,
        storage: Arc<dyn LocalStorage>,
    ) -> Result<Self, StorageError> {
        let chats = storage::load_chats(storage.as_ref(), &credentials.instance_id)?;
        let active_chat = storage::load_active_chat(storage.as_ref(), &credentials.instance_id)?;
        info!(
            "session opened for instance {} ({} chats)",
            credentials.instance_id,
            chats.len()
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            credentials,
            gateway,
            storage,
            state: Mutex::new(ChatState { chats, active_chat }),
            busy: AtomicBool::new(false),
            events,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn instance_id(&self) -> &str {
        &self.credentials.instance_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> ChatState {
        self.lock().clone()
    }

    pub fn chats(&self) -> ChatStore {
        self.lock().chats.clone()
    }

    pub fn chat(&self, phone_number: &str) -> Option<Chat> {
        self.lock().chats.get(phone_number).cloned()
    }

    pub fn active_chat(&self) -> Option<String> {
        self.lock().active_chat.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Computes the next state from the current one and persists it.
    ///
    /// The write happens synchronously under the lock, on whichever runtime
    /// thread made the change, so stored snapshots land in commit order.
    /// Each write is one small SQLite upsert per key.
    pub(crate) fn commit<F>(&self, reducer: F)
    where
        F: FnOnce(ChatState) -> ChatState,
    {
        let mut guard = self.lock();
        let previous = std::mem::take(&mut *guard);
        let next = reducer(previous);
        self.persist(&next);
        *guard = next;
    }

    fn persist(&self, state: &ChatState) {
        let id = self.instance_id();
        if let Err(e) = storage::save_chats(self.storage.as_ref(), id, &state.chats) {
            warn!("failed to persist chats: {e}");
        }
        if let Err(e) =
            storage::save_active_chat(self.storage.as_ref(), id, state.active_chat.as_deref())
        {
            warn!("failed to persist active chat: {e}");
        }
    }

    pub(crate) fn append(&self, phone_number: &str, message: Message) {
        self.commit(|state| ChatState {
            chats: store::append(state.chats, phone_number, message.clone()),
            ..state
        });
        self.emit(SessionEvent::MessageAppended {
            phone_number: phone_number.to_string(),
            message,
        });
    }

    /// Opens (or reopens) a chat from user input and makes it active. Input
    /// must be digits only.
    pub fn start_chat(&self, input: &str) -> Result<String, ValidationError> {
        let phone_number = normalize_phone(input)?;
        let created = !self.lock().chats.contains_key(&phone_number);
        self.commit(|state| ChatState {
            chats: store::start_chat(state.chats, &phone_number),
            active_chat: Some(phone_number.clone()),
        });
        if created {
            self.emit(SessionEvent::ChatStarted(phone_number.clone()));
        }
        self.emit(SessionEvent::ActiveChatChanged(Some(phone_number.clone())));
        Ok(phone_number)
    }

    /// Switches the conversation pane to an existing chat. Returns `false`
    /// and leaves the selection alone when the chat is unknown.
    pub fn select_chat(&self, phone_number: &str) -> bool {
        if !self.lock().chats.contains_key(phone_number) {
            return false;
        }
        self.commit(|state| ChatState {
            active_chat: Some(phone_number.to_string()),
            ..state
        });
        self.emit(SessionEvent::ActiveChatChanged(Some(phone_number.to_string())));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Notification;
    use crate::error::ApiError;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl Gateway for Offline {
        async fn send_message(&self, _: &str, _: &str) -> Result<String, ApiError> {
            Err(ApiError::MissingMessageId)
        }
        async fn receive_notification(&self) -> Result<Option<Notification>, ApiError> {
            Ok(None)
        }
        async fn delete_notification(&self, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn creds(id: &str) -> Credentials {
        Credentials { instance_id: id.into(), access_token: "abc".into() }
    }

    fn session(storage: Arc<MemoryStorage>, id: &str) -> Session {
        Session::open(creds(id), Arc::new(Offline), storage).unwrap()
    }

    #[test]
    fn start_chat_validates_and_activates() {
        let s = session(Arc::new(MemoryStorage::new()), "100");
        assert_eq!(s.start_chat("+7900"), Err(ValidationError::InvalidPhoneNumber));
        assert!(s.chats().is_empty());

        assert_eq!(s.start_chat("79001234567").unwrap(), "79001234567");
        assert_eq!(s.active_chat().as_deref(), Some("79001234567"));
        assert_eq!(s.chats().len(), 1);
    }

    #[test]
    fn restarting_a_chat_keeps_history() {
        let s = session(Arc::new(MemoryStorage::new()), "100");
        s.append("79001234567", Message::incoming("hi", 1));
        s.start_chat("79001234567").unwrap();
        assert_eq!(s.chat("79001234567").unwrap().messages.len(), 1);
        assert_eq!(s.chats().len(), 1);
    }

    #[test]
    fn select_chat_ignores_unknown_numbers() {
        let s = session(Arc::new(MemoryStorage::new()), "100");
        s.start_chat("1").unwrap();
        s.start_chat("2").unwrap();
        assert!(s.select_chat("1"));
        assert!(!s.select_chat("3"));
        assert_eq!(s.active_chat().as_deref(), Some("1"));
    }

    #[test]
    fn state_survives_reopen_and_is_scoped_per_instance() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let s = session(storage.clone(), "100");
            s.start_chat("79001234567").unwrap();
            s.append("79001234567", Message::outgoing("hello", 1));
        }

        let again = session(storage.clone(), "100");
        assert_eq!(again.active_chat().as_deref(), Some("79001234567"));
        assert_eq!(
            again.chat("79001234567").unwrap().messages,
            vec![Message::outgoing("hello", 1)]
        );

        let other = session(storage, "200");
        assert!(other.chats().is_empty());
        assert!(other.active_chat().is_none());
    }

    #[test]
    fn events_are_broadcast() {
        let s = session(Arc::new(MemoryStorage::new()), "100");
        let mut rx = s.subscribe();
        s.start_chat("5").unwrap();
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::ChatStarted("5".into()));
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::ActiveChatChanged(Some("5".into())));
    }
}
