mod common;

use std::sync::Arc;

use common::{credentials, incoming, FakeGateway};
use greenchat::app::AppState;
use greenchat::poller::TickOutcome;
use greenchat::session::Session;
use greenchat::storage::{self, SqliteStorage};
use greenchat::store::Message;
use greenchat::utils::now_ms;

#[tokio::test]
async fn send_then_receive_reply() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::open(dir.path().join("storage.sqlite")).unwrap());
    let gateway = FakeGateway::new();
    let session = Session::open(credentials(), gateway.clone(), storage.clone()).unwrap();

    session.start_chat("79001234567").unwrap();
    gateway.reply_to_send(Ok("m1".into()));
    let before = now_ms();
    session.send_message("hello").await.unwrap();

    let messages = session.chat("79001234567").unwrap().messages;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "hello");
    assert!(messages[0].is_outgoing);
    let t = messages[0].timestamp_ms;
    assert!(t >= before);

    let t2 = 1_700_000_123;
    gateway.queue(incoming("r1", "incomingMessageReceived", "hi back", "79001234567@c.us", t2));
    assert!(matches!(session.poll_once().await.unwrap(), TickOutcome::Appended(_)));

    assert_eq!(
        session.chat("79001234567").unwrap().messages,
        vec![Message::outgoing("hello", t), Message::incoming("hi back", t2 * 1000)]
    );
    assert_eq!(gateway.deleted(), ["r1"]);

    // Everything above was written through to disk.
    let reloaded = storage::load_chats(storage.as_ref(), "100").unwrap();
    assert_eq!(reloaded, session.chats());
    assert_eq!(
        storage::load_active_chat(storage.as_ref(), "100").unwrap().as_deref(),
        Some("79001234567")
    );
}

#[tokio::test]
async fn history_is_restored_after_logout_and_login() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("greenchat.toml");
    let storage = Arc::new(SqliteStorage::open(dir.path().join("storage.sqlite")).unwrap());
    let gateway = FakeGateway::new();

    let mut state = AppState::new();
    let creds = state.login("100", "abc").unwrap().clone();
    state.save_to(&config).unwrap();
    {
        let session = Session::open(creds, gateway.clone(), storage.clone()).unwrap();
        gateway.queue(incoming("r1", "incomingMessageReceived", "hi", "5@c.us", 1));
        session.poll_once().await.unwrap();
    }

    state.logout();
    state.save_to(&config).unwrap();
    assert!(AppState::load_from(&config).credentials.is_none());

    let mut state = AppState::load_from(&config);
    let creds = state.login("100", "new-token").unwrap().clone();
    let session = Session::open(creds, gateway.clone(), storage.clone()).unwrap();
    assert_eq!(session.chat("5").unwrap().messages, vec![Message::incoming("hi", 1000)]);

    let creds = state.login("200", "other").unwrap().clone();
    let other = Session::open(creds, gateway, storage).unwrap();
    assert!(other.chats().is_empty());
}
