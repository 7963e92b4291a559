//! WhatsApp chat client for the GREEN-API gateway.
//!
//! [`session::Session`] is the context for one logged-in instance. It owns the
//! chat state, sends messages ([`session::Session::send_message`]) and merges
//! queued notifications ([`session::Session::poll_once`]), which
//! [`poller::Poller`] runs on a fixed interval.

pub mod api;
pub mod app;
pub mod error;
pub mod poller;
pub mod sender;
pub mod session;
pub mod storage;
pub mod store;
pub mod ui;
pub mod utils;
