pub mod client;
pub mod events;
pub mod models;

pub use client::{Gateway, GreenApiClient};
pub use models::{Credentials, Notification};
