pub mod chat_view;
pub mod login;
pub mod main_window;
pub mod sidebar;

use std::sync::Arc;

use log::info;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use crate::api::GreenApiClient;
use crate::app::AppState;
use crate::error::AppError;
use crate::poller::{Poller, POLL_INTERVAL};
use crate::session::Session;
use crate::storage::{LocalStorage, SqliteStorage};
use main_window::Exit;

/// Login screen, then the chat screen, until the user quits. Logging out
/// returns to the login screen.
pub async fn run() -> Result<(), AppError> {
    let mut state = AppState::load();
    let storage: Arc<dyn LocalStorage> = Arc::new(SqliteStorage::open_default()?);
    let mut input = BufReader::new(stdin()).lines();

    loop {
        let credentials = match state.credentials.clone() {
            Some(credentials) => credentials,
            None => match login::prompt(&mut input, &mut state).await? {
                Some(credentials) => credentials,
                None => return Ok(()),
            },
        };

        let gateway = Arc::new(GreenApiClient::new(&state.api_url, credentials.clone())?);
        let session = Arc::new(Session::open(credentials, gateway, storage.clone())?);
        let poller = Poller::start(session.clone(), POLL_INTERVAL);

        let exit = main_window::run(&session, &mut input).await;
        poller.stop().await;

        match exit? {
            Exit::Quit => return Ok(()),
            Exit::Logout => {
                if let Some(old) = state.logout() {
                    info!("logged out of instance {}", old.instance_id);
                }
                state.save()?;
            }
        }
    }
}
