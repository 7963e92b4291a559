use std::io::Write;

use log::warn;
use tokio::io::{AsyncBufRead, Lines};

use crate::api::Credentials;
use crate::app::AppState;

async fn ask<R>(input: &mut Lines<R>, prompt: &str) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    print!("{prompt}: ");
    std::io::stdout().flush()?;
    input.next_line().await
}

/// Asks for instance id and token until both are given, stores them in
/// `state` and saves it. `None` means input ended.
pub async fn prompt<R>(input: &mut Lines<R>, state: &mut AppState) -> std::io::Result<Option<Credentials>>
where
    R: AsyncBufRead + Unpin,
{
    println!("Welcome to WhatsApp Sender");
    println!("Enter your GREEN-API credentials to continue");
    loop {
        let Some(instance_id) = ask(input, "ID Instance").await? else {
            return Ok(None);
        };
        let Some(token) = ask(input, "API Token Instance").await? else {
            return Ok(None);
        };
        match state.login(&instance_id, &token) {
            Ok(credentials) => {
                let credentials = credentials.clone();
                if let Err(e) = state.save() {
                    warn!("Failed to save settings: {e}");
                }
                return Ok(Some(credentials));
            }
            Err(e) => println!("{e}"),
        }
    }
}
