use log::debug;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::broadcast::error::RecvError;

use crate::error::SendError;
use crate::session::{Session, SessionEvent};
use crate::ui::{chat_view, sidebar};

const HELP: &str = "\
/chat <number>  start a chat (digits only, e.g. 79001234567)
/open <number>  switch to an existing chat
/list           show conversations
/history        show the active conversation
/logout         forget credentials and return to login
/quit           exit
anything else is sent to the active chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(String),
    Open(String),
    List,
    History,
    Logout,
    Quit,
    Help,
    Send(String),
    Empty,
    Unknown(String),
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "chat" => Command::Start(arg.to_string()),
        "open" => Command::Open(arg.trim_start_matches('+').to_string()),
        "list" => Command::List,
        "history" => Command::History,
        "logout" => Command::Logout,
        "quit" | "exit" => Command::Quit,
        "help" => Command::Help,
        other => Command::Unknown(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Logout,
    Quit,
}

fn show_event(session: &Session, event: SessionEvent) {
    if let SessionEvent::MessageAppended { phone_number, message } = event {
        if session.active_chat().as_deref() == Some(phone_number.as_str()) {
            println!("{}", chat_view::format_message(&message));
        } else {
            println!("[+{phone_number}] {}", message.text);
        }
    }
}

/// Runs the conversation screen until the user logs out or input ends.
pub async fn run<R>(session: &Session, input: &mut Lines<R>) -> std::io::Result<Exit>
where
    R: AsyncBufRead + Unpin,
{
    let mut events = session.subscribe();
    let state = session.snapshot();
    print!("{}", sidebar::render(&state));
    println!("{}", chat_view::render(state.active(), state.active_chat.as_deref()));

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(Exit::Quit);
                };
                match parse(&line) {
                    Command::Empty => {}
                    Command::Start(number) => match session.start_chat(&number) {
                        Ok(number) => println!("Chat started: connected to +{number}"),
                        Err(e) => println!("{e}"),
                    },
                    Command::Open(number) => {
                        if session.select_chat(&number) {
                            let chat = session.chat(&number);
                            print!("{}", chat_view::render(chat.as_ref(), Some(&number)));
                        } else {
                            println!("No chat with +{number}; use /chat {number}");
                        }
                    }
                    Command::List => print!("{}", sidebar::render(&session.snapshot())),
                    Command::History => {
                        let state = session.snapshot();
                        print!("{}", chat_view::render(state.active(), state.active_chat.as_deref()));
                    }
                    Command::Logout => return Ok(Exit::Logout),
                    Command::Quit => return Ok(Exit::Quit),
                    Command::Help => println!("{HELP}"),
                    Command::Unknown(name) => println!("Unknown command /{name}; try /help"),
                    Command::Send(text) => match session.send_message(&text).await {
                        Ok(_) => {}
                        Err(SendError::Validation(e)) => println!("{e}"),
                        Err(e) => println!("Error sending message: {e}"),
                    },
                }
            }
            event = events.recv() => match event {
                Ok(event) => show_event(session, event),
                Err(RecvError::Lagged(n)) => debug!("view skipped {n} events"),
                Err(RecvError::Closed) => return Ok(Exit::Quit),
            },
        }
    }
}
