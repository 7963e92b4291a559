use crate::store::ChatState;

pub fn render(state: &ChatState) -> String {
    if state.chats.is_empty() {
        return "No conversations yet.\n".to_string();
    }
    let mut out = String::from("Conversations\n");
    for (number, chat) in &state.chats {
        let marker = if state.active_chat.as_deref() == Some(number.as_str()) { '*' } else { ' ' };
        out.push_str(&format!("{marker} +{number}  {}\n", chat.preview()));
    }
    out
}
