use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TITLE_CHARS: usize = 30;

/// Who authored a message. Serialized the way `/api/chat` expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One conversation shown as an entry in the sidebar.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Local>,
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: "New Chat".into(),
            created_at: Local::now(),
            messages: Vec::new(),
        }
    }

    /// Append a message. Returns true when the title changed, which happens
    /// on the first user message.
    pub fn push(&mut self, message: ChatMessage) -> bool {
        let first_user = message.role == Role::User
            && !self.messages.iter().any(|m| m.role == Role::User);
        if first_user {
            self.title = title_from(&message.content);
        }
        self.messages.push(message);
        first_user
    }
}

/// First 30 characters of `text`, with "..." when truncated.
fn title_from(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// In-memory sessions, newest first. Never persisted.
#[derive(Debug, Default)]
pub struct SessionList {
    sessions: Vec<ChatSession>,
    current: Option<Uuid>,
}

impl SessionList {
    /// Create a session at the top of the list and make it current.
    pub fn new_session(&mut self) -> Uuid {
        let session = ChatSession::new();
        let id = session.id;
        self.sessions.insert(0, session);
        self.current = Some(id);
        id
    }

    /// Switch to `id`. Returns false if no such session exists or it is
    /// already current.
    pub fn select(&mut self, id: Uuid) -> bool {
        if self.current == Some(id) || !self.sessions.iter().any(|s| s.id == id) {
            return false;
        }
        self.current = Some(id);
        true
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current
    }

    pub fn current(&self) -> Option<&ChatSession> {
        let id = self.current?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatSession> {
        self.sessions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sessions_are_listed_newest_first() {
        let mut list = SessionList::default();
        let first = list.new_session();
        let second = list.new_session();

        let ids: Vec<Uuid> = list.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(list.current_id(), Some(second));
    }

    #[test]
    fn select_ignores_unknown_and_current() {
        let mut list = SessionList::default();
        let first = list.new_session();
        let second = list.new_session();

        assert!(!list.select(second));
        assert!(!list.select(Uuid::new_v4()));
        assert!(list.select(first));
        assert_eq!(list.current_id(), Some(first));
    }

    #[test]
    fn first_user_message_sets_title() {
        let mut list = SessionList::default();
        let id = list.new_session();
        let session = list.get_mut(id).unwrap();

        assert!(!session.push(ChatMessage::new(Role::Assistant, "hi")));
        assert_eq!(session.title, "New Chat");
        assert!(session.push(ChatMessage::new(Role::User, "What is Rust?")));
        assert_eq!(session.title, "What is Rust?");
        assert!(!session.push(ChatMessage::new(Role::User, "And Cargo?")));
        assert_eq!(session.title, "What is Rust?");
        assert_eq!(session.messages.len(), 3);
    }

    #[test]
    fn long_titles_are_truncated_on_char_boundaries() {
        let text = "ü".repeat(31);
        assert_eq!(title_from(&text), format!("{}...", "ü".repeat(30)));
        assert_eq!(title_from(&"a".repeat(30)), "a".repeat(30));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::new(Role::Assistant, "x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }
}
