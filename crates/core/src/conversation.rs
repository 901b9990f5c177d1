//! Chat transcript with an ephemeral typing placeholder

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str =
    "Hi there! I'm your scheduling assistant. How can I help you today?";

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageRole {
    User,
    Assistant,
    /// Placeholder shown while a reply is being produced
    AssistantTyping,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: NaiveDateTime,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            role,
            timestamp: Local::now().naive_local(),
        }
    }
}

/// Ordered message log for one conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Transcript seeded with the assistant's welcome message
    pub fn with_welcome() -> Self {
        Self {
            messages: vec![Message::new(MessageRole::Assistant, WELCOME_MESSAGE)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::new(MessageRole::User, content))
    }

    /// Show the typing placeholder. At most one is kept.
    pub fn begin_typing(&mut self) -> &Message {
        self.clear_typing();
        self.push(Message::new(MessageRole::AssistantTyping, "..."))
    }

    /// Replace any typing placeholder with the real reply
    pub fn push_assistant(&mut self, content: impl Into<String>) -> &Message {
        self.clear_typing();
        self.push(Message::new(MessageRole::Assistant, content))
    }

    /// Drop the typing placeholder without a reply (e.g. on failure)
    pub fn clear_typing(&mut self) {
        self.messages.retain(|m| m.role != MessageRole::AssistantTyping);
    }

    pub fn is_typing(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == MessageRole::AssistantTyping)
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_placeholder_replaced_by_reply() {
        let mut transcript = Transcript::with_welcome();
        transcript.push_user("show my calendar");
        transcript.begin_typing();
        assert!(transcript.is_typing());

        transcript.push_assistant("Your calendar is clear.");
        assert!(!transcript.is_typing());

        let roles: Vec<_> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::Assistant, MessageRole::User, MessageRole::Assistant]
        );
    }

    #[test]
    fn test_single_placeholder() {
        let mut transcript = Transcript::default();
        transcript.begin_typing();
        transcript.begin_typing();
        assert_eq!(transcript.messages().len(), 1);
        transcript.clear_typing();
        assert!(transcript.messages().is_empty());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&MessageRole::AssistantTyping).unwrap();
        assert_eq!(json, "\"assistant-typing\"");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Message::new(MessageRole::User, "a");
        let b = Message::new(MessageRole::User, "a");
        assert_ne!(a.id, b.id);
    }
}
