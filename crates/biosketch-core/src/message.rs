//! Session-scoped conversation state: messages and the recent action log.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of entries kept in the action log.
pub const ACTION_LOG_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single exchange line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, in-memory message list. Lives as long as the session and is never persisted.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Message::assistant(text));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Most recent assistant actions, newest first, each stamped with local wall-clock time.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: VecDeque<String>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action as `HH:MM:SS: action`; the oldest entry drops past capacity.
    pub fn record(&mut self, action: &str) {
        let stamped = format!("{}: {}", Local::now().format("%H:%M:%S"), action);
        self.entries.push_front(stamped);
        self.entries.truncate(ACTION_LOG_CAPACITY);
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_keeps_order() {
        let mut c = Conversation::new();
        c.push_user("tengo gases");
        c.push_assistant("Entiendo tu molestia.");
        assert_eq!(c.len(), 2);
        assert_eq!(c.messages()[0].role, Role::User);
        assert_eq!(c.last().unwrap().role, Role::Assistant);
        assert!(c.messages()[0].timestamp <= c.messages()[1].timestamp);
    }

    #[test]
    fn action_log_is_bounded_and_newest_first() {
        let mut log = ActionLog::new();
        for i in 0..8 {
            log.record(&format!("accion {}", i));
        }
        assert_eq!(log.len(), ACTION_LOG_CAPACITY);
        let first = log.entries().next().unwrap();
        assert!(first.ends_with("accion 7"));
        assert!(log.entries().last().unwrap().ends_with("accion 3"));
    }
}
