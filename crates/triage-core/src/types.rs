use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the conversation.
/// Wire: `{ "role": "user", "content": "I have a headache" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What `Conversation::replace_last_or_append` did to the log tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailUpdate {
    Replaced,
    Appended,
}

/// Ordered conversation log with copy-on-write snapshots.
///
/// Cloning is cheap (an `Arc` bump). Mutating a log whose storage is shared
/// with an older clone copies the outer sequence first, so a reader holding
/// the previous snapshot never observes the change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Arc<Vec<Message>>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True when the tail message was written by the assistant.
    pub fn ends_with_assistant(&self) -> bool {
        self.last().is_some_and(|m| m.role == Role::Assistant)
    }

    pub fn push(&mut self, message: Message) {
        Arc::make_mut(&mut self.messages).push(message);
    }

    /// Replace the tail with `message` when the tail has the same role,
    /// otherwise append it.
    pub fn replace_last_or_append(&mut self, message: Message) -> TailUpdate {
        let messages = Arc::make_mut(&mut self.messages);
        match messages.last_mut() {
            Some(last) if last.role == message.role => {
                *last = message;
                TailUpdate::Replaced
            }
            _ => {
                messages.push(message);
                TailUpdate::Appended
            }
        }
    }

    /// Drop everything after the first `len` messages.
    pub fn truncate(&mut self, len: usize) {
        if len < self.messages.len() {
            Arc::make_mut(&mut self.messages).truncate(len);
        }
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self {
            messages: Arc::new(messages),
        }
    }
}

impl FromIterator<Message> for Conversation {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_wire_format() {
        let json = serde_json::to_string(&Message::user("I have a headache")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"I have a headache"}"#);

        let parsed: Message =
            serde_json::from_str(r#"{"role":"assistant","content":"It could be tension."}"#)
                .unwrap();
        assert_eq!(parsed, Message::assistant("It could be tension."));
    }

    #[test]
    fn replace_last_appends_after_user() {
        let mut log = Conversation::from(vec![Message::user("hi")]);
        let op = log.replace_last_or_append(Message::assistant("It "));
        assert_eq!(op, TailUpdate::Appended);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn replace_last_replaces_assistant_tail() {
        let mut log = Conversation::from(vec![Message::user("hi"), Message::assistant("It ")]);
        let op = log.replace_last_or_append(Message::assistant("It could"));
        assert_eq!(op, TailUpdate::Replaced);
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().content, "It could");
    }

    #[test]
    fn replace_last_on_empty_log_appends() {
        let mut log = Conversation::new();
        assert_eq!(
            log.replace_last_or_append(Message::assistant("x")),
            TailUpdate::Appended
        );
        assert!(log.ends_with_assistant());
    }

    #[test]
    fn older_snapshot_is_unaffected_by_mutation() {
        let mut log = Conversation::from(vec![Message::user("hi"), Message::assistant("It ")]);
        let snapshot = log.clone();

        log.replace_last_or_append(Message::assistant("It could be tension."));
        log.push(Message::user("thanks"));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.last().unwrap().content, "It ");
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn truncate_restores_checkpoint() {
        let mut log: Conversation = vec![Message::user("a"), Message::assistant("b")]
            .into_iter()
            .collect();
        let checkpoint = log.len();
        log.push(Message::user("c"));
        log.push(Message::assistant("partial"));
        log.truncate(checkpoint);
        assert_eq!(
            log.messages(),
            &[Message::user("a"), Message::assistant("b")]
        );
    }
}
