//! Append-only message sequence for one conversation.

use super::{ConversationMessage, Role};

/// Ordered messages of a conversation. [`Timeline::append`] is the only way
/// in. The one exception is [`Timeline::replace_last_reply`], which swaps the
/// trailing AI or error message for its regeneration. Nothing is removed or
/// reordered.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    messages: Vec<ConversationMessage>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return a copy of it.
    pub fn append(&mut self, message: ConversationMessage) -> ConversationMessage {
        tracing::trace!(id = %message.id, role = ?message.role, "Chat: timeline append");
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Messages up to, but not including, a trailing AI or error message.
    pub fn before_last_reply(&self) -> &[ConversationMessage] {
        match self.messages.split_last() {
            Some((last, rest)) if last.role != Role::Human => rest,
            _ => &self.messages,
        }
    }

    /// Put `message` in place of the trailing AI or error message. Appends
    /// when the timeline ends with a human message or is empty.
    pub fn replace_last_reply(&mut self, message: ConversationMessage) -> ConversationMessage {
        match self.messages.last_mut() {
            Some(last) if last.role != Role::Human => {
                tracing::trace!(old = %last.id, new = %message.id, "Chat: timeline reply replaced");
                *last = message.clone();
            }
            _ => self.messages.push(message.clone()),
        }
        message
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
