//! Bounded storage for the messages of one poll.

use crate::model::ChatMessage;

/// Truncates `s` to at most `max_len` bytes, backing off to the previous character boundary.
pub fn truncate_to(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

/// Same as [`truncate_to`] for optional fields.
pub fn truncate_opt(s: Option<String>, max_len: usize) -> Option<String> {
    s.map(|s| truncate_to(s, max_len))
}

/// Holds at most `capacity` messages.
///
/// Each poll collects into a fresh buffer, so a smaller batch never exposes entries left over
/// from a larger one.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    messages: Vec<ChatMessage>,
    capacity: usize,
}

impl MessageBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `message`. Returns `false` (and drops it) when the buffer is full.
    pub fn push(&mut self, message: ChatMessage) -> bool {
        if self.messages.len() >= self.capacity {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}
