//! Conversation history for one chat session.
//!
//! The history always starts with exactly one system message. Appends of
//! empty content are ignored.

use crate::core::error::VtaiError;
use crate::providers::{Message, Role};

/// Rough characters-per-token ratio used for budget estimates.
const CHARS_PER_TOKEN: usize = 4;
/// Fixed per-message cost for role markers and separators.
const TOKENS_PER_MESSAGE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![Message::new(Role::System, system_prompt)],
        }
    }

    /// Appends a message. Returns whether the history changed.
    pub fn append(&mut self, role: Role, content: &str) -> bool {
        if content.is_empty() {
            return false;
        }
        self.messages.push(Message::new(role, content));
        true
    }

    pub fn get_all(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Replaces the whole history with a single system message.
    pub fn reset(&mut self, system_prompt: &str) {
        self.messages = vec![Message::new(Role::System, system_prompt)];
    }

    /// Replaces the history with previously saved messages.
    pub fn restore(&mut self, messages: Vec<Message>) -> Result<(), VtaiError> {
        match messages.first() {
            Some(first) if first.role == Role::System => {
                self.messages = messages;
                Ok(())
            }
            _ => Err(VtaiError::Input(
                "saved history must start with a system message".to_string(),
            )),
        }
    }

    /// Returns a copy of the history that fits `max_tokens`.
    ///
    /// The leading system message and the newest message are always kept;
    /// the oldest user/assistant messages are dropped first.
    pub fn trimmed(&self, max_tokens: usize) -> Vec<Message> {
        let (system, rest) = match self.messages.split_first() {
            Some(split) => split,
            None => return Vec::new(),
        };

        let mut total: usize = self.messages.iter().map(estimate_tokens).sum();
        let mut start = 0;
        while total > max_tokens && start + 1 < rest.len() {
            total -= estimate_tokens(&rest[start]);
            start += 1;
        }

        if start > 0 {
            tracing::debug!(dropped = start, budget = max_tokens, "trimmed history");
        }

        std::iter::once(system)
            .chain(&rest[start..])
            .cloned()
            .collect()
    }
}

fn estimate_tokens(message: &Message) -> usize {
    message.content.chars().count().div_ceil(CHARS_PER_TOKEN) + TOKENS_PER_MESSAGE
}
