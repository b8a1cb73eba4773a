//! Messages shown to the user and the sink that renders them.

use crate::core::error::VtaiError;
use async_trait::async_trait;
use std::path::PathBuf;

pub type MessageId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    Path(PathBuf),
}

/// Inline media attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Image { name: String, source: MediaSource },
    Audio { name: String, path: PathBuf },
    Text { name: String, content: String },
}

/// A user-triggerable follow-up attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read the carried text aloud.
    Speak(String),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Speak(_) => "Speak response",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub author: Option<String>,
    pub content: String,
    pub elements: Vec<Element>,
    pub actions: Vec<Action>,
}

impl OutboundMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// Where assistant output goes. Tokens streamed into a message arrive in
/// production order; `update` finalizes it.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, VtaiError>;

    async fn stream_token(&self, id: MessageId, token: &str) -> Result<(), VtaiError>;

    async fn update(
        &self,
        id: MessageId,
        content: &str,
        actions: Vec<Action>,
    ) -> Result<(), VtaiError>;
}
