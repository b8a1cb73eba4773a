use crate::core::error::VtaiError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod base_client;
pub mod factory;
pub mod openai_compatible;

/// Incremental text chunks of a streamed completion, in arrival order.
pub type TokenStream = BoxStream<'static, Result<String, VtaiError>>;

/// Raw audio bytes of a synthesized speech response.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, VtaiError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Result of an image generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
    pub revised_prompt: String,
}

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    async fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<TokenStream, VtaiError>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<GeneratedImage, VtaiError>;
}

#[async_trait]
pub trait VisionService: Send + Sync {
    /// Describes the image at `image_url` (an http(s) or `data:` URL) following `prompt`.
    async fn describe(&self, model: &str, prompt: &str, image_url: &str)
    -> Result<String, VtaiError>;
}

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn transcribe(&self, model: &str, audio_file: &Path) -> Result<String, VtaiError>;
}

#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn synthesize(&self, model: &str, voice: &str, input: &str)
    -> Result<ByteStream, VtaiError>;
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Returns one vector per input text, in input order.
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, VtaiError>;
}
