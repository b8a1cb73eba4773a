use crate::config::{Config, Provider};
use crate::core::error::VtaiError;
use crate::handlers::Services;
use crate::providers::openai_compatible::OpenAICompatibleClient;
use crate::providers::{
    ByteStream, ChatCompletionService, EmbeddingService, GeneratedImage, ImageGenerationService,
    Message, SpeechService, TokenStream, TranscriptionService, VisionService,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Sends each request to the provider named by the model's `provider/` prefix.
#[derive(Clone, Default)]
pub struct ProviderRouter {
    clients: HashMap<Provider, OpenAICompatibleClient>,
}

impl ProviderRouter {
    /// Builds a client for every provider that has an API key.
    pub fn from_config(config: &Config) -> Self {
        let mut router = Self::default();
        for provider in [Provider::OpenAI, Provider::Gemini] {
            match config.api_key(provider) {
                Some(key) => {
                    let client = OpenAICompatibleClient::new(
                        config.base_url(provider),
                        key,
                        config.max_retries,
                    );
                    router = router.with_client(provider, client);
                }
                None => tracing::debug!(provider = ?provider, "no API key, provider disabled"),
            }
        }
        router
    }

    pub fn with_client(mut self, provider: Provider, client: OpenAICompatibleClient) -> Self {
        self.clients.insert(provider, client);
        self
    }

    /// The client and provider-local model name for `model`.
    fn resolve<'a>(
        &self,
        model: &'a str,
    ) -> Result<(&OpenAICompatibleClient, &'a str), VtaiError> {
        let (provider, name) = Provider::for_model(model);
        let client = self.clients.get(&provider).ok_or_else(|| {
            VtaiError::Config(format!(
                "No API key configured for {:?}; set {} to use `{}`",
                provider,
                provider.api_key_env(),
                model
            ))
        })?;
        Ok((client, name))
    }

    pub fn services(self) -> Services {
        let router = Arc::new(self);
        Services {
            chat: router.clone(),
            images: router.clone(),
            vision: router.clone(),
            transcription: router.clone(),
            speech: router,
        }
    }
}

#[async_trait]
impl ChatCompletionService for ProviderRouter {
    async fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<TokenStream, VtaiError> {
        let (client, name) = self.resolve(model)?;
        client.chat_stream(name, messages).await
    }
}

#[async_trait]
impl ImageGenerationService for ProviderRouter {
    async fn generate(&self, model: &str, prompt: &str) -> Result<GeneratedImage, VtaiError> {
        let (client, name) = self.resolve(model)?;
        client.generate_image(name, prompt).await
    }
}

#[async_trait]
impl VisionService for ProviderRouter {
    async fn describe(
        &self,
        model: &str,
        prompt: &str,
        image_url: &str,
    ) -> Result<String, VtaiError> {
        let (client, name) = self.resolve(model)?;
        client.vision_completion(name, prompt, image_url).await
    }
}

#[async_trait]
impl TranscriptionService for ProviderRouter {
    async fn transcribe(&self, model: &str, audio_file: &Path) -> Result<String, VtaiError> {
        let (client, name) = self.resolve(model)?;
        client.transcribe(name, audio_file).await
    }
}

#[async_trait]
impl SpeechService for ProviderRouter {
    async fn synthesize(
        &self,
        model: &str,
        voice: &str,
        input: &str,
    ) -> Result<ByteStream, VtaiError> {
        let (client, name) = self.resolve(model)?;
        client.speech(name, voice, input).await
    }
}

#[async_trait]
impl EmbeddingService for ProviderRouter {
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, VtaiError> {
        let (client, name) = self.resolve(model)?;
        client.embeddings(name, texts).await
    }
}
