use crate::core::error::VtaiError;
use crate::providers::base_client::HttpClient;
use crate::providers::{ByteStream, GeneratedImage, Message, TokenStream};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Sampling temperature for routed chat turns.
const CHAT_TEMPERATURE: f32 = 0.3;

/// Parser for OpenAI-style streaming chat responses.
///
/// Collects every `delta.content` in the given lines. `[DONE]` markers and
/// blank keep-alive lines contribute nothing.
pub fn openai_stream_parser(data: String) -> Result<Option<String>, VtaiError> {
    let mut content = String::new();

    for line in data.lines() {
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            continue;
        }

        let parsed: serde_json::Value = serde_json::from_str(payload).map_err(|e| {
            VtaiError::Serialization(format!("Failed to parse stream data: {}", e))
        })?;

        if let Some(message) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return Err(VtaiError::Api(format!("Stream error: {}", message)));
        }

        if let Some(text) = parsed
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("delta"))
            .and_then(|delta| delta.get("content"))
            .and_then(|c| c.as_str())
        {
            content.push_str(text);
        }
    }

    if content.is_empty() {
        Ok(None)
    } else {
        Ok(Some(content))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for any endpoint speaking the OpenAI REST dialect (OpenAI itself,
/// Gemini's OpenAI compatibility layer).
#[derive(Clone)]
pub struct OpenAICompatibleClient {
    client: HttpClient,
}

impl OpenAICompatibleClient {
    pub fn new(base_url: String, api_key: String, max_retries: u32) -> Self {
        // Use Bearer token authentication
        let auth_header = Some(("Authorization".to_string(), format!("Bearer {}", api_key)));

        Self {
            client: HttpClient::new(base_url, auth_header).with_max_retries(max_retries),
        }
    }

    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<TokenStream, VtaiError> {
        let payload = ChatCompletionRequest {
            model,
            messages,
            stream: true,
            temperature: CHAT_TEMPERATURE,
        };

        let response = self.client.post("chat/completions", &payload).await?;
        Ok(self.client.stream_response(response, openai_stream_parser))
    }

    pub async fn vision_completion(
        &self,
        model: &str,
        prompt: &str,
        image_url: &str,
    ) -> Result<String, VtaiError> {
        let payload = json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image_url } },
                ],
            }],
        });

        let response = self.client.post("chat/completions", &payload).await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| VtaiError::Api("No choices in API response".to_string()))
    }

    pub async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedImage, VtaiError> {
        let payload = ImageGenerationRequest {
            model,
            prompt,
            n: 1,
        };

        let response = self.client.post("images/generations", &payload).await?;
        let parsed: ImageGenerationResponse = response.json().await?;

        let data = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| VtaiError::Api("No image in API response".to_string()))?;
        let url = data
            .url
            .ok_or_else(|| VtaiError::Api("Image response carried no URL".to_string()))?;

        Ok(GeneratedImage {
            url,
            revised_prompt: data.revised_prompt.unwrap_or_else(|| prompt.to_string()),
        })
    }

    pub async fn transcribe(&self, model: &str, audio_file: &Path) -> Result<String, VtaiError> {
        let bytes = tokio::fs::read(audio_file).await?;
        let file_name = audio_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let mime = mime_guess::from_path(audio_file).first_or_octet_stream();

        let response = self
            .client
            .post_multipart("audio/transcriptions", || {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime.as_ref())?;
                Ok(Form::new().text("model", model.to_string()).part("file", part))
            })
            .await?;

        let parsed: TranscriptionResponse = response.json().await?;
        Ok(parsed.text.trim().to_string())
    }

    pub async fn speech(
        &self,
        model: &str,
        voice: &str,
        input: &str,
    ) -> Result<ByteStream, VtaiError> {
        let payload = SpeechRequest {
            model,
            voice,
            input,
        };

        let response = self.client.post("audio/speech", &payload).await?;
        Ok(self.client.stream_bytes(response))
    }

    pub async fn embeddings(
        &self,
        model: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, VtaiError> {
        let payload = EmbeddingRequest {
            model,
            input: texts,
        };

        let response = self.client.post("embeddings", &payload).await?;
        let mut parsed: EmbeddingResponse = response.json().await?;

        if parsed.data.len() != texts.len() {
            return Err(VtaiError::Api(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
