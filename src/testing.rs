//! Test doubles for the remote services and the output sink.

use crate::config::{DEFAULT_SYSTEM_PROMPT, SessionSettings};
use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::handlers::Services;
use crate::output::{Action, MessageId, OutboundMessage, OutputSink};
use crate::providers::{
    ByteStream, ChatCompletionService, EmbeddingService, GeneratedImage, ImageGenerationService,
    Message, SpeechService, TokenStream, TranscriptionService, VisionService,
};
use crate::router::Classifier;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fresh session with default settings, writing audio under the system temp dir.
pub fn session() -> SessionContext {
    SessionContext::new(
        SessionSettings::default(),
        DEFAULT_SYSTEM_PROMPT,
        &std::env::temp_dir(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Sent(MessageId, OutboundMessage),
    Token(MessageId, String),
    Updated(MessageId, String, Vec<Action>),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    next_id: AtomicUsize,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Sent(_, m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Actions attached by the most recent `update`.
    pub fn final_actions(&self) -> Vec<Action> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                SinkEvent::Updated(_, _, actions) => Some(actions),
                _ => None,
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, VtaiError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as MessageId;
        self.events.lock().unwrap().push(SinkEvent::Sent(id, message));
        Ok(id)
    }

    async fn stream_token(&self, id: MessageId, token: &str) -> Result<(), VtaiError> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Token(id, token.to_string()));
        Ok(())
    }

    async fn update(
        &self,
        id: MessageId,
        content: &str,
        actions: Vec<Action>,
    ) -> Result<(), VtaiError> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Updated(id, content.to_string(), actions));
        Ok(())
    }
}

pub struct StaticClassifier {
    route: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticClassifier {
    pub fn route(name: &str) -> Self {
        Self {
            route: Some(name.to_string()),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn no_match() -> Self {
        Self {
            route: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            route: None,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, _text: &str) -> Result<Option<String>, VtaiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VtaiError::Classifier("classifier offline".to_string()));
        }
        Ok(self.route.clone())
    }
}

/// Embeds text as keyword occurrence counts over a fixed vocabulary.
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    async fn embed(&self, _model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, VtaiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VtaiError::Network("connection refused".to_string()));
        }
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                self.vocabulary
                    .iter()
                    .map(|word| text.matches(word.as_str()).count() as f32)
                    .collect()
            })
            .collect())
    }
}

pub struct MockChat {
    chunks: Vec<String>,
    fail_after: bool,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockChat {
    pub fn replying(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_after: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Streams `chunks`, then fails mid-stream.
    pub fn failing_after(chunks: &[&str]) -> Self {
        Self {
            fail_after: true,
            ..Self::replying(chunks)
        }
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompletionService for MockChat {
    async fn complete_stream(
        &self,
        _model: &str,
        messages: &[Message],
    ) -> Result<TokenStream, VtaiError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut items: Vec<Result<String, VtaiError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if self.fail_after {
            items.push(Err(VtaiError::Network("stream reset".to_string())));
        }
        Ok(stream::iter(items).boxed())
    }
}

pub struct MockImages {
    image: Option<GeneratedImage>,
    prompts: Mutex<Vec<String>>,
}

impl MockImages {
    pub fn returning(url: &str, revised_prompt: &str) -> Self {
        Self {
            image: Some(GeneratedImage {
                url: url.to_string(),
                revised_prompt: revised_prompt.to_string(),
            }),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerationService for MockImages {
    async fn generate(&self, _model: &str, prompt: &str) -> Result<GeneratedImage, VtaiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.image
            .clone()
            .ok_or_else(|| VtaiError::Api("400 content policy violation".to_string()))
    }
}

pub struct MockVision {
    description: String,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl MockVision {
    pub fn describing(description: &str) -> Self {
        Self {
            description: description.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(model, prompt, image_url)` per call.
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionService for MockVision {
    async fn describe(
        &self,
        model: &str,
        prompt: &str,
        image_url: &str,
    ) -> Result<String, VtaiError> {
        self.calls.lock().unwrap().push((
            model.to_string(),
            prompt.to_string(),
            image_url.to_string(),
        ));
        Ok(self.description.clone())
    }
}

pub struct MockTranscriber {
    text: String,
    files: Mutex<Vec<PathBuf>>,
}

impl MockTranscriber {
    pub fn returning(text: &str) -> Self {
        Self {
            text: text.to_string(),
            files: Mutex::new(Vec::new()),
        }
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptionService for MockTranscriber {
    async fn transcribe(&self, _model: &str, audio_file: &Path) -> Result<String, VtaiError> {
        self.files.lock().unwrap().push(audio_file.to_path_buf());
        Ok(self.text.clone())
    }
}

pub struct MockSpeech {
    audio: Vec<u8>,
    fail_midway: bool,
    calls: AtomicUsize,
}

impl MockSpeech {
    pub fn new(audio: &[u8]) -> Self {
        Self {
            audio: audio.to_vec(),
            fail_midway: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Yields the first half of `audio`, then a network error.
    pub fn failing_midway(audio: &[u8]) -> Self {
        Self {
            fail_midway: true,
            ..Self::new(audio)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechService for MockSpeech {
    async fn synthesize(
        &self,
        _model: &str,
        _voice: &str,
        _input: &str,
    ) -> Result<ByteStream, VtaiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (head, tail) = self.audio.split_at(self.audio.len() / 2);
        let tail = if self.fail_midway {
            Err(VtaiError::Network("connection reset".to_string()))
        } else {
            Ok(tail.to_vec())
        };
        let chunks = vec![Ok(head.to_vec()), tail];
        Ok(stream::iter(chunks).boxed())
    }
}

/// Mocks wired into a `Services` bundle, kept so tests can inspect them.
pub struct MockServices {
    pub chat: Arc<MockChat>,
    pub images: Arc<MockImages>,
    pub vision: Arc<MockVision>,
    pub transcription: Arc<MockTranscriber>,
    pub speech: Arc<MockSpeech>,
}

impl MockServices {
    pub fn new() -> Self {
        Self {
            chat: Arc::new(MockChat::replying(&["chat ", "reply"])),
            images: Arc::new(MockImages::returning(
                "https://img.example/generated.png",
                "A photorealistic cat",
            )),
            vision: Arc::new(MockVision::describing("An image description")),
            transcription: Arc::new(MockTranscriber::returning("transcribed words")),
            speech: Arc::new(MockSpeech::new(b"mp3-bytes")),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            chat: self.chat.clone(),
            images: self.images.clone(),
            vision: self.vision.clone(),
            transcription: self.transcription.clone(),
            speech: self.speech.clone(),
        }
    }
}
