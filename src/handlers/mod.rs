//! One handler per capability. Each sends its output to the sink and, on
//! success, records at most one assistant entry in the session history.

use crate::providers::{
    ChatCompletionService, ImageGenerationService, SpeechService, TranscriptionService,
    VisionService,
};
use std::sync::Arc;

pub mod audio;
pub mod chat;
pub mod image;
pub mod tts;
pub mod vision;

pub use audio::TranscriptionHandler;
pub use chat::ChatHandler;
pub use image::ImageGenerationHandler;
pub use tts::SpeechHandler;
pub use vision::VisionHandler;

/// The remote services backing the handlers.
#[derive(Clone)]
pub struct Services {
    pub chat: Arc<dyn ChatCompletionService>,
    pub images: Arc<dyn ImageGenerationService>,
    pub vision: Arc<dyn VisionService>,
    pub transcription: Arc<dyn TranscriptionService>,
    pub speech: Arc<dyn SpeechService>,
}
