use crate::config::models::DEFAULT_WHISPER_MODEL;
use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::output::{Element, OutboundMessage, OutputSink};
use crate::providers::{Role, TranscriptionService};
use std::path::Path;
use std::sync::Arc;

pub struct TranscriptionHandler {
    service: Arc<dyn TranscriptionService>,
}

impl TranscriptionHandler {
    pub fn new(service: Arc<dyn TranscriptionService>) -> Self {
        Self { service }
    }

    pub async fn run(
        &self,
        session: &mut SessionContext,
        sink: &dyn OutputSink,
        audio_file: &Path,
    ) -> Result<String, VtaiError> {
        let model = DEFAULT_WHISPER_MODEL;
        let text = self.service.transcribe(model, audio_file).await?;
        tracing::info!(
            model,
            file = %audio_file.display(),
            chars = text.len(),
            "audio transcribed"
        );

        sink.send(
            OutboundMessage::new("")
                .author(model)
                .element(Element::Audio {
                    name: "Audio".to_string(),
                    path: audio_file.to_path_buf(),
                })
                .element(Element::Text {
                    name: "Transcript".to_string(),
                    content: text.clone(),
                }),
        )
        .await?;

        session.history.append(Role::Assistant, &text);
        Ok(text)
    }
}
