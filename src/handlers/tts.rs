use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::output::{Element, OutboundMessage, OutputSink};
use crate::providers::{Role, SpeechService};
use crate::providers::ByteStream;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

pub struct SpeechHandler {
    service: Arc<dyn SpeechService>,
}

impl SpeechHandler {
    pub fn new(service: Arc<dyn SpeechService>) -> Self {
        Self { service }
    }

    /// Reads `text` aloud into the session's audio file, replacing any earlier output.
    ///
    /// Does nothing when speech responses are disabled or `text` is empty.
    /// The spoken text is recorded in history unless it is already the
    /// latest assistant entry.
    pub async fn run(
        &self,
        session: &mut SessionContext,
        sink: &dyn OutputSink,
        text: &str,
    ) -> Result<(), VtaiError> {
        let settings = session.settings().clone();
        if !settings.enable_tts_response || text.is_empty() {
            return Ok(());
        }

        let model = settings.tts_model.as_str();
        let voice = settings.tts_voice.as_str();
        let path = session.tts_artifact_path().to_path_buf();

        let audio = self.service.synthesize(model, voice, text).await?;
        let partial = path.with_extension("mp3.part");
        let written = match write_audio(audio, &partial).await {
            Ok(written) => written,
            Err(e) => {
                tokio::fs::remove_file(&partial).await.ok();
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, &path).await?;
        tracing::info!(model, voice, bytes = written, path = %path.display(), "speech written");

        sink.send(
            OutboundMessage::new(format!(
                "You're hearing an AI voice generated by OpenAI's {} model, using the {} style. You can customize this in Settings if you'd like!",
                model, voice
            ))
            .author(model)
            .element(Element::Text {
                name: "Context".to_string(),
                content: text.to_string(),
            })
            .element(Element::Audio {
                name: String::new(),
                path,
            }),
        )
        .await?;

        let already_recorded = session
            .history
            .last()
            .is_some_and(|m| m.role == Role::Assistant && m.content == text);
        if !already_recorded {
            session.history.append(Role::Assistant, text);
        }
        Ok(())
    }
}

/// Streams `audio` into a new file at `path`, returning the bytes written.
async fn write_audio(mut audio: ByteStream, path: &Path) -> Result<usize, VtaiError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0usize;
    while let Some(chunk) = audio.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SettingKey, SettingsUpdate};
    use crate::testing::{MockSpeech, RecordingSink, session};

    #[tokio::test]
    async fn test_disabled_produces_nothing() {
        let mut session = session();
        session
            .update_settings(&SettingsUpdate::new().set(SettingKey::EnableTtsResponse, "off"))
            .unwrap();
        let speech = Arc::new(MockSpeech::new(b"audio"));
        let sink = RecordingSink::default();

        SpeechHandler::new(speech.clone())
            .run(&mut session, &sink, "say this")
            .await
            .unwrap();

        assert_eq!(speech.calls(), 0);
        assert!(!session.tts_artifact_path().exists());
        assert_eq!(session.history.len(), 1);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let mut session = session();
        let speech = Arc::new(MockSpeech::new(b"audio"));

        SpeechHandler::new(speech.clone())
            .run(&mut session, &RecordingSink::default(), "")
            .await
            .unwrap();

        assert_eq!(speech.calls(), 0);
    }

    #[tokio::test]
    async fn test_writes_and_overwrites_artifact() {
        let mut session = session();
        let sink = RecordingSink::default();

        SpeechHandler::new(Arc::new(MockSpeech::new(b"first-long-output")))
            .run(&mut session, &sink, "one")
            .await
            .unwrap();
        SpeechHandler::new(Arc::new(MockSpeech::new(b"second")))
            .run(&mut session, &sink, "two")
            .await
            .unwrap();

        let bytes = std::fs::read(session.tts_artifact_path()).unwrap();
        assert_eq!(bytes, b"second");
    }

    #[tokio::test]
    async fn test_interrupted_stream_keeps_previous_audio() {
        let mut session = session();
        let sink = RecordingSink::default();

        SpeechHandler::new(Arc::new(MockSpeech::new(b"complete")))
            .run(&mut session, &sink, "one")
            .await
            .unwrap();
        let err = SpeechHandler::new(Arc::new(MockSpeech::failing_midway(b"broken-audio")))
            .run(&mut session, &sink, "two")
            .await
            .unwrap_err();

        assert!(matches!(err, VtaiError::Network(_)));
        let path = session.tts_artifact_path();
        assert_eq!(std::fs::read(path).unwrap(), b"complete");
        assert!(!path.with_extension("mp3.part").exists());
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_does_not_duplicate_latest_entry() {
        let mut session = session();
        session.history.append(Role::Assistant, "already said");

        SpeechHandler::new(Arc::new(MockSpeech::new(b"x")))
            .run(&mut session, &RecordingSink::default(), "already said")
            .await
            .unwrap();
        assert_eq!(session.history.len(), 2);

        SpeechHandler::new(Arc::new(MockSpeech::new(b"x")))
            .run(&mut session, &RecordingSink::default(), "something new")
            .await
            .unwrap();
        assert_eq!(session.history.len(), 3);
    }
}
