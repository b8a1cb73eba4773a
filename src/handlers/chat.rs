use crate::config::models;
use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::output::{Action, OutboundMessage, OutputSink};
use crate::providers::{ChatCompletionService, Role};
use futures::StreamExt;
use std::sync::Arc;

pub struct ChatHandler {
    service: Arc<dyn ChatCompletionService>,
}

impl ChatHandler {
    pub fn new(service: Arc<dyn ChatCompletionService>) -> Self {
        Self { service }
    }

    /// Streams a completion of the session history into a new message.
    ///
    /// The assembled reply is appended to history only after the stream
    /// finished without error.
    pub async fn run(
        &self,
        session: &mut SessionContext,
        sink: &dyn OutputSink,
    ) -> Result<(), VtaiError> {
        let settings = session.settings().clone();
        let model = settings.chat_model.as_str();

        let messages = if settings.trim_messages {
            session.history.trimmed(models::input_token_budget(model))
        } else {
            session.history.get_all().to_vec()
        };

        tracing::debug!(model, messages = messages.len(), "starting chat completion");
        let id = sink.send(OutboundMessage::new("").author(model)).await?;
        let mut stream = self.service.complete_stream(model, &messages).await?;

        let mut content = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            sink.stream_token(id, &chunk).await?;
            content.push_str(&chunk);
        }

        session.history.append(Role::Assistant, &content);

        let mut actions = Vec::new();
        if settings.enable_tts_response && !content.is_empty() {
            actions.push(Action::Speak(content.clone()));
        }
        sink.update(id, &content, actions).await
    }
}
