//! Turn orchestration: decides which handler serves an inbound message or
//! action, runs it against the session and reports failures to the user.
//!
//! Every entry point returns once the turn is over. Errors never escape:
//! they are logged and shown as a failure notice, and the session stays
//! usable for the next message.

use crate::core::attachment::{Attachment, MimeCategory};
use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::handlers::{
    ChatHandler, ImageGenerationHandler, Services, SpeechHandler, TranscriptionHandler,
    VisionHandler,
};
use crate::output::{Action, OutboundMessage, OutputSink};
use crate::providers::Role;
use crate::router::{IntentRouter, RouteDecision};
use crate::utils::extract_urls;
use std::sync::Arc;

const GREETING: &str =
    "Hello! I'm here to assist you. Please don't hesitate to ask me anything you'd like to know.";

/// A user message as received from the front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl InboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

pub struct Dispatcher {
    router: IntentRouter,
    chat: ChatHandler,
    image: ImageGenerationHandler,
    vision: VisionHandler,
    transcription: TranscriptionHandler,
    speech: SpeechHandler,
    sink: Arc<dyn OutputSink>,
}

impl Dispatcher {
    pub fn new(services: Services, router: IntentRouter, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            router,
            chat: ChatHandler::new(services.chat),
            image: ImageGenerationHandler::new(services.images),
            vision: VisionHandler::new(services.vision),
            transcription: TranscriptionHandler::new(services.transcription),
            speech: SpeechHandler::new(services.speech),
            sink,
        }
    }

    /// Resets the session to its system prompt and greets the user.
    pub async fn start_session(&self, session: &mut SessionContext) {
        session.reset_history();
        match self.sink.send(OutboundMessage::new(GREETING)).await {
            Ok(_) => {
                session.history.append(Role::Assistant, GREETING);
            }
            Err(e) => self.report_failure(&e).await,
        }
    }

    pub async fn on_message(&self, session: &mut SessionContext, message: InboundMessage) {
        let result = if message.attachments.is_empty() {
            self.handle_conversation(session, &message.content).await
        } else {
            self.handle_attachments(session, message).await
        };

        if let Err(e) = result {
            self.report_failure(&e).await;
        }
    }

    pub async fn on_action(&self, session: &mut SessionContext, action: Action) {
        let result = match action {
            Action::Speak(text) => self.speech.run(session, self.sink.as_ref(), &text).await,
        };

        if let Err(e) = result {
            self.report_failure(&e).await;
        }
    }

    async fn handle_attachments(
        &self,
        session: &mut SessionContext,
        message: InboundMessage,
    ) -> Result<(), VtaiError> {
        let prompt = message.content;
        session.history.append(Role::User, &prompt);

        for attachment in &message.attachments {
            if let Err(e) = self.handle_attachment(session, attachment, &prompt).await {
                tracing::warn!(file = %attachment.display_name(), "attachment failed, continuing");
                self.report_failure(&e).await;
            }
        }
        Ok(())
    }

    async fn handle_attachment(
        &self,
        session: &mut SessionContext,
        attachment: &Attachment,
        prompt: &str,
    ) -> Result<(), VtaiError> {
        if !attachment.path.is_file() {
            tracing::warn!(path = %attachment.path.display(), "attachment missing");
            self.sink
                .send(OutboundMessage::new(format!(
                    "No file attached: {} could not be found.",
                    attachment.path.display()
                )))
                .await?;
            return Ok(());
        }

        tracing::debug!(
            file = %attachment.display_name(),
            category = ?attachment.mime_category,
            "processing attachment"
        );
        match attachment.mime_category {
            MimeCategory::Image => {
                let path = attachment.path.to_string_lossy();
                self.vision
                    .run(session, self.sink.as_ref(), &path, prompt, true)
                    .await
            }
            MimeCategory::Text => match tokio::fs::read_to_string(&attachment.path).await {
                Ok(content) => self.handle_conversation(session, &content).await,
                Err(e) => {
                    tracing::warn!(
                        file = %attachment.display_name(),
                        error = %e,
                        "unreadable text attachment"
                    );
                    self.sink
                        .send(OutboundMessage::new(format!(
                            "No file attached: {} could not be read as text.",
                            attachment.display_name()
                        )))
                        .await?;
                    Ok(())
                }
            },
            MimeCategory::Audio => self
                .transcription
                .run(session, self.sink.as_ref(), &attachment.path)
                .await
                .map(|_| ()),
            MimeCategory::Other => {
                tracing::debug!(
                    file = %attachment.display_name(),
                    "ignoring unsupported attachment"
                );
                Ok(())
            }
        }
    }

    async fn handle_conversation(
        &self,
        session: &mut SessionContext,
        query: &str,
    ) -> Result<(), VtaiError> {
        session.history.append(Role::User, query);

        if !session.settings().use_dynamic_routing {
            return self.chat.run(session, self.sink.as_ref()).await;
        }

        match self.router.classify(query).await? {
            RouteDecision::ImageGeneration => {
                self.image.run(session, self.sink.as_ref(), query).await
            }
            RouteDecision::VisionImageProcessing => match extract_urls(query).into_iter().next() {
                Some(url) => {
                    self.vision
                        .run(session, self.sink.as_ref(), &url, query, false)
                        .await
                }
                None => {
                    tracing::debug!("vision route without image URL, falling back to chat");
                    self.chat.run(session, self.sink.as_ref()).await
                }
            },
            RouteDecision::Chat => self.chat.run(session, self.sink.as_ref()).await,
        }
    }

    async fn report_failure(&self, error: &VtaiError) {
        tracing::error!(kind = error.kind(), error = %error, "turn failed");
        let notice = OutboundMessage::new(format!(
            "Something went wrong, please try again. Error type: {}, Error: {}",
            error.kind(),
            error
        ));
        if let Err(e) = self.sink.send(notice).await {
            tracing::error!(error = %e, "could not deliver failure notice");
        }
    }
}
