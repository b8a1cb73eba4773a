use crate::config::models::DEFAULT_IMAGE_GEN_MODEL;
use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::output::{Action, Element, MediaSource, OutboundMessage, OutputSink};
use crate::providers::{ImageGenerationService, Role};
use std::sync::Arc;

pub struct ImageGenerationHandler {
    service: Arc<dyn ImageGenerationService>,
}

impl ImageGenerationHandler {
    pub fn new(service: Arc<dyn ImageGenerationService>) -> Self {
        Self { service }
    }

    pub async fn run(
        &self,
        session: &mut SessionContext,
        sink: &dyn OutputSink,
        query: &str,
    ) -> Result<(), VtaiError> {
        let model = DEFAULT_IMAGE_GEN_MODEL;
        sink.send(
            OutboundMessage::new(format!(
                "Sure! I'll use the `{}` model to create an image based on your description. This might take a moment, please be patient.",
                model
            ))
            .author(model),
        )
        .await?;

        let image = self.service.generate(model, query).await?;
        tracing::info!(model, url = %image.url, "image generated");

        session.history.append(Role::Assistant, &image.revised_prompt);

        sink.send(
            OutboundMessage::new(
                "Here's the image, along with a refined description based on your input:",
            )
            .author(model)
            .element(Element::Image {
                name: query.to_string(),
                source: MediaSource::Url(image.url),
            })
            .element(Element::Text {
                name: "Description".to_string(),
                content: image.revised_prompt.clone(),
            })
            .action(Action::Speak(image.revised_prompt)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockImages, RecordingSink, session};

    #[tokio::test]
    async fn test_appends_revised_prompt_and_attaches_speak() {
        let mut session = session();
        let sink = RecordingSink::default();
        let images = Arc::new(MockImages::returning("https://img.example/cat.png", "A fluffy cat"));

        ImageGenerationHandler::new(images.clone())
            .run(&mut session, &sink, "draw me a cat")
            .await
            .unwrap();

        assert_eq!(images.prompts(), vec!["draw me a cat"]);
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history.last().unwrap().content, "A fluffy cat");

        let sent = sink.sent();
        let last = sent.last().unwrap();
        assert!(last.elements.contains(&Element::Image {
            name: "draw me a cat".to_string(),
            source: MediaSource::Url("https://img.example/cat.png".to_string()),
        }));
        assert_eq!(last.actions, vec![Action::Speak("A fluffy cat".to_string())]);
    }

    #[tokio::test]
    async fn test_failure_appends_nothing() {
        let mut session = session();
        let sink = RecordingSink::default();

        let result = ImageGenerationHandler::new(Arc::new(MockImages::failing()))
            .run(&mut session, &sink, "draw")
            .await;

        assert!(result.is_err());
        assert_eq!(session.history.len(), 1);
    }
}
