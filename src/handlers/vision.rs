use crate::config::models::{self, DEFAULT_VISION_MODEL};
use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::output::{Action, Element, MediaSource, OutboundMessage, OutputSink};
use crate::providers::{Role, VisionService};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_VISION_PROMPT: &str = "Describe this image.";

pub struct VisionHandler {
    service: Arc<dyn VisionService>,
}

impl VisionHandler {
    pub fn new(service: Arc<dyn VisionService>) -> Self {
        Self { service }
    }

    /// Describes an image given as a local path (`is_local`) or a remote URL.
    ///
    /// Local attachments always use the default vision model; routed URLs use
    /// the session's vision model. A model without image support only
    /// produces a notice.
    pub async fn run(
        &self,
        session: &mut SessionContext,
        sink: &dyn OutputSink,
        image: &str,
        prompt: &str,
        is_local: bool,
    ) -> Result<(), VtaiError> {
        let model = if is_local {
            DEFAULT_VISION_MODEL.to_string()
        } else {
            session.settings().vision_model.clone()
        };

        if !models::supports_vision(&model) {
            tracing::warn!(model = %model, "vision model lacks image support");
            sink.send(OutboundMessage::new(format!(
                "It seems the vision model `{}` doesn't support image processing. Please choose a different model in Settings that offers Vision capabilities.",
                model
            )))
            .await?;
            return Ok(());
        }

        sink.send(
            OutboundMessage::new(format!(
                "Analyzing the image using the `{}` model... This might take a moment. 🔎",
                model
            ))
            .author(&model),
        )
        .await?;

        let (image_url, source) = if is_local {
            let path = PathBuf::from(image);
            (data_url(&path).await?, MediaSource::Path(path))
        } else {
            (image.to_string(), MediaSource::Url(image.to_string()))
        };

        let prompt = if prompt.trim().is_empty() {
            DEFAULT_VISION_PROMPT
        } else {
            prompt
        };
        let description = self.service.describe(&model, prompt, &image_url).await?;

        session.history.append(Role::Assistant, &description);

        sink.send(
            OutboundMessage::new("")
                .author(&model)
                .element(Element::Image {
                    name: prompt.to_string(),
                    source,
                })
                .element(Element::Text {
                    name: "Explain".to_string(),
                    content: description.clone(),
                })
                .action(Action::Speak(description)),
        )
        .await?;
        Ok(())
    }
}

/// Inlines a local image as a base64 `data:` URL.
async fn data_url(path: &Path) -> Result<String, VtaiError> {
    let bytes = tokio::fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}
