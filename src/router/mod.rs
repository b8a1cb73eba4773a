//! Intent routing: maps a free-text query onto the capability that should serve it.

use crate::core::error::VtaiError;
use async_trait::async_trait;
use std::sync::Arc;

pub mod layer;

/// Which handler serves a query. Decided fresh for every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    ImageGeneration,
    VisionImageProcessing,
    Chat,
}

impl RouteDecision {
    /// Decodes a classifier route name. Missing or unrecognized names mean `Chat`.
    pub fn from_route_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return RouteDecision::Chat;
        };
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "image_generation" => RouteDecision::ImageGeneration,
            "vision_image_processing" => RouteDecision::VisionImageProcessing,
            _ => RouteDecision::Chat,
        }
    }
}

/// A semantic classification service returning the name of the best route,
/// or `None` when no route matches.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Option<String>, VtaiError>;
}

#[derive(Clone)]
pub struct IntentRouter {
    classifier: Arc<dyn Classifier>,
}

impl IntentRouter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Classifies `query`. Classifier failures are returned unchanged, without retry.
    pub async fn classify(&self, query: &str) -> Result<RouteDecision, VtaiError> {
        let name = self.classifier.classify(query).await?;
        let decision = RouteDecision::from_route_name(name.as_deref());
        tracing::info!(query, route = ?name, ?decision, "query classified");
        Ok(decision)
    }
}
