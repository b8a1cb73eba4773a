//! Embedding-based route classifier.
//!
//! Routes are defined by example utterances in a JSON file. Utterances are
//! embedded once, on first use; each query is embedded and compared by cosine
//! similarity. The route with the highest combined score among the top
//! matches wins if its best single match reaches the score threshold. The
//! threshold defaults by encoder family when not configured.

use crate::config::models::DEFAULT_EMBEDDING_MODEL;
use crate::core::error::VtaiError;
use crate::providers::EmbeddingService;
use crate::router::Classifier;
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

const BUNDLED_ROUTES: &str = include_str!("../../resources/semantic_route_layers.json");

/// Number of nearest utterances considered per query.
const TOP_K: usize = 5;

/// Score threshold for `text-embedding-3-*` encoders, whose cosine scores sit lower.
const V3_ENCODER_SCORE_THRESHOLD: f32 = 0.3;
const DEFAULT_SCORE_THRESHOLD: f32 = 0.82;

/// The threshold used when none is configured, chosen by encoder family.
pub fn default_score_threshold(encoder_model: &str) -> f32 {
    if encoder_model.starts_with("text-embedding-3") {
        V3_ENCODER_SCORE_THRESHOLD
    } else {
        DEFAULT_SCORE_THRESHOLD
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteDefinition {
    pub name: String,
    #[serde(default)]
    pub utterances: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RouteLayerFile {
    #[serde(default)]
    encoder_name: Option<String>,
    routes: Vec<RouteDefinition>,
}

struct IndexedUtterance {
    route: usize,
    embedding: Vec<f32>,
}

pub struct RouteLayer {
    routes: Vec<RouteDefinition>,
    encoder: Arc<dyn EmbeddingService>,
    encoder_model: String,
    score_threshold: f32,
    index: OnceCell<Vec<IndexedUtterance>>,
}

impl RouteLayer {
    pub fn from_json(
        json: &str,
        encoder: Arc<dyn EmbeddingService>,
        score_threshold: Option<f32>,
    ) -> Result<Self, VtaiError> {
        let file: RouteLayerFile = serde_json::from_str(json)?;
        if file.routes.iter().any(|r| r.name.trim().is_empty()) {
            return Err(VtaiError::Config("route with empty name".to_string()));
        }

        let encoder_model = file
            .encoder_name
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        Ok(Self {
            routes: file.routes,
            encoder,
            score_threshold: score_threshold
                .unwrap_or_else(|| default_score_threshold(&encoder_model)),
            encoder_model,
            index: OnceCell::new(),
        })
    }

    pub fn from_file(
        path: &Path,
        encoder: Arc<dyn EmbeddingService>,
        score_threshold: Option<f32>,
    ) -> Result<Self, VtaiError> {
        let json = fs::read_to_string(path)
            .map_err(|e| VtaiError::Config(format!("Read {}: {}", path.display(), e)))?;
        Self::from_json(&json, encoder, score_threshold)
    }

    /// Route definitions shipped with the binary.
    pub fn bundled(
        encoder: Arc<dyn EmbeddingService>,
        score_threshold: Option<f32>,
    ) -> Result<Self, VtaiError> {
        Self::from_json(BUNDLED_ROUTES, encoder, score_threshold)
    }

    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.name.as_str())
    }

    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    async fn index(&self) -> Result<&[IndexedUtterance], VtaiError> {
        let index = self.index.get_or_try_init(|| self.build_index()).await?;
        Ok(index)
    }

    async fn build_index(&self) -> Result<Vec<IndexedUtterance>, VtaiError> {
        let (owners, texts): (Vec<usize>, Vec<String>) = self
            .routes
            .iter()
            .enumerate()
            .flat_map(|(i, r)| r.utterances.iter().map(move |u| (i, u.clone())))
            .unzip();

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embed(&texts).await?;
        tracing::debug!(utterances = texts.len(), "route layer index built");
        Ok(owners
            .into_iter()
            .zip(embeddings)
            .map(|(route, embedding)| IndexedUtterance { route, embedding })
            .collect())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VtaiError> {
        let embeddings = self
            .encoder
            .embed(&self.encoder_model, texts)
            .await
            .map_err(|e| VtaiError::Classifier(format!("embedding failed: {}", e)))?;
        if embeddings.len() != texts.len() {
            return Err(VtaiError::Classifier(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl Classifier for RouteLayer {
    async fn classify(&self, text: &str) -> Result<Option<String>, VtaiError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let index = self.index().await?;
        if index.is_empty() {
            return Ok(None);
        }

        let query = self
            .embed(&[text.to_string()])
            .await?
            .pop()
            .unwrap_or_default();

        let mut scored: Vec<(usize, f32)> = index
            .iter()
            .map(|u| (u.route, cosine_similarity(&query, &u.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(TOP_K);

        // (total, best) per route among the top matches
        let mut totals = vec![(0.0f32, f32::MIN); self.routes.len()];
        for (route, score) in scored {
            totals[route].0 += score;
            totals[route].1 = totals[route].1.max(score);
        }

        let best = totals
            .iter()
            .enumerate()
            .filter(|(_, (_, best))| *best > f32::MIN)
            .max_by(|a, b| a.1.0.total_cmp(&b.1.0));

        Ok(match best {
            Some((route, (_, top))) if *top >= self.score_threshold => {
                Some(self.routes[route].name.clone())
            }
            _ => None,
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    const ROUTES: &str = r#"{
        "encoder_name": "test-embedder",
        "routes": [
            {"name": "image-generation", "utterances": ["draw a picture", "generate an image"]},
            {"name": "vision-image-processing", "utterances": ["describe this photo"]}
        ]
    }"#;

    fn layer(threshold: f32) -> (RouteLayer, Arc<KeywordEmbedder>) {
        let embedder = Arc::new(KeywordEmbedder::new(&["draw", "image", "photo", "weather"]));
        let layer = RouteLayer::from_json(ROUTES, embedder.clone(), Some(threshold)).unwrap();
        (layer, embedder)
    }

    #[test]
    fn test_bundled_routes_parse() {
        let embedder = Arc::new(KeywordEmbedder::new(&["x"]));
        let layer = RouteLayer::bundled(embedder, Some(0.8)).unwrap();
        let names: Vec<&str> = layer.route_names().collect();
        assert!(names.contains(&"image-generation"));
        assert!(names.contains(&"vision-image-processing"));
        assert_eq!(layer.score_threshold(), 0.8);
    }

    #[test]
    fn test_unset_threshold_follows_encoder() {
        let embedder = Arc::new(KeywordEmbedder::new(&["x"]));
        let bundled = RouteLayer::bundled(embedder.clone(), None).unwrap();
        assert_eq!(bundled.score_threshold(), V3_ENCODER_SCORE_THRESHOLD);

        let ada = r#"{"encoder_name": "text-embedding-ada-002", "routes": []}"#;
        let layer = RouteLayer::from_json(ada, embedder.clone(), None).unwrap();
        assert_eq!(layer.score_threshold(), DEFAULT_SCORE_THRESHOLD);

        let unnamed = r#"{"routes": []}"#;
        let layer = RouteLayer::from_json(unnamed, embedder, None).unwrap();
        assert_eq!(
            layer.score_threshold(),
            default_score_threshold(DEFAULT_EMBEDDING_MODEL)
        );
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_classify_picks_closest_route() {
        let (layer, _) = layer(0.5);
        assert_eq!(
            layer.classify("please draw me a cat").await.unwrap().as_deref(),
            Some("image-generation")
        );
        assert_eq!(
            layer.classify("what is in this photo").await.unwrap().as_deref(),
            Some("vision-image-processing")
        );
    }

    #[tokio::test]
    async fn test_classify_below_threshold_is_none() {
        let (layer, _) = layer(0.5);
        assert_eq!(layer.classify("how is the weather").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_utterances_embedded_once() {
        let (layer, embedder) = layer(0.5);
        layer.classify("draw").await.unwrap();
        layer.classify("photo").await.unwrap();
        // one index build plus one call per query
        assert_eq!(embedder.calls(), 3);
    }

    #[tokio::test]
    async fn test_encoder_failure_is_classifier_error() {
        let embedder = Arc::new(KeywordEmbedder::failing());
        let layer = RouteLayer::from_json(ROUTES, embedder, Some(0.5)).unwrap();
        let err = layer.classify("draw").await.unwrap_err();
        assert!(matches!(err, VtaiError::Classifier(_)));
    }
}
