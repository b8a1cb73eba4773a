//! Static catalog of the models a session can select, with the capability
//! data the handlers need (context window for trimming, image input support).

/// Chat model used when nothing else is configured.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
/// Vision model used for local image attachments, regardless of settings.
pub const DEFAULT_VISION_MODEL: &str = "gemini/gemini-1.5-pro";
pub const DEFAULT_IMAGE_GEN_MODEL: &str = "dall-e-3";
pub const DEFAULT_WHISPER_MODEL: &str = "whisper-1";
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

pub const TTS_MODELS: &[&str] = &["tts-1", "tts-1-hd"];

/// Context window assumed for models missing from the catalog.
const FALLBACK_CONTEXT_WINDOW: usize = 4_096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub context_window: usize,
    pub supports_vision: bool,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4o-mini",
        context_window: 128_000,
        supports_vision: true,
    },
    ModelInfo {
        id: "gpt-4o",
        context_window: 128_000,
        supports_vision: true,
    },
    ModelInfo {
        id: "gpt-4-turbo",
        context_window: 128_000,
        supports_vision: true,
    },
    ModelInfo {
        id: "gpt-3.5-turbo",
        context_window: 16_385,
        supports_vision: false,
    },
    ModelInfo {
        id: "gemini/gemini-1.5-pro",
        context_window: 2_097_152,
        supports_vision: true,
    },
    ModelInfo {
        id: "gemini/gemini-1.5-flash",
        context_window: 1_048_576,
        supports_vision: true,
    },
    ModelInfo {
        id: "gemini/gemini-2.0-flash",
        context_window: 1_048_576,
        supports_vision: true,
    },
];

pub fn lookup(model: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == model)
}

pub fn is_known(model: &str) -> bool {
    lookup(model).is_some()
}

/// Unknown models are assumed not to accept image input.
pub fn supports_vision(model: &str) -> bool {
    lookup(model).is_some_and(|m| m.supports_vision)
}

pub fn context_window(model: &str) -> usize {
    lookup(model)
        .map(|m| m.context_window)
        .unwrap_or(FALLBACK_CONTEXT_WINDOW)
}

/// Token budget for the input messages of a request: three quarters of the
/// context window, leaving the rest for the completion.
pub fn input_token_budget(model: &str) -> usize {
    context_window(model) * 3 / 4
}

pub fn vision_models() -> impl Iterator<Item = &'static str> {
    MODELS.iter().filter(|m| m.supports_vision).map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_catalog() {
        assert!(is_known(DEFAULT_CHAT_MODEL));
        assert!(supports_vision(DEFAULT_VISION_MODEL));
    }

    #[test]
    fn test_unknown_model_fallbacks() {
        assert!(!supports_vision("my-local-llm"));
        assert_eq!(context_window("my-local-llm"), FALLBACK_CONTEXT_WINDOW);
        assert_eq!(input_token_budget("my-local-llm"), 3_072);
    }

    #[test]
    fn test_vision_models_excludes_text_only() {
        assert!(!vision_models().any(|m| m == "gpt-3.5-turbo"));
    }
}
