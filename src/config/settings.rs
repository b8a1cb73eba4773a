use crate::config::models::{
    self, DEFAULT_CHAT_MODEL, DEFAULT_TTS_MODEL, DEFAULT_VISION_MODEL, TTS_MODELS,
};
use crate::core::error::VtaiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl FromStr for Voice {
    type Err = VtaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VtaiError::Settings(format!("unknown voice preset '{}'", s.trim())))
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of user-adjustable options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ChatModel,
    VisionModel,
    TtsModel,
    TtsVoice,
    EnableTtsResponse,
    UseDynamicRouting,
    TrimMessages,
}

impl SettingKey {
    pub const ALL: [SettingKey; 7] = [
        SettingKey::ChatModel,
        SettingKey::VisionModel,
        SettingKey::TtsModel,
        SettingKey::TtsVoice,
        SettingKey::EnableTtsResponse,
        SettingKey::UseDynamicRouting,
        SettingKey::TrimMessages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ChatModel => "chat_model",
            SettingKey::VisionModel => "vision_model",
            SettingKey::TtsModel => "tts_model",
            SettingKey::TtsVoice => "tts_voice",
            SettingKey::EnableTtsResponse => "enable_tts_response",
            SettingKey::UseDynamicRouting => "use_dynamic_routing",
            SettingKey::TrimMessages => "trim_messages",
        }
    }
}

impl FromStr for SettingKey {
    type Err = VtaiError;

    /// Accepts `snake_case` or `kebab-case` names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| VtaiError::Settings(format!("unknown setting '{}'", s)))
    }
}

/// A batch of raw setting changes as received from the user, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    changes: Vec<(SettingKey, String)>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: SettingKey, value: impl Into<String>) -> Self {
        self.changes.push((key, value.into()));
        self
    }

    /// Parses `key value` pairs from user input.
    pub fn parse(key: &str, value: &str) -> Result<Self, VtaiError> {
        Ok(Self::new().set(key.parse()?, value))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = SettingKey> + '_ {
        self.changes.iter().map(|(key, _)| *key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub chat_model: String,
    pub vision_model: String,
    pub tts_model: String,
    pub tts_voice: Voice,
    pub enable_tts_response: bool,
    pub use_dynamic_routing: bool,
    pub trim_messages: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: Voice::default(),
            enable_tts_response: true,
            use_dynamic_routing: true,
            trim_messages: true,
        }
    }
}

impl SessionSettings {
    /// Checks model choices against the catalog.
    ///
    /// The vision model only has to be a known model; whether it accepts
    /// images is checked when an image is actually processed.
    pub fn validate(&self) -> Result<(), VtaiError> {
        if !models::is_known(&self.chat_model) {
            return Err(VtaiError::Settings(format!(
                "unknown chat model '{}'",
                self.chat_model
            )));
        }
        if !models::is_known(&self.vision_model) {
            return Err(VtaiError::Settings(format!(
                "unknown vision model '{}'",
                self.vision_model
            )));
        }
        if !TTS_MODELS.contains(&self.tts_model.as_str()) {
            return Err(VtaiError::Settings(format!(
                "unknown TTS model '{}'",
                self.tts_model
            )));
        }
        Ok(())
    }

    /// Builds the settings that result from applying `update`. Any invalid
    /// value rejects the whole update.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<SessionSettings, VtaiError> {
        let mut next = self.clone();

        for (key, value) in &update.changes {
            let value = value.trim();
            match key {
                SettingKey::ChatModel => next.chat_model = value.to_string(),
                SettingKey::VisionModel => next.vision_model = value.to_string(),
                SettingKey::TtsModel => next.tts_model = value.to_string(),
                SettingKey::TtsVoice => next.tts_voice = value.parse()?,
                SettingKey::EnableTtsResponse => {
                    next.enable_tts_response = parse_bool(*key, value)?
                }
                SettingKey::UseDynamicRouting => {
                    next.use_dynamic_routing = parse_bool(*key, value)?
                }
                SettingKey::TrimMessages => next.trim_messages = parse_bool(*key, value)?,
            }
        }

        next.validate()?;
        Ok(next)
    }

    pub fn get(&self, key: SettingKey) -> String {
        match key {
            SettingKey::ChatModel => self.chat_model.clone(),
            SettingKey::VisionModel => self.vision_model.clone(),
            SettingKey::TtsModel => self.tts_model.clone(),
            SettingKey::TtsVoice => self.tts_voice.to_string(),
            SettingKey::EnableTtsResponse => self.enable_tts_response.to_string(),
            SettingKey::UseDynamicRouting => self.use_dynamic_routing.to_string(),
            SettingKey::TrimMessages => self.trim_messages.to_string(),
        }
    }
}

fn parse_bool(key: SettingKey, value: &str) -> Result<bool, VtaiError> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(VtaiError::Settings(format!(
            "{} expects on/off, got '{}'",
            key.as_str(),
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(SessionSettings::default().validate().is_ok());
    }

    #[test]
    fn test_setting_key_accepts_dashes() {
        assert_eq!(
            "use-dynamic-routing".parse::<SettingKey>().unwrap(),
            SettingKey::UseDynamicRouting
        );
        assert!(matches!(
            "temperature".parse::<SettingKey>(),
            Err(VtaiError::Settings(_))
        ));
    }

    #[test]
    fn test_voice_parse_ignores_case() {
        assert_eq!(" Shimmer ".parse::<Voice>().unwrap(), Voice::Shimmer);
        assert!("robot".parse::<Voice>().is_err());
        assert_eq!(Voice::default(), Voice::Nova);
    }

    #[test]
    fn test_apply_replaces_fields() {
        let update = SettingsUpdate::new()
            .set(SettingKey::ChatModel, "gpt-4o")
            .set(SettingKey::TtsVoice, "Onyx")
            .set(SettingKey::EnableTtsResponse, "off");
        let next = SessionSettings::default().apply(&update).unwrap();
        assert_eq!(next.chat_model, "gpt-4o");
        assert_eq!(next.tts_voice, Voice::Onyx);
        assert!(!next.enable_tts_response);
    }

    #[test]
    fn test_invalid_value_rejects_whole_update() {
        let current = SessionSettings::default();
        let update = SettingsUpdate::new()
            .set(SettingKey::TrimMessages, "off")
            .set(SettingKey::ChatModel, "not-a-model");
        let err = current.apply(&update).unwrap_err();
        assert!(matches!(err, VtaiError::Settings(_)));
    }

    #[test]
    fn test_bool_parse_error() {
        let update = SettingsUpdate::parse("trim_messages", "maybe").unwrap();
        assert!(SessionSettings::default().apply(&update).is_err());
    }

    #[test]
    fn test_vision_model_may_lack_image_support() {
        let update = SettingsUpdate::parse("vision_model", "gpt-3.5-turbo").unwrap();
        let next = SessionSettings::default().apply(&update).unwrap();
        assert_eq!(next.vision_model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_settings_deserialize_partial_yaml() {
        let settings: SessionSettings =
            serde_yml::from_str("chat_model: gpt-4o\ntts_voice: echo\n").unwrap();
        assert_eq!(settings.chat_model, "gpt-4o");
        assert_eq!(settings.tts_voice, Voice::Echo);
        assert!(settings.use_dynamic_routing);
    }
}
