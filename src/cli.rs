use crate::config::{SettingKey, SettingsUpdate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Message to send once, then exit. Piped stdin is appended to it
    pub query: Option<String>,

    /// Chat model for this session
    #[arg(long)]
    pub chat_model: Option<String>,

    /// Vision model for images referenced by URL
    #[arg(long)]
    pub vision_model: Option<String>,

    /// Route messages by semantic classification [on/off]
    #[arg(long, value_name = "ON|OFF")]
    pub route: Option<String>,

    /// Offer spoken responses [on/off]
    #[arg(long, value_name = "ON|OFF")]
    pub tts: Option<String>,

    /// Text-to-speech model
    #[arg(long)]
    pub tts_model: Option<String>,

    /// Text-to-speech voice [alloy, echo, fable, onyx, nova, shimmer]
    #[arg(long)]
    pub voice: Option<String>,

    /// Trim history to the chat model's context window [on/off]
    #[arg(long, value_name = "ON|OFF")]
    pub trim: Option<String>,

    /// Files to send with the first message
    #[arg(short, long, num_args = 1..)]
    pub attach: Vec<PathBuf>,

    /// Semantic route definitions (JSON)
    #[arg(long)]
    pub routes: Option<PathBuf>,

    /// Minimum similarity for a message to match a route
    #[arg(long)]
    pub route_threshold: Option<f32>,
}

impl Args {
    /// Settings given on the command line, applied over the configured defaults.
    pub fn settings_overrides(&self) -> SettingsUpdate {
        let flags = [
            (SettingKey::ChatModel, &self.chat_model),
            (SettingKey::VisionModel, &self.vision_model),
            (SettingKey::UseDynamicRouting, &self.route),
            (SettingKey::EnableTtsResponse, &self.tts),
            (SettingKey::TtsModel, &self.tts_model),
            (SettingKey::TtsVoice, &self.voice),
            (SettingKey::TrimMessages, &self.trim),
        ];

        flags
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
            .fold(SettingsUpdate::new(), |update, (key, value)| {
                update.set(key, value.as_str())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionSettings;

    #[test]
    fn test_overrides_only_given_flags() {
        let args = Args::parse_from(["vtai", "--chat-model", "gpt-4o", "--tts", "off"]);
        let settings = SessionSettings::default()
            .apply(&args.settings_overrides())
            .unwrap();

        assert_eq!(settings.chat_model, "gpt-4o");
        assert!(!settings.enable_tts_response);
        assert_eq!(settings.vision_model, SessionSettings::default().vision_model);
    }

    #[test]
    fn test_no_flags_no_overrides() {
        let args = Args::parse_from(["vtai", "hello there"]);
        assert!(args.settings_overrides().is_empty());
        assert_eq!(args.query.as_deref(), Some("hello there"));
    }

    #[test]
    fn test_attach_takes_several_files() {
        let args = Args::parse_from(["vtai", "--attach", "a.png", "b.txt", "--", "describe"]);
        assert_eq!(args.attach, vec![PathBuf::from("a.png"), PathBuf::from("b.txt")]);
        assert_eq!(args.query.as_deref(), Some("describe"));
    }
}
