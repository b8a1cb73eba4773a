use crate::config::{SessionSettings, SettingsUpdate};
use crate::core::error::VtaiError;
use crate::core::history::ConversationHistory;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// All mutable state of one chat session. Handlers receive it by `&mut`;
/// nothing about a session lives in global storage.
#[derive(Debug)]
pub struct SessionContext {
    pub id: Uuid,
    pub history: ConversationHistory,
    settings: SessionSettings,
    system_prompt: String,
    tts_artifact: PathBuf,
}

impl SessionContext {
    /// Creates a session whose TTS output is written inside `artifact_dir`.
    pub fn new(settings: SessionSettings, system_prompt: &str, artifact_dir: &Path) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            history: ConversationHistory::new(system_prompt),
            settings,
            system_prompt: system_prompt.to_string(),
            tts_artifact: artifact_dir.join(format!("tts-output-{}.mp3", id.simple())),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The single audio file this session's speech output is written to.
    pub fn tts_artifact_path(&self) -> &Path {
        &self.tts_artifact
    }

    /// Validates `update` and swaps in the resulting settings. On error the
    /// current settings are kept.
    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<(), VtaiError> {
        let next = self.settings.apply(update)?;
        tracing::info!(session = %self.id, ?next, "settings updated");
        self.settings = next;
        Ok(())
    }

    pub fn reset_history(&mut self) {
        self.history.reset(&self.system_prompt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingKey;
    use crate::providers::Role;

    #[test]
    fn test_artifact_path_is_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let a = SessionContext::new(SessionSettings::default(), "sys", dir.path());
        let b = SessionContext::new(SessionSettings::default(), "sys", dir.path());
        assert_ne!(a.tts_artifact_path(), b.tts_artifact_path());
        assert!(a.tts_artifact_path().starts_with(dir.path()));
    }

    #[test]
    fn test_rejected_update_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionContext::new(SessionSettings::default(), "sys", dir.path());
        let update = SettingsUpdate::new().set(SettingKey::TtsModel, "tts-9000");
        assert!(session.update_settings(&update).is_err());
        assert_eq!(session.settings(), &SessionSettings::default());
    }

    #[test]
    fn test_reset_history_uses_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionContext::new(SessionSettings::default(), "sys", dir.path());
        session.history.append(Role::User, "hello");
        session.reset_history();
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history.get_all()[0].content, "sys");
    }
}
