use super::{ChatState, PendingOp};
use crate::config::models::vision_models;
use crate::config::{SettingKey, SettingsUpdate};
use crate::core::attachment::Attachment;
use crate::core::error::VtaiError;
use crate::providers::{Message, Role};

use console::style;
use std::path::PathBuf;

pub trait CommandHandler: Send + Sync {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, VtaiError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct HelpCommand {
    lines: Vec<&'static str>,
}
pub struct ClearCommand;
pub struct SettingsCommand;
pub struct SetCommand;
pub struct AttachCommand;
pub struct SpeakCommand;
pub struct HistoryCommand;
pub struct SaveHistoryCommand;
pub struct LoadHistoryCommand;
pub struct ListHistoryCommand;
pub struct DeleteHistoryCommand;

impl CommandHandler for QuitCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, VtaiError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the chat session"
    }
}

impl HelpCommand {
    pub fn new(lines: Vec<&'static str>) -> Self {
        Self { lines }
    }

    pub fn placeholder() -> Self {
        Self::new(Vec::new())
    }
}

impl CommandHandler for HelpCommand {
    fn execute(
        &self,
        _state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, VtaiError> {
        let title = style("Available Commands").bold().underlined().to_string();
        let help_text = std::iter::once(title)
            .chain(self.lines.iter().map(|line| style(line).to_string()))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Some(help_text))
    }

    fn help(&self) -> &'static str {
        "/help - Show available commands"
    }
}

impl CommandHandler for ClearCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, VtaiError> {
        state.attachments.clear();
        state.pending = Some(PendingOp::Restart);
        Ok(Some("Chat history cleared.".to_string()))
    }

    fn help(&self) -> &'static str {
        "/clear - Start the conversation over"
    }
}

impl CommandHandler for SettingsCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, VtaiError> {
        let settings = state.session.settings();
        let mut lines = SettingKey::ALL
            .iter()
            .map(|key| format!("{}: {}", style(key.as_str()).bold().cyan(), settings.get(*key)))
            .collect::<Vec<_>>();
        lines.push(format!(
            "{} {}",
            style("Vision-capable models:").dim(),
            vision_models().collect::<Vec<_>>().join(", ")
        ));
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/settings - Show the current session settings"
    }
}

impl CommandHandler for SetCommand {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, VtaiError> {
        let Some((key, value)) = args.split_first().filter(|(_, value)| !value.is_empty()) else {
            return Ok(Some("Usage: /set <key> <value>".to_string()));
        };

        let value = value.join(" ");
        state
            .session
            .update_settings(&SettingsUpdate::parse(key, &value)?)?;
        Ok(Some(format!("Setting updated: {} = {}", key, value)))
    }

    fn help(&self) -> &'static str {
        "/set <key> <value> - Change a session setting (see /settings)"
    }
}

impl CommandHandler for AttachCommand {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, VtaiError> {
        if args.is_empty() {
            return Ok(Some("Please specify a file to attach".to_string()));
        }

        let path = PathBuf::from(args.join(" "));
        if !path.is_file() {
            return Err(VtaiError::Input(format!("File not found: {}", path.display())));
        }

        let attachment = Attachment::from_path(&path);
        let message = format!(
            "Attached {}. It will be sent with your next message.",
            attachment.display_name()
        );
        state.attachments.push(attachment);
        Ok(Some(message))
    }

    fn help(&self) -> &'static str {
        "/attach <file> - Send a file (image, text, audio) with the next message"
    }
}

impl CommandHandler for SpeakCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, VtaiError> {
        state.pending = Some(PendingOp::Speak);
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/speak - Read the last response aloud"
    }
}

impl CommandHandler for HistoryCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, VtaiError> {
        Ok(Some(render_messages(state.session.history.get_all())))
    }

    fn help(&self) -> &'static str {
        "/history - Show the conversation so far"
    }
}

impl CommandHandler for SaveHistoryCommand {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, VtaiError> {
        let filename = if args.is_empty() {
            chrono::Local::now()
                .format("%Y%m%d_%H%M%S.json")
                .to_string()
        } else {
            args[0].to_string()
        };

        std::fs::create_dir_all(&state.history_dir)?;
        let path = state.history_dir.join(filename);

        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, state.session.history.get_all())?;

        Ok(Some(format!("History saved to: {}", path.display())))
    }

    fn help(&self) -> &'static str {
        "/save [filename] - Save conversation history to file"
    }
}

impl CommandHandler for LoadHistoryCommand {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, VtaiError> {
        if args.is_empty() {
            return Ok(Some("Please specify a filename".to_string()));
        }

        let path = state.history_dir.join(args[0]);
        let file = std::fs::File::open(&path)?;
        let messages: Vec<Message> = serde_json::from_reader(file)?;
        state.session.history.restore(messages)?;

        Ok(Some(format!(
            "{}\n\nHistory loaded from: {}",
            render_messages(state.session.history.get_all()),
            path.display()
        )))
    }

    fn help(&self) -> &'static str {
        "/load <filename> - Load conversation history from file"
    }
}

impl CommandHandler for ListHistoryCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, VtaiError> {
        std::fs::create_dir_all(&state.history_dir)?;

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&state.history_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        if files.is_empty() {
            Ok(Some("No history files found.".to_string()))
        } else {
            Ok(Some(files.join("\n")))
        }
    }

    fn help(&self) -> &'static str {
        "/list - List available conversation history files"
    }
}

impl CommandHandler for DeleteHistoryCommand {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, VtaiError> {
        if args.is_empty() {
            return Ok(Some("Please specify a filename to delete".to_string()));
        }

        let path = state.history_dir.join(args[0]);

        if !path.exists() {
            return Ok(Some(format!("File not found: {}", path.display())));
        }

        std::fs::remove_file(&path)?;
        Ok(Some(format!("Deleted history file: {}", path.display())))
    }

    fn help(&self) -> &'static str {
        "/delete <filename> - Delete a conversation history file"
    }
}

fn render_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::System => "System",
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", style(role).bold().cyan(), msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
