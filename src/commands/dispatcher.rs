use super::{
    ChatState,
    handler::{
        AttachCommand, ClearCommand, DeleteHistoryCommand, HelpCommand, HistoryCommand,
        ListHistoryCommand, LoadHistoryCommand, QuitCommand, SaveHistoryCommand, SetCommand,
        SettingsCommand, SpeakCommand,
    },
    registry::CommandRegistry,
};
use crate::core::error::VtaiError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Runs a `/command arg...` line. Returns text to show the user, if any.
    pub fn execute_line(
        &self,
        line: &str,
        state: &mut ChatState,
    ) -> Result<Option<String>, VtaiError> {
        let line = line.trim().trim_start_matches('/');
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.split_first() {
            Some((command, args)) => self.registry.execute(command, args, state),
            None => Ok(None),
        }
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("quit", QuitCommand);
    registry.register("clear", ClearCommand);
    registry.register("settings", SettingsCommand);
    registry.register("set", SetCommand);
    registry.register("attach", AttachCommand);
    registry.register("speak", SpeakCommand);
    registry.register("history", HistoryCommand);
    registry.register("save", SaveHistoryCommand);
    registry.register("load", LoadHistoryCommand);
    registry.register("list", ListHistoryCommand);
    registry.register("delete", DeleteHistoryCommand);
    registry.register("help", HelpCommand::placeholder());

    let lines = registry.help_lines();
    registry.register("help", HelpCommand::new(lines));

    CommandDispatcher::new(Arc::new(registry))
}
