use crate::commands::handler::CommandHandler;
use crate::core::error::VtaiError;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct CommandRegistry {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register<C: CommandHandler + 'static>(&mut self, name: &str, command: C) {
        self.handlers.insert(name.to_string(), Arc::new(command));
    }

    pub fn execute(
        &self,
        name: &str,
        args: &[&str],
        state: &mut super::ChatState,
    ) -> Result<Option<String>, VtaiError> {
        self.handlers
            .get(name)
            .ok_or_else(|| VtaiError::Input(format!("Unknown command: /{}", name)))
            .and_then(|handler| handler.execute(state, args))
    }

    /// Command names in alphabetical order.
    pub fn get_command_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn help_lines(&self) -> Vec<&'static str> {
        self.handlers.values().map(|h| h.help()).collect()
    }
}
