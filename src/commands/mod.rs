pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::core::attachment::Attachment;
use crate::core::session::SessionContext;
use std::path::PathBuf;

pub use dispatcher::{CommandDispatcher, create_command_registry};

/// Work a command hands back to the chat loop because it needs the async services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    /// Fire the most recently offered speak action.
    Speak,
    /// Reset the conversation and greet again.
    Restart,
}

pub struct ChatState {
    pub session: SessionContext,
    /// Files queued with `/attach`, sent with the next message.
    pub attachments: Vec<Attachment>,
    pub pending: Option<PendingOp>,
    pub history_dir: PathBuf,
    pub should_continue: bool,
}

impl ChatState {
    pub fn new(session: SessionContext, history_dir: PathBuf) -> Self {
        Self {
            session,
            attachments: Vec::new(),
            pending: None,
            history_dir,
            should_continue: true,
        }
    }
}
