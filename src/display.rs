use crate::core::error::VtaiError;
use crate::output::{Action, Element, MediaSource, MessageId, OutboundMessage, OutputSink};
use async_trait::async_trait;
use console::{Term, style};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Renders assistant output on stdout.
///
/// Streamed tokens are written as they arrive. The most recent `Speak`
/// action is held until the user fires it with `/speak`.
pub struct TerminalSink {
    term: Term,
    next_id: AtomicU64,
    pending_action: Mutex<Option<Action>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            next_id: AtomicU64::new(1),
            pending_action: Mutex::new(None),
        }
    }

    /// Removes and returns the last offered action.
    pub fn take_pending_action(&self) -> Option<Action> {
        self.pending_action
            .lock()
            .ok()
            .and_then(|mut pending| pending.take())
    }

    fn offer(&self, actions: Vec<Action>) -> Result<(), VtaiError> {
        let Some(action) = actions.into_iter().last() else {
            return Ok(());
        };
        self.term.write_line(&format!(
            "{}",
            style(format!("[{}: /speak]", action.label())).dim()
        ))?;
        if let Ok(mut pending) = self.pending_action.lock() {
            *pending = Some(action);
        }
        Ok(())
    }

    fn write_header(&self, author: &str) -> Result<(), VtaiError> {
        self.term
            .write_line(&format!("\n{}", style(format!("🤖 {}", author)).bold().blue()))?;
        Ok(())
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputSink for TerminalSink {
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, VtaiError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        if let Some(author) = &message.author {
            self.write_header(author)?;
        }
        if !message.content.is_empty() {
            self.term.write_line(&message.content)?;
        }

        for element in &message.elements {
            match element {
                Element::Text { name, content } => {
                    if !name.is_empty() {
                        self.term
                            .write_line(&format!("{}", style(format!("{}:", name)).bold().cyan()))?;
                    }
                    termimad::print_text(content);
                }
                other => self.term.write_line(&describe_media(other))?,
            }
        }

        self.offer(message.actions)?;
        Ok(id)
    }

    async fn stream_token(&self, _id: MessageId, token: &str) -> Result<(), VtaiError> {
        self.term.write_str(token)?;
        self.term.flush()?;
        Ok(())
    }

    async fn update(
        &self,
        _id: MessageId,
        content: &str,
        actions: Vec<Action>,
    ) -> Result<(), VtaiError> {
        if !content.ends_with('\n') {
            self.term.write_line("")?;
        }
        self.offer(actions)
    }
}

fn describe_media(element: &Element) -> String {
    match element {
        Element::Image { name, source } => {
            let location = match source {
                MediaSource::Url(url) => url.clone(),
                MediaSource::Path(path) => path.display().to_string(),
            };
            let label = if name.is_empty() { "Image" } else { name.as_str() };
            format!("{} {}: {}", style("🖼").bold(), label, style(location).underlined())
        }
        Element::Audio { name, path } => {
            let label = if name.is_empty() { "Audio" } else { name.as_str() };
            format!(
                "{} {}: {}",
                style("🔊").bold(),
                label,
                style(path.display()).underlined()
            )
        }
        Element::Text { name, content } => format!("{}: {}", name, content),
    }
}
