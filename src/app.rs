use crate::cli::Args;
use crate::commands::{ChatState, CommandDispatcher, PendingOp, create_command_registry};
use crate::config::Config;
use crate::core::attachment::Attachment;
use crate::core::error::VtaiError;
use crate::core::session::SessionContext;
use crate::dispatcher::{Dispatcher, InboundMessage};
use crate::display::TerminalSink;
use crate::input;
use crate::providers::EmbeddingService;
use crate::providers::factory::ProviderRouter;
use crate::router::IntentRouter;
use crate::router::layer::RouteLayer;
use console::style;
use is_terminal::IsTerminal;
use std::io::{self, Read};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Application {
    args: Args,
    config: Config,
    dispatcher: Dispatcher,
    sink: Arc<TerminalSink>,
    commands: CommandDispatcher,
    /// Holds generated speech files; removed when the application exits.
    artifacts: TempDir,
}

impl Application {
    pub fn new(args: Args, config: Config) -> Result<Self, VtaiError> {
        let providers = ProviderRouter::from_config(&config);

        let encoder: Arc<dyn EmbeddingService> = Arc::new(providers.clone());
        let threshold = args.route_threshold.or(config.route_score_threshold);
        let layer = match args.routes.as_ref().or(config.routes_path.as_ref()) {
            Some(path) => RouteLayer::from_file(path, encoder, threshold)?,
            None => RouteLayer::bundled(encoder, threshold)?,
        };
        tracing::info!(
            routes = ?layer.route_names().collect::<Vec<_>>(),
            threshold = layer.score_threshold(),
            "route layer loaded"
        );

        let sink = Arc::new(TerminalSink::new());
        let dispatcher = Dispatcher::new(
            providers.services(),
            IntentRouter::new(Arc::new(layer)),
            sink.clone(),
        );
        let artifacts = tempfile::Builder::new().prefix("vtai-").tempdir()?;

        Ok(Self {
            args,
            config,
            dispatcher,
            sink,
            commands: create_command_registry(),
            artifacts,
        })
    }

    /// A session with the configured defaults and any command-line overrides.
    fn new_session(&self) -> Result<SessionContext, VtaiError> {
        let overrides = self.args.settings_overrides();
        if !overrides.is_empty() {
            let keys: Vec<_> = overrides.keys().map(|k| k.as_str()).collect();
            tracing::debug!(?keys, "applying command-line settings");
        }
        let settings = self.config.defaults.apply(&overrides)?;
        let session = SessionContext::new(
            settings,
            &self.config.system_prompt,
            self.artifacts.path(),
        );
        tracing::info!(session = %session.id, settings = ?session.settings(), "session created");
        Ok(session)
    }

    fn cli_attachments(&self) -> Vec<Attachment> {
        self.args.attach.iter().map(Attachment::from_path).collect()
    }

    pub async fn run(&mut self) -> Result<(), VtaiError> {
        let piped = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| VtaiError::Input(format!("Failed to read from stdin: {}", e)))?;
            Some(buffer)
        } else {
            None
        };

        let content = single_message(
            self.args.query.as_deref(),
            piped,
            !self.args.attach.is_empty(),
        );
        match content {
            Some(content) => self.handle_single_message(content).await,
            None => self.handle_chat_mode().await,
        }
    }

    async fn handle_single_message(&self, content: String) -> Result<(), VtaiError> {
        let mut session = self.new_session()?;
        let message = InboundMessage::text(content).with_attachments(self.cli_attachments());
        self.dispatcher.on_message(&mut session, message).await;
        Ok(())
    }

    async fn handle_chat_mode(&mut self) -> Result<(), VtaiError> {
        let mut state = ChatState::new(self.new_session()?, Config::history_dir());

        println!(
            "{}",
            style("Type '/help' for available commands. Press Ctrl+D or type /quit to exit.").dim()
        );
        self.dispatcher.start_session(&mut state.session).await;

        let mut editor = input::create_editor(&self.commands)?;

        loop {
            let line = match input::read_input(&mut editor)? {
                Some(line) => line.trim().to_string(),
                None => break,
            };

            // an empty line still sends queued attachments
            if line.is_empty() && state.attachments.is_empty() {
                continue;
            }

            if line.starts_with('/') {
                self.run_command(&line, &mut state).await;
                if !state.should_continue {
                    break;
                }
                continue;
            }

            let attachments = std::mem::take(&mut state.attachments);
            let message = InboundMessage::text(line).with_attachments(attachments);
            self.dispatcher.on_message(&mut state.session, message).await;
        }

        input::save_history(&mut editor)?;

        Ok(())
    }

    async fn run_command(&self, line: &str, state: &mut ChatState) {
        match self.commands.execute_line(line, state) {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(e) => eprintln!("{} {}", style("Error executing command:").bold().red(), e),
        }

        match state.pending.take() {
            Some(PendingOp::Speak) => match self.sink.take_pending_action() {
                Some(action) => self.dispatcher.on_action(&mut state.session, action).await,
                None => println!("Nothing to speak yet."),
            },
            Some(PendingOp::Restart) => self.dispatcher.start_session(&mut state.session).await,
            None => {}
        }
    }
}

/// The message for one-shot mode, or `None` to start the interactive chat.
/// Attachments alone are enough to send a message.
fn single_message(
    query: Option<&str>,
    piped: Option<String>,
    has_attachments: bool,
) -> Option<String> {
    match (query, piped) {
        (Some(query), Some(stdin)) => Some(format!("{}\n\n{}", stdin.trim_end(), query)),
        (None, Some(stdin)) => Some(stdin),
        (Some(query), None) => Some(query.to_string()),
        (None, None) if has_attachments => Some(String::new()),
        (None, None) => None,
    }
}
