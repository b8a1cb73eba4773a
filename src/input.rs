use crate::commands::CommandDispatcher;
use crate::config::Config;
use crate::core::error::VtaiError;

use console::style;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Context, EditMode, Editor, Helper};
use std::borrow::Cow;

/// Commands whose argument is a file path.
const FILE_COMMANDS: [&str; 3] = ["/attach ", "/load ", "/delete "];

pub type ChatEditor = Editor<PromptHelper, FileHistory>;

/// Completes slash commands and file arguments, hints from input history.
pub struct PromptHelper {
    filenames: FilenameCompleter,
    history_hinter: HistoryHinter,
    commands: Vec<String>,
}

impl PromptHelper {
    pub fn new(commands: &CommandDispatcher) -> Self {
        Self {
            filenames: FilenameCompleter::new(),
            history_hinter: HistoryHinter {},
            commands: commands.get_command_names(),
        }
    }
}

/// Candidates for a partially typed `/command`, replacing from after the slash.
fn command_candidates(line: &str, pos: usize, commands: &[String]) -> Option<(usize, Vec<Pair>)> {
    let typed = line.get(..pos)?.strip_prefix('/')?;
    if typed.contains(char::is_whitespace) {
        return None;
    }

    let matches: Vec<Pair> = commands
        .iter()
        .filter(|cmd| cmd.starts_with(typed))
        .map(|cmd| Pair {
            display: format!("/{}", cmd),
            replacement: cmd.clone(),
        })
        .collect();
    (!matches.is_empty()).then_some((1, matches))
}

impl Helper for PromptHelper {}

impl Completer for PromptHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if let Some(candidates) = command_candidates(line, pos, &self.commands) {
            return Ok(candidates);
        }
        if FILE_COMMANDS.iter().any(|cmd| line.starts_with(cmd)) {
            return self.filenames.complete(line, pos, ctx);
        }
        Ok((pos, Vec::new()))
    }
}

impl Hinter for PromptHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.history_hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for PromptHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }
}

impl Validator for PromptHelper {}

pub fn create_editor(commands: &CommandDispatcher) -> Result<ChatEditor, VtaiError> {
    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| VtaiError::Input(format!("Failed to create line editor: {}", e)))?;
    editor.set_helper(Some(PromptHelper::new(commands)));

    let history_path = Config::input_history_path();
    if let Err(e) = editor.load_history(&history_path) {
        tracing::debug!(path = %history_path.display(), error = %e, "no input history loaded");
    }

    Ok(editor)
}

/// Reads one line. `None` means the user asked to leave (Ctrl-C or Ctrl-D).
pub fn read_input(editor: &mut ChatEditor) -> Result<Option<String>, VtaiError> {
    let prompt = style("you › ").bold().green().to_string();
    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor
                    .add_history_entry(line.as_str())
                    .map_err(|e| VtaiError::Input(format!("Failed to add history entry: {}", e)))?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(VtaiError::Input(format!("Input error: {}", err))),
    }
}

pub fn save_history(editor: &mut ChatEditor) -> Result<(), VtaiError> {
    let history_path = Config::input_history_path();
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    editor
        .save_history(&history_path)
        .map_err(|e| VtaiError::Input(format!("Failed to save history: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["save", "set", "settings", "speak"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_command_prefix_completion() {
        let (start, pairs) = command_candidates("/se", 3, &names()).unwrap();
        assert_eq!(start, 1);
        let replacements: Vec<_> = pairs.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(replacements, vec!["set", "settings"]);
    }

    #[test]
    fn test_no_command_completion_for_text_or_arguments() {
        assert!(command_candidates("hello", 5, &names()).is_none());
        assert!(command_candidates("/set chat", 9, &names()).is_none());
        assert!(command_candidates("/zz", 3, &names()).is_none());
    }
}
