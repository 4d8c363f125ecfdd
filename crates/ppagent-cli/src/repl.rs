//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history under
//! `<root>/.agents/repl_history`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use serde_json::json;
use tracing::debug;

use ppagent_core::config::Config;
use ppagent_core::log::LogCategory;

use crate::helpers;
use crate::ChatSession;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

/// Run the interactive REPL loop until `exit`, `quit`, Ctrl-C or Ctrl-D.
pub async fn run(session: &mut ChatSession, config: &Config) -> Result<()> {
    session.sink.record(
        LogCategory::Cli,
        "Interactive session started",
        Some(json!({ "sessionId": session.id, "historyMessages": session.history.len() })),
    );
    helpers::print_banner(&session.id, session.history.len(), &session.skill_names);

    let history_file = history_path(config);
    let mut editor = create_editor(&history_file)?;

    loop {
        let input = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            session.sink.record(LogCategory::Cli, "User exited", None);
            break;
        }

        let _ = editor.add_history_entry(trimmed);

        session.sink.record(
            LogCategory::Cli,
            "User message",
            Some(json!({ "message": trimmed })),
        );
        helpers::print_thinking();

        match session.exchange(trimmed).await {
            Ok(content) => {
                helpers::clear_thinking();
                session.sink.record(
                    LogCategory::Cli,
                    "Agent response",
                    Some(json!({ "length": content.chars().count() })),
                );
                helpers::print_response(&content);
            }
            Err(e) => {
                helpers::clear_thinking();
                session.sink.record(
                    LogCategory::Error,
                    "repl exchange",
                    Some(json!({ "error": format!("{e:#}") })),
                );
                helpers::print_error(&format!("{e:#}"));
            }
        }
    }

    save_history(&mut editor, &history_file);
    session.sink.record(LogCategory::Cli, "CLI finished", None);
    Ok(())
}

/// Create a rustyline editor, loading previous history if present.
fn create_editor(path: &Path) -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    if path.exists() {
        let _ = editor.load_history(path);
        debug!("loaded REPL history from {}", path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(path) {
        debug!("failed to save history: {e}");
    }
}

fn history_path(config: &Config) -> PathBuf {
    config.agents_dir().join("repl_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("Quit"));
        assert!(!is_exit_command("/quit"));
        assert!(!is_exit_command("hello"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn history_path_under_agents_dir() {
        let config = Config::new("k", "/project");
        assert_eq!(
            history_path(&config),
            PathBuf::from("/project/.agents/repl_history")
        );
    }
}
