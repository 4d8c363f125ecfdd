//! PPAgent CLI: entry point.
//!
//! # Commands
//!
//! - `ppagent QUESTION...`: answer one question and exit
//! - `ppagent`: interactive chat (REPL)
//! - `ppagent skills`: list discovered skills
//! - `ppagent install-skill DIR`: copy a skill into `<root>/skills`
//! - `ppagent sessions`: list stored sessions
//! - `ppagent status`: show configuration and project status
//!
//! A question that starts with a command name (`status of the build?`) is
//! still a question; only the bare command words select a command.

mod helpers;
mod repl;
mod sessions_cmd;
mod skills_cmd;
mod status;

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use tracing::{error, info};

use ppagent_agent::{builtin_tools, run_agent, AgentOptions, ContextBuilder};
use ppagent_core::config::{load_config, Config};
use ppagent_core::log::{EventSink, FanoutEventSink, FileEventSink, LogCategory, TracingEventSink};
use ppagent_core::session::{to_history, SessionKind, SessionMessage, SessionStore};
use ppagent_providers::{ChatTransport, HttpTransport};

/// Shown after a configuration error.
const CONFIG_HINT: &str =
    "Create a .env with OPENAI_API_KEY=... (or set OPENAI_BASE_URL for a compatible API).";

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// PPAgent: a small tool-using AI agent for your project directory
#[derive(Parser)]
#[command(
    name = "ppagent",
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Question to answer once. Omit for interactive chat.
    #[arg(trailing_var_arg = true, num_args = 1..)]
    question: Vec<String>,

    /// Enable debug logging on stderr
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered skills
    Skills,

    /// Copy a skill directory into <root>/skills
    InstallSkill {
        /// Directory containing skill.json or SKILL.md
        source: PathBuf,
    },

    /// List stored conversation sessions
    Sessions,

    /// Show configuration and project status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli(std::env::args_os()).unwrap_or_else(|e| e.exit());
    init_logging(cli.logs);

    match cli.command {
        Some(Commands::Skills) => skills_cmd::list().await,
        Some(Commands::InstallSkill { source }) => skills_cmd::install(&source).await,
        Some(Commands::Sessions) => sessions_cmd::run(),
        Some(Commands::Status) => status::run(),
        None => chat(cli.question.join(" ").trim()).await,
    }
}

/// Parse the command line, reading a command word followed by extra words
/// as the start of a question.
fn parse_cli<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    match Cli::try_parse_from(&args) {
        Ok(cli) => Ok(cli),
        Err(e) if matches!(e.kind(), ErrorKind::UnknownArgument | ErrorKind::TooManyValues) => {
            match as_question(&args) {
                Some(escaped) => Cli::try_parse_from(escaped).map_err(|_| e),
                None => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Insert `--` before the first word when that word names a command, so
/// clap reads the rest of the line as question text.
fn as_question(args: &[OsString]) -> Option<Vec<OsString>> {
    let first = args
        .iter()
        .skip(1)
        .position(|a| !a.to_string_lossy().starts_with('-'))?
        + 1;
    let word = args[first].to_string_lossy();
    let is_command = Cli::command()
        .get_subcommands()
        .any(|c| c.get_name() == word);
    if !is_command {
        return None;
    }

    let mut escaped = args[..first].to_vec();
    escaped.push(OsString::from("--"));
    escaped.extend_from_slice(&args[first..]);
    Some(escaped)
}

// ─────────────────────────────────────────────
// Chat (one-shot or REPL)
// ─────────────────────────────────────────────

async fn chat(question: &str) -> Result<()> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration failed");
            eprintln!("{}", e.to_string().red());
            eprintln!("{CONFIG_HINT}");
            std::process::exit(1);
        }
    };

    let file_sink = Arc::new(FileEventSink::spawn(config.log_file()));
    let sink: Arc<dyn EventSink> = Arc::new(FanoutEventSink::new(vec![
        file_sink.clone() as Arc<dyn EventSink>,
        Arc::new(TracingEventSink),
    ]));
    sink.record(
        LogCategory::Cli,
        "CLI started",
        Some(json!({ "singleQuestion": !question.is_empty() })),
    );

    let result = match ChatSession::start(&config, Arc::clone(&sink)) {
        Ok(mut session) => {
            if question.is_empty() {
                repl::run(&mut session, &config).await
            } else {
                session.ask_once(question).await
            }
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        sink.record(LogCategory::Error, "cli main", Some(json!({ "error": format!("{e:#}") })));
    }
    file_sink.flush().await;
    result
}

/// Everything a chat needs across turns.
pub struct ChatSession {
    pub options: AgentOptions,
    pub store: SessionStore,
    pub id: String,
    /// Transcript carried into the next turn.
    pub history: Vec<ppagent_core::types::Message>,
    pub skill_names: Vec<String>,
    pub sink: Arc<dyn EventSink>,
}

impl ChatSession {
    /// Load rules, skills and the terminal session for `config`.
    fn start(config: &Config, sink: Arc<dyn EventSink>) -> Result<Self> {
        let context = ContextBuilder::load(&config.root, config.command_timeout_secs, Arc::clone(&sink));
        let tools = context.build_tools(builtin_tools(
            &config.root,
            config.command_timeout_secs,
            Arc::clone(&sink),
        ));
        let transport = HttpTransport::new(config.api_key.clone(), config.base_url.clone())?;
        info!(
            transport = transport.display_name(),
            model = %config.model,
            tools = tools.len(),
            "transport ready"
        );

        let options = AgentOptions {
            transport: Arc::new(transport),
            model: config.model.clone(),
            system_prompt: context.build_system_prompt(),
            tools: Arc::new(tools),
            max_turns: config.max_turns,
            sink: Arc::clone(&sink),
        };

        let store = SessionStore::new(&config.root);
        let session = store.get_or_create_session(SessionKind::Terminal, None)?;
        let stored = store.get_session_messages(&session.id, Some(config.history_limit));
        info!(session = %session.id, history = stored.len(), "session ready");

        Ok(Self {
            options,
            store,
            id: session.id,
            history: to_history(&stored),
            skill_names: context.skill_names(),
            sink,
        })
    }

    /// Run one exchange and persist the user/assistant pair.
    ///
    /// The in-memory history becomes the full transcript of the run.
    pub async fn exchange(&mut self, input: &str) -> Result<String> {
        let outcome = run_agent(&self.options, input, &self.history).await;
        self.history = outcome.transcript;
        self.store.append_to_session(
            &self.id,
            &[
                SessionMessage::user(input),
                SessionMessage::assistant(outcome.content.clone()),
            ],
        )?;
        Ok(outcome.content)
    }

    async fn ask_once(&mut self, question: &str) -> Result<()> {
        self.sink.record(
            LogCategory::Cli,
            "User message (single)",
            Some(json!({ "message": question })),
        );
        let content = self.exchange(question).await?;
        self.sink.record(
            LogCategory::Cli,
            "Agent response (single)",
            Some(json!({ "length": content.chars().count(), "sessionId": self.id })),
        );
        println!("{content}");
        Ok(())
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins over `--logs`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "ppagent=debug,ppagent_agent=debug,ppagent_core=debug,ppagent_providers=debug,info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_question_words() {
        let cli = Cli::parse_from(["ppagent", "what", "is", "this?"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.question.join(" "), "what is this?");
    }

    #[test]
    fn parses_no_args_as_repl() {
        let cli = Cli::parse_from(["ppagent"]);
        assert!(cli.command.is_none());
        assert!(cli.question.is_empty());
        assert!(!cli.logs);
    }

    #[test]
    fn parses_logs_flag() {
        let cli = Cli::parse_from(["ppagent", "--logs", "hello"]);
        assert!(cli.logs);
        assert_eq!(cli.question, vec!["hello"]);
    }

    #[test]
    fn parses_subcommands() {
        assert!(matches!(
            Cli::parse_from(["ppagent", "skills"]).command,
            Some(Commands::Skills)
        ));
        assert!(matches!(
            Cli::parse_from(["ppagent", "status"]).command,
            Some(Commands::Status)
        ));
        match Cli::parse_from(["ppagent", "install-skill", "./my-skill"]).command {
            Some(Commands::InstallSkill { source }) => assert_eq!(source, PathBuf::from("./my-skill")),
            _ => panic!("expected install-skill"),
        }
    }

    #[test]
    fn command_word_starting_a_question() {
        let cli = parse_cli(["ppagent", "status", "of", "the", "build?"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.question.join(" "), "status of the build?");

        let cli = parse_cli(["ppagent", "install-skill", "a", "b"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.question, vec!["install-skill", "a", "b"]);

        let cli = parse_cli(["ppagent", "--logs", "skills", "you", "have?"]).unwrap();
        assert!(cli.logs);
        assert!(cli.command.is_none());
        assert_eq!(cli.question.join(" "), "skills you have?");
    }

    #[test]
    fn help_word_is_a_question() {
        let cli = parse_cli(["ppagent", "help", "me", "refactor"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.question.join(" "), "help me refactor");
    }

    #[test]
    fn bare_command_word_still_selects_command() {
        assert!(matches!(
            parse_cli(["ppagent", "sessions"]).unwrap().command,
            Some(Commands::Sessions)
        ));
        assert!(parse_cli(["ppagent", "--bogus"]).is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
