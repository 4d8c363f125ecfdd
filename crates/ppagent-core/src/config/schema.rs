//! Configuration schema.
//!
//! Everything the runtime would otherwise read ambiently (API settings,
//! limits, the project root) lives in one value built at startup and threaded
//! into the agent, tools, skills, sessions and the activity log.

use std::path::{Path, PathBuf};

/// Default chat-completions endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default turn budget for one agent run.
pub const DEFAULT_MAX_TURNS: usize = 10;
/// Default number of stored messages replayed from a session.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
/// Default timeout for the `run_command` tool.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// Root configuration: built from environment variables (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    /// API key for bearer authentication.
    pub api_key: String,
    /// Chat-completions API base URL.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Turn budget for one agent run.
    pub max_turns: usize,
    /// How many stored session messages to replay as history.
    pub history_limit: usize,
    /// Timeout in seconds for the `run_command` tool.
    pub command_timeout_secs: u64,
    /// Project root: file tools, skills, rules, sessions and logs live under it.
    pub root: PathBuf,
}

impl Config {
    /// A config with defaults for everything but the key and root.
    pub fn new(api_key: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_turns: DEFAULT_MAX_TURNS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            root: root.into(),
        }
    }

    /// Whether an API key was configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// `<root>/skills`: project skills, searched first.
    pub fn project_skills_dir(&self) -> PathBuf {
        self.root.join("skills")
    }

    /// `<root>/.agents/skills`: installed agent skills, searched second.
    pub fn installed_skills_dir(&self) -> PathBuf {
        self.agents_dir().join("skills")
    }

    /// `<root>/.agents/sessions`.
    pub fn sessions_dir(&self) -> PathBuf {
        self.agents_dir().join("sessions")
    }

    /// `<root>/logs/ppagent.log`.
    pub fn log_file(&self) -> PathBuf {
        self.root.join("logs").join("ppagent.log")
    }

    /// `<root>/.agents`.
    pub fn agents_dir(&self) -> PathBuf {
        self.root.join(".agents")
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
