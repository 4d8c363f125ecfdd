//! Config loader: reads `.env` and the process environment.
//!
//! # Loading precedence
//! 1. Defaults (from [`Config::new`])
//! 2. `.env` in the working directory (never overrides variables already set)
//! 3. Environment variables
//!
//! Supported variables:
//! - `OPENAI_API_KEY` (fallback `ANTHROPIC_API_KEY`) → `api_key` (required)
//! - `OPENAI_BASE_URL` → `base_url`
//! - `OPENAI_MODEL` → `model`
//! - `PPAGENT_MAX_TURNS` → `max_turns`
//! - `PPAGENT_HISTORY_LIMIT` → `history_limit`
//! - `PPAGENT_COMMAND_TIMEOUT` → `command_timeout_secs`
//! - `PPAGENT_ROOT` → `root` (relative values resolve against the working directory)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use super::schema::Config;

/// Errors that prevent a usable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing OPENAI_API_KEY (or ANTHROPIC_API_KEY). Set it in .env or the environment.")]
    MissingApiKey,

    #[error("Failed to determine working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

/// Load configuration from `.env` + the process environment.
///
/// Fails when no API key is set.
pub fn load_config() -> Result<Config, ConfigError> {
    require_api_key(load_settings()?)
}

/// Like [`load_config`], but a missing API key leaves `api_key` empty.
///
/// For commands that only inspect the project (`status`, `skills`, ...).
pub fn load_settings() -> Result<Config, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env loaded: {}", e),
    }
    let cwd = std::env::current_dir()?;
    Ok(load_settings_from(|key| std::env::var(key).ok(), &cwd))
}

/// Build a config from an injected variable lookup.
///
/// Empty values are treated as unset.
pub fn load_config_from<F>(lookup: F, cwd: &Path) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    require_api_key(load_settings_from(lookup, cwd))
}

/// Build a config from an injected variable lookup without requiring a key.
pub fn load_settings_from<F>(lookup: F, cwd: &Path) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let api_key = get("OPENAI_API_KEY")
        .or_else(|| get("ANTHROPIC_API_KEY"))
        .unwrap_or_default();
    let root = resolve_root(cwd, get("PPAGENT_ROOT").as_deref());

    let mut config = Config::new(api_key, root);

    if let Some(val) = get("OPENAI_BASE_URL") {
        config.base_url = val;
    }
    if let Some(val) = get("OPENAI_MODEL") {
        config.model = val;
    }
    if let Some(n) = parse_var(&get, "PPAGENT_MAX_TURNS") {
        config.max_turns = n;
    }
    if let Some(n) = parse_var(&get, "PPAGENT_HISTORY_LIMIT") {
        config.history_limit = n;
    }
    match parse_var::<u64, _>(&get, "PPAGENT_COMMAND_TIMEOUT") {
        Some(0) => warn!("PPAGENT_COMMAND_TIMEOUT=0 would time out every command; keeping the default"),
        Some(n) => config.command_timeout_secs = n,
        None => {}
    }

    debug!(
        model = %config.model,
        base_url = %config.base_url,
        root = %config.root.display(),
        "configuration loaded"
    );
    config
}

fn require_api_key(config: Config) -> Result<Config, ConfigError> {
    if config.has_api_key() {
        Ok(config)
    } else {
        Err(ConfigError::MissingApiKey)
    }
}

/// Parse a numeric variable, ignoring (with a warning) values that don't parse.
fn parse_var<T, G>(get: &G, key: &str) -> Option<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

/// Resolve a user-supplied root the same way the loader does.
pub fn resolve_root(cwd: &Path, root: Option<&str>) -> PathBuf {
    root.map(|r| cwd.join(r)).unwrap_or_else(|| cwd.to_path_buf())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
