//! Shell tool: run commands in a subprocess rooted at the project.
//!
//! [`run_shell`] is also what command-backed skill tools use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use ppagent_core::config::schema::DEFAULT_COMMAND_TIMEOUT_SECS;
use ppagent_core::log::EventSink;
use ppagent_core::types::ParameterSchema;

use super::base::{require_string, Tool};
use super::filesystem::log_tool;

/// Maximum output length before truncation (characters).
const MAX_OUTPUT_LEN: usize = 50_000;

/// Separator placed between stdout and stderr in the combined output.
const STDERR_SEPARATOR: &str = "\n--- stderr ---\n";

// ─────────────────────────────────────────────
// Shared runner
// ─────────────────────────────────────────────

/// One shell invocation.
pub struct ShellInvocation<'a> {
    pub command: &'a str,
    pub cwd: &'a Path,
    pub envs: Vec<(&'static str, String)>,
    pub stdin: Option<String>,
    pub timeout: Duration,
}

/// Run a command through the platform shell and return its combined output.
///
/// Output is `stdout` and `stderr` (each trimmed, empty ones dropped) joined
/// by a separator, or `(no output)`. A non-zero exit or a timeout is an `Err`
/// carrying that output. A zero timeout means the default timeout.
pub async fn run_shell(inv: ShellInvocation<'_>) -> anyhow::Result<String> {
    let timeout = if inv.timeout.is_zero() {
        Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)
    } else {
        inv.timeout
    };

    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.arg("/C");
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c");
        c
    };
    cmd.arg(inv.command)
        .current_dir(inv.cwd)
        .stdin(if inv.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &inv.envs {
        cmd.env(key, value);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn command: {}", inv.command))?;

    if let (Some(input), Some(mut pipe)) = (inv.stdin, child.stdin.take()) {
        // Fed from a task so a child that ignores stdin can't stall us.
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                debug!("stdin not consumed by command: {e}");
            }
        });
    }

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.context("Failed to wait for command")?,
        Err(_) => anyhow::bail!("Command timed out after {} seconds", timeout.as_secs()),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = combine_output(stdout.trim(), stderr.trim());

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        anyhow::bail!("Command exited with code {code}\n{combined}");
    }
    Ok(combined)
}

fn combine_output(stdout: &str, stderr: &str) -> String {
    let parts: Vec<&str> = [stdout, stderr].into_iter().filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return "(no output)".to_string();
    }
    let mut combined = parts.join(STDERR_SEPARATOR);

    let len = combined.chars().count();
    if len > MAX_OUTPUT_LEN {
        let remaining = len - MAX_OUTPUT_LEN;
        combined = combined.chars().take(MAX_OUTPUT_LEN).collect();
        combined.push_str(&format!("\n... (truncated, {remaining} more chars)"));
    }
    combined
}

// ─────────────────────────────────────────────
// RunCommandTool
// ─────────────────────────────────────────────

/// Execute shell commands in the project directory.
pub struct RunCommandTool {
    /// Working directory for commands.
    root: PathBuf,
    /// Command timeout.
    timeout: Duration,
    sink: Arc<dyn EventSink>,
}

impl RunCommandTool {
    pub fn new(root: PathBuf, timeout_secs: u64, sink: Arc<dyn EventSink>) -> Self {
        Self {
            root,
            timeout: Duration::from_secs(timeout_secs),
            sink,
        }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the project directory. \
         Use for running scripts, tests, or shell tools."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object().required_property("command", "string", "Shell command to run")
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let command = require_string(&params, "command")?;
        info!(command = %command, cwd = %self.root.display(), "executing shell command");
        log_tool(&*self.sink, self.name(), "invoked", json!({ "command": command }));

        let result = run_shell(ShellInvocation {
            command: &command,
            cwd: &self.root,
            envs: Vec::new(),
            stdin: None,
            timeout: self.timeout,
        })
        .await;

        match &result {
            Ok(out) => log_tool(
                &*self.sink,
                self.name(),
                "ok",
                json!({ "command": command, "outputLength": out.len() }),
            ),
            Err(e) => log_tool(
                &*self.sink,
                self.name(),
                "error",
                json!({ "command": command, "error": format!("{e:#}") }),
            ),
        }
        result
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
