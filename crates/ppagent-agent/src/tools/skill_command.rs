//! Command-backed tools contributed by skills.
//!
//! A skill may ship a `tools.json` next to its manifest:
//!
//! ```json
//! {
//!   "systemPrompt": "Use word_count for statistics.",
//!   "tools": [{
//!     "name": "word_count",
//!     "description": "Count words in a file",
//!     "parameters": {"type": "object", "properties": {"path": {"type": "string"}}},
//!     "command": "wc -w \"$(jq -r .path)\""
//!   }]
//! }
//! ```
//!
//! Each entry runs through the shell in the project root. The JSON arguments
//! arrive on stdin and in `PPAGENT_TOOL_ARGS`; `PPAGENT_SKILL_DIR` points at
//! the skill's directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use ppagent_core::log::EventSink;
use ppagent_core::types::ParameterSchema;

use super::base::Tool;
use super::filesystem::log_tool;
use super::shell::{run_shell, ShellInvocation};

/// Contents of a skill's `tools.json`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsManifest {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub tools: Vec<CommandToolSpec>,
}

/// One tool entry of `tools.json`.
#[derive(Clone, Debug, Deserialize)]
pub struct CommandToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
    pub command: String,
}

/// Where and how a skill's commands run.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// Project root, used as the working directory.
    pub root: PathBuf,
    /// Directory of the skill that declared the tool.
    pub skill_dir: PathBuf,
    pub timeout: Duration,
}

/// A tool whose handler is a shell command.
pub struct CommandTool {
    spec: CommandToolSpec,
    ctx: CommandContext,
    sink: Arc<dyn EventSink>,
}

impl CommandTool {
    pub fn new(spec: CommandToolSpec, ctx: CommandContext, sink: Arc<dyn EventSink>) -> Self {
        Self { spec, ctx, sink }
    }
}

#[async_trait]
impl Tool for CommandTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn parameters(&self) -> ParameterSchema {
        self.spec.parameters.clone()
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let args = serde_json::to_string(&params)?;
        log_tool(&*self.sink, self.name(), "invoked", json!({ "args": args }));

        let result = run_shell(ShellInvocation {
            command: &self.spec.command,
            cwd: &self.ctx.root,
            envs: vec![
                ("PPAGENT_TOOL_ARGS", args.clone()),
                (
                    "PPAGENT_SKILL_DIR",
                    self.ctx.skill_dir.to_string_lossy().to_string(),
                ),
            ],
            stdin: Some(args),
            timeout: self.ctx.timeout,
        })
        .await;

        match &result {
            Ok(out) => log_tool(
                &*self.sink,
                self.name(),
                "ok",
                json!({ "outputLength": out.len() }),
            ),
            Err(e) => log_tool(
                &*self.sink,
                self.name(),
                "error",
                json!({ "error": format!("{e:#}") }),
            ),
        }
        result
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
