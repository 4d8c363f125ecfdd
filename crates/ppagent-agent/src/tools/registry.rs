//! Tool Registry: tools keyed by name, plus call dispatch.
//!
//! The agent loop hands every model tool call to [`ToolRegistry::dispatch`],
//! which always produces a result string for the model, even on failure.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, warn};

use ppagent_core::types::ToolDefinition;

use super::base::Tool;
use crate::skills::LoadedSkill;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
///
/// Owns `Arc<dyn Tool>` so handlers can move onto their own task.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.tools.contains_key(tool.name()) {
            debug!(tool = tool.name(), "overriding tool");
        } else {
            debug!(tool = tool.name(), "registered tool");
        }
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Model-facing definitions for all registered tools, sorted by name.
    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Dispatch one tool call and return the text the model will see.
    ///
    /// - unknown name: `Unknown tool: <name>`
    /// - arguments that aren't a JSON object: `Error: ...`
    /// - handler `Err` or panic: `Error: ...`
    ///
    /// The handler runs on its own task so a panic can't take down the
    /// loop; the call still completes before this returns.
    pub async fn dispatch(&self, name: &str, raw_arguments: &str) -> String {
        let tool = match self.tools.get(name) {
            Some(t) => Arc::clone(t),
            None => {
                warn!(tool = name, "tool not found");
                return format!("Unknown tool: {name}");
            }
        };

        let params = match parse_arguments(raw_arguments) {
            Ok(p) => p,
            Err(e) => {
                warn!(tool = name, error = %e, "invalid tool arguments");
                return format!("Error: {e:#}");
            }
        };

        let handle = tokio::spawn(async move { tool.execute(params).await });
        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "tool execution failed");
                format!("Error: {e:#}")
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    join_err.to_string()
                };
                warn!(tool = name, reason = %reason, "tool handler panicked");
                format!("Error: tool '{name}' panicked: {reason}")
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a raw argument payload into a flat parameter map.
///
/// The payload must be a JSON object. A missing payload already arrives as
/// `{}`, so an empty string is a malformed call.
pub fn parse_arguments(raw: &str) -> anyhow::Result<HashMap<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("invalid tool arguments")?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => anyhow::bail!(
            "invalid tool arguments: expected a JSON object, got {}",
            json_kind(&other)
        ),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Build the registry for one run: built-ins first, then each skill's tools
/// in skill order, later names overwriting earlier ones.
pub fn collect_tools(skills: &[LoadedSkill], builtins: Vec<Arc<dyn Tool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in builtins {
        registry.register(tool);
    }
    for skill in skills {
        for tool in &skill.tools {
            registry.register(Arc::clone(tool));
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillMeta;
    use async_trait::async_trait;
    use ppagent_core::types::ParameterSchema;
    use std::path::PathBuf;

    /// Minimal test tool.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::object().required_property("text", "string", "Text to echo")
        }
        async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
            let text = params
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("(empty)");
            Ok(format!("Echo: {text}"))
        }
    }

    /// Tool that always fails.
    struct FailTool;

    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::object()
        }
        async fn execute(&self, _params: HashMap<String, Value>) -> anyhow::Result<String> {
            anyhow::bail!("intentional failure")
        }
    }

    /// Tool that panics.
    struct PanicTool;

    #[async_trait]
    impl Tool for PanicTool {
        fn name(&self) -> &str {
            "boom"
        }
        fn description(&self) -> &str {
            "Panics"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::object()
        }
        async fn execute(&self, _params: HashMap<String, Value>) -> anyhow::Result<String> {
            panic!("handler exploded")
        }
    }

    /// Tool with a configurable name and fixed output.
    struct NamedTool(&'static str, &'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "named"
        }
        fn parameters(&self) -> ParameterSchema {
            ParameterSchema::object()
        }
        async fn execute(&self, _params: HashMap<String, Value>) -> anyhow::Result<String> {
            Ok(self.1.to_string())
        }
    }

    fn skill(name: &str, tools: Vec<Arc<dyn Tool>>) -> LoadedSkill {
        LoadedSkill {
            meta: SkillMeta {
                name: name.into(),
                description: String::new(),
            },
            system_prompt: None,
            tools,
            dir: PathBuf::from(name),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert!(reg.has("echo"));
        assert!(!reg.has("nope"));
        assert!(reg.get("echo").is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_tool_names_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.tool_names(), vec!["echo", "fail"]);
    }

    #[test]
    fn test_get_definitions_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        reg.register(Arc::new(EchoTool));
        let defs = reg.get_definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].function.name, "echo");
        assert_eq!(defs[1].function.name, "fail");
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let result = reg.dispatch("echo", r#"{"text": "hello"}"#).await;
        assert_eq!(result, "Echo: hello");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let reg = ToolRegistry::new();
        assert_eq!(reg.dispatch("missing", "{}").await, "Unknown tool: missing");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_before_argument_parsing() {
        let reg = ToolRegistry::new();
        assert_eq!(reg.dispatch("missing", "{not json").await, "Unknown tool: missing");
    }

    #[tokio::test]
    async fn test_dispatch_malformed_arguments() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let result = reg.dispatch("echo", "{not json").await;
        assert!(result.starts_with("Error: invalid tool arguments"));
    }

    #[tokio::test]
    async fn test_dispatch_non_object_arguments() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let result = reg.dispatch("echo", "[1, 2]").await;
        assert!(result.starts_with("Error: "));
        assert!(result.contains("an array"));
    }

    #[tokio::test]
    async fn test_dispatch_empty_arguments_rejected() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert!(reg.dispatch("echo", "").await.starts_with("Error: invalid tool arguments"));
        assert!(reg.dispatch("echo", "  ").await.starts_with("Error: invalid tool arguments"));
        assert_eq!(reg.dispatch("echo", "{}").await, "Echo: (empty)");
    }

    #[tokio::test]
    async fn test_dispatch_error_caught() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        assert_eq!(reg.dispatch("fail", "{}").await, "Error: intentional failure");
    }

    #[tokio::test]
    async fn test_dispatch_panic_caught() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(PanicTool));
        let result = reg.dispatch("boom", "{}").await;
        assert!(result.starts_with("Error: "));
        assert!(result.contains("handler exploded"));
    }

    #[test]
    fn test_collect_tools_skills_override_builtins() {
        let builtins: Vec<Arc<dyn Tool>> = vec![
            Arc::new(NamedTool("read_file", "builtin")),
            Arc::new(NamedTool("list_dir", "builtin")),
        ];
        let skills = vec![
            skill("a", vec![Arc::new(NamedTool("read_file", "skill a"))]),
            skill("b", vec![Arc::new(NamedTool("read_file", "skill b"))]),
        ];
        let reg = collect_tools(&skills, builtins);
        assert_eq!(reg.tool_names(), vec!["list_dir", "read_file"]);
    }

    #[tokio::test]
    async fn test_collect_tools_later_skill_wins() {
        let builtins: Vec<Arc<dyn Tool>> = vec![Arc::new(NamedTool("read_file", "builtin"))];
        let skills = vec![
            skill("a", vec![Arc::new(NamedTool("read_file", "skill a"))]),
            skill("b", vec![Arc::new(NamedTool("read_file", "skill b"))]),
        ];
        let reg = collect_tools(&skills, builtins);
        assert_eq!(reg.dispatch("read_file", "{}").await, "skill b");
    }

    #[test]
    fn test_default() {
        let reg = ToolRegistry::default();
        assert!(reg.is_empty());
    }
}
