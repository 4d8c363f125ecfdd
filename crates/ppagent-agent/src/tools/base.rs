//! Tool trait: the interface every callable tool implements.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use ppagent_core::types::{ParameterSchema, ToolDefinition};

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The agent loop sends their schemas to the model via `to_definition()`
/// and the registry dispatches calls to `execute()` by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used by the model to call this tool (e.g. `"read_file"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Parameter schema (`{"type": "object", "properties": {...}, "required": [...]}`).
    fn parameters(&self) -> ParameterSchema;

    /// Execute the tool with already-parsed arguments.
    ///
    /// Returns the output the model reads. An `Err` is turned into an
    /// `Error: ...` result string by the registry.
    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String>;

    /// Build the `ToolDefinition` sent to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required non-empty `String` param.
pub fn require_string(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("'{key}' (string) is required."))
}

/// Extract a required `String` param that may be empty (e.g. file content).
pub fn require_string_allow_empty(
    params: &HashMap<String, Value>,
    key: &str,
) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("'{key}' (string) is required."))
}

/// Extract an optional `String` param.
pub fn optional_string(params: &HashMap<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_string_present() {
        let mut params = HashMap::new();
        params.insert("path".into(), json!("src/main.rs"));
        assert_eq!(require_string(&params, "path").unwrap(), "src/main.rs");
    }

    #[test]
    fn test_require_string_missing() {
        let params = HashMap::new();
        let err = require_string(&params, "path").unwrap_err();
        assert_eq!(err.to_string(), "'path' (string) is required.");
    }

    #[test]
    fn test_require_string_wrong_type_or_empty() {
        let mut params = HashMap::new();
        params.insert("path".into(), json!(42));
        assert!(require_string(&params, "path").is_err());
        params.insert("path".into(), json!(""));
        assert!(require_string(&params, "path").is_err());
    }

    #[test]
    fn test_require_string_allow_empty() {
        let mut params = HashMap::new();
        params.insert("content".into(), json!(""));
        assert_eq!(require_string_allow_empty(&params, "content").unwrap(), "");
        assert!(require_string_allow_empty(&HashMap::new(), "content").is_err());
    }

    #[test]
    fn test_optional_string() {
        let mut params = HashMap::new();
        params.insert("path".into(), json!("docs"));
        assert_eq!(optional_string(&params, "path"), Some("docs".into()));
        assert_eq!(optional_string(&params, "other"), None);
    }

    #[tokio::test]
    async fn test_to_definition_default() {
        struct DummyTool;

        #[async_trait]
        impl Tool for DummyTool {
            fn name(&self) -> &str { "dummy" }
            fn description(&self) -> &str { "A test tool" }
            fn parameters(&self) -> ParameterSchema {
                ParameterSchema::object().required_property("msg", "string", "Message")
            }
            async fn execute(&self, _params: HashMap<String, Value>) -> anyhow::Result<String> {
                Ok("ok".into())
            }
        }

        let def = DummyTool.to_definition();
        assert_eq!(def.function.name, "dummy");
        assert_eq!(def.function.description, "A test tool");
        assert_eq!(def.tool_type, "function");
        assert_eq!(def.function.parameters.required, vec!["msg"]);
    }
}
