//! Filesystem tools: read, write, list directory.
//!
//! Every path is resolved against the project root and must stay inside it.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use ppagent_core::log::{EventSink, LogCategory};
use ppagent_core::types::ParameterSchema;

use super::base::{optional_string, require_string, require_string_allow_empty, Tool};

// ─────────────────────────────────────────────
// Shared path helper
// ─────────────────────────────────────────────

/// Resolve a user-supplied path against `root`.
///
/// Resolution is lexical (`.` and `..` are folded without touching the
/// filesystem), so targets that don't exist yet can be checked too.
/// Returns `Err` if the result is outside `root`.
pub fn resolve_path(root: &Path, path: &str) -> anyhow::Result<PathBuf> {
    let root = normalize(root);
    let resolved = normalize(&root.join(path));
    if !resolved.starts_with(&root) {
        anyhow::bail!("Path outside project: {path}");
    }
    Ok(resolved)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, like the OS does.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Log a tool event with the tool name folded into the data.
pub(crate) fn log_tool(sink: &dyn EventSink, tool: &str, message: &str, mut data: Value) {
    if let Value::Object(map) = &mut data {
        map.insert("tool".into(), Value::String(tool.to_string()));
    }
    sink.record(LogCategory::Tool, message, Some(data));
}

// ─────────────────────────────────────────────
// ReadFileTool
// ─────────────────────────────────────────────

/// Reads and returns the entire content of a file.
pub struct ReadFileTool {
    root: PathBuf,
    sink: Arc<dyn EventSink>,
}

impl ReadFileTool {
    pub fn new(root: PathBuf, sink: Arc<dyn EventSink>) -> Self {
        Self { root, sink }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full text content of a file. Path is relative to project root."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object().required_property("path", "string", "Relative file path")
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "path")?;
        log_tool(&*self.sink, self.name(), "invoked", json!({ "path": path_str }));

        let result: anyhow::Result<String> = async {
            let path = resolve_path(&self.root, &path_str)?;
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {path_str}"))
        }
        .await;

        match &result {
            Ok(content) => log_tool(
                &*self.sink,
                self.name(),
                "ok",
                json!({ "path": path_str, "bytes": content.len() }),
            ),
            Err(e) => log_tool(
                &*self.sink,
                self.name(),
                "error",
                json!({ "path": path_str, "error": format!("{e:#}") }),
            ),
        }
        result
    }
}

// ─────────────────────────────────────────────
// WriteFileTool
// ─────────────────────────────────────────────

/// Creates or overwrites a file with the given content.
pub struct WriteFileTool {
    root: PathBuf,
    sink: Arc<dyn EventSink>,
}

impl WriteFileTool {
    pub fn new(root: PathBuf, sink: Arc<dyn EventSink>) -> Self {
        Self { root, sink }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file. Creates parent directories if needed."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object()
            .required_property("path", "string", "Relative file path")
            .required_property("content", "string", "Content to write")
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "path")?;
        let content = require_string_allow_empty(&params, "content")?;
        log_tool(
            &*self.sink,
            self.name(),
            "invoked",
            json!({ "path": path_str, "contentLength": content.len() }),
        );

        let result: anyhow::Result<String> = async {
            let path = resolve_path(&self.root, &path_str)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory for {path_str}"))?;
            }
            tokio::fs::write(&path, &content)
                .await
                .with_context(|| format!("Failed to write {path_str}"))?;
            Ok(format!("Wrote {path_str}"))
        }
        .await;

        match &result {
            Ok(_) => log_tool(&*self.sink, self.name(), "ok", json!({ "path": path_str })),
            Err(e) => log_tool(
                &*self.sink,
                self.name(),
                "error",
                json!({ "path": path_str, "error": format!("{e:#}") }),
            ),
        }
        result
    }
}

// ─────────────────────────────────────────────
// ListDirTool
// ─────────────────────────────────────────────

/// Lists the contents of a directory, one entry per line.
pub struct ListDirTool {
    root: PathBuf,
    sink: Arc<dyn EventSink>,
}

impl ListDirTool {
    pub fn new(root: PathBuf, sink: Arc<dyn EventSink>) -> Self {
        Self { root, sink }
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List files and directories in a path. Path is relative to project root."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::object().property("path", "string", "Directory path (default: .)")
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = optional_string(&params, "path")
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".to_string());
        log_tool(&*self.sink, self.name(), "invoked", json!({ "path": path_str }));

        let result: anyhow::Result<Vec<String>> = async {
            let path = resolve_path(&self.root, &path_str)?;
            let mut reader = tokio::fs::read_dir(&path)
                .await
                .with_context(|| format!("Failed to list {path_str}"))?;

            let mut entries: Vec<String> = Vec::new();
            while let Some(entry) = reader.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                entries.push(if is_dir { format!("{name}/") } else { name });
            }
            entries.sort();
            Ok(entries)
        }
        .await;

        match result {
            Ok(entries) => {
                log_tool(
                    &*self.sink,
                    self.name(),
                    "ok",
                    json!({ "path": path_str, "entryCount": entries.len() }),
                );
                if entries.is_empty() {
                    Ok("(empty directory)".to_string())
                } else {
                    Ok(entries.join("\n"))
                }
            }
            Err(e) => {
                log_tool(
                    &*self.sink,
                    self.name(),
                    "error",
                    json!({ "path": path_str, "error": format!("{e:#}") }),
                );
                Err(e)
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
