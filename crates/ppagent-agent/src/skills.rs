//! Skills loader: discovers skill directories and turns them into prompt
//! text plus extra tools.
//!
//! # Discovery order
//!
//! 1. `<root>/skills/<dir>` (project skills)
//! 2. `<root>/.agents/skills/<dir>` (installed agent skills)
//!
//! The first skill seen with a given name wins; later duplicates are ignored.
//! Hidden directories are skipped.
//!
//! # Skill layout
//!
//! - `skill.json`: `{"name": "...", "description": "...", "systemPrompt": "..."}`
//! - or `SKILL.md` with front matter; the markdown body is the prompt text:
//!
//! ```text
//! ---
//! name: github
//! description: Interact with GitHub using the gh CLI,
//!   including issues and pull requests
//! ---
//!
//! # GitHub Skill
//! ...
//! ```
//!
//! - optional `tools.json`, see [`crate::tools::skill_command`].
//!
//! A directory with none of these files is not a skill.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use ppagent_core::log::{EventSink, LogCategory};

use crate::tools::skill_command::{CommandContext, CommandTool, ToolsManifest};
use crate::tools::Tool;

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// Name and one-line description of a skill.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkillMeta {
    pub name: String,
    pub description: String,
}

/// A loaded skill: metadata, optional prompt text, and its tools.
pub struct LoadedSkill {
    pub meta: SkillMeta,
    pub system_prompt: Option<String>,
    pub tools: Vec<Arc<dyn Tool>>,
    /// Directory the skill was loaded from.
    pub dir: PathBuf,
}

impl LoadedSkill {
    /// Names of the tools this skill contributes.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl std::fmt::Debug for LoadedSkill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSkill")
            .field("meta", &self.meta)
            .field("system_prompt", &self.system_prompt)
            .field("tools", &self.tool_names())
            .field("dir", &self.dir)
            .finish()
    }
}

/// `skill.json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkillManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
}

// ─────────────────────────────────────────────
// SkillsLoader
// ─────────────────────────────────────────────

/// Discovers and loads skills from the project's skill directories.
pub struct SkillsLoader {
    /// Skill roots in priority order.
    roots: Vec<PathBuf>,
    /// Project root (working directory for skill commands).
    project_root: PathBuf,
    command_timeout: Duration,
    sink: Arc<dyn EventSink>,
}

impl SkillsLoader {
    /// Loader for the project at `root`.
    pub fn new(root: &Path, command_timeout_secs: u64, sink: Arc<dyn EventSink>) -> Self {
        Self {
            roots: vec![root.join("skills"), root.join(".agents").join("skills")],
            project_root: root.to_path_buf(),
            command_timeout: Duration::from_secs(command_timeout_secs),
            sink,
        }
    }

    /// Skill roots in search order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Load every skill, first name wins. Missing roots are fine.
    pub fn load_all(&self) -> Vec<LoadedSkill> {
        let roots: Vec<String> = self.roots.iter().map(|r| r.display().to_string()).collect();
        self.sink
            .record(LogCategory::Skills, "load started", Some(json!({ "roots": roots })));

        let mut loaded: Vec<LoadedSkill> = Vec::new();
        for root in &self.roots {
            for dir in skill_dirs(root) {
                let Some(skill) = self.load_skill_dir(&dir) else {
                    continue;
                };
                if loaded.iter().any(|s| s.meta.name == skill.meta.name) {
                    debug!(name = %skill.meta.name, dir = %dir.display(), "skill shadowed");
                    continue;
                }
                self.sink.record(
                    LogCategory::Skills,
                    "skill loaded",
                    Some(json!({
                        "name": skill.meta.name,
                        "from": root.display().to_string(),
                        "tools": skill.tool_names(),
                    })),
                );
                loaded.push(skill);
            }
        }

        let names: Vec<&str> = loaded.iter().map(|s| s.meta.name.as_str()).collect();
        self.sink.record(
            LogCategory::Skills,
            "load finished",
            Some(json!({ "count": loaded.len(), "names": names })),
        );
        loaded
    }

    /// Load one skill directory, or `None` if it isn't a skill.
    pub fn load_skill_dir(&self, dir: &Path) -> Option<LoadedSkill> {
        let dir_name = dir.file_name()?.to_string_lossy().to_string();

        let manifest_path = dir.join("skill.json");
        let markdown_path = dir.join("SKILL.md");
        let tools_path = dir.join("tools.json");

        let from_manifest = if manifest_path.is_file() {
            match read_manifest(&manifest_path) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("Ignoring invalid {}: {:#}", manifest_path.display(), e);
                    self.record_error(&manifest_path, &e);
                    None
                }
            }
        } else {
            None
        };

        let (meta, mut system_prompt) = match from_manifest {
            Some(m) => (
                SkillMeta {
                    name: m.name.unwrap_or_else(|| dir_name.clone()),
                    description: m.description.unwrap_or_default(),
                },
                m.system_prompt,
            ),
            None => match std::fs::read_to_string(&markdown_path) {
                Ok(content) => parse_skill_markdown(&content, &dir_name),
                Err(_) if tools_path.is_file() => (
                    SkillMeta {
                        name: dir_name.clone(),
                        description: String::new(),
                    },
                    None,
                ),
                Err(_) => return None,
            },
        };

        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        if tools_path.is_file() {
            match read_tools_manifest(&tools_path) {
                Ok(manifest) => {
                    if let Some(extra) = manifest.system_prompt.filter(|p| !p.is_empty()) {
                        system_prompt = Some(match system_prompt {
                            Some(base) if !base.is_empty() => format!("{base}\n\n{extra}"),
                            _ => extra,
                        });
                    }
                    let ctx = CommandContext {
                        root: self.project_root.clone(),
                        skill_dir: dir.to_path_buf(),
                        timeout: self.command_timeout,
                    };
                    for spec in manifest.tools {
                        tools.push(Arc::new(CommandTool::new(
                            spec,
                            ctx.clone(),
                            Arc::clone(&self.sink),
                        )));
                    }
                }
                Err(e) => {
                    warn!("Ignoring invalid {}: {:#}", tools_path.display(), e);
                    self.record_error(&tools_path, &e);
                }
            }
        }

        Some(LoadedSkill {
            meta,
            system_prompt: system_prompt.filter(|p| !p.is_empty()),
            tools,
            dir: dir.to_path_buf(),
        })
    }

    fn record_error(&self, path: &Path, e: &anyhow::Error) {
        self.sink.record(
            LogCategory::Error,
            &format!("{e:#}"),
            Some(json!({ "context": "skills", "path": path.display().to_string() })),
        );
    }
}

/// Combine the base prompt with each skill's prompt text.
///
/// Skills without prompt text contribute nothing.
pub fn build_system_prompt(skills: &[LoadedSkill], base: &str) -> String {
    let mut parts = vec![base.to_string()];
    for skill in skills {
        if let Some(prompt) = skill.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            parts.push(format!("\n## Skill: {}\n{}", skill.meta.name, prompt));
        }
    }
    parts.join("\n")
}

// ─────────────────────────────────────────────
// Helper functions
// ─────────────────────────────────────────────

/// Non-hidden subdirectories of `root`, sorted by name.
fn skill_dirs(root: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(root) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn read_manifest(path: &Path) -> anyhow::Result<SkillManifest> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn read_tools_manifest(path: &Path) -> anyhow::Result<ToolsManifest> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Metadata and prompt text from a `SKILL.md`.
///
/// Without front matter the whole file is the prompt and the directory
/// name is the skill name.
fn parse_skill_markdown(content: &str, dir_name: &str) -> (SkillMeta, Option<String>) {
    let (front, body) = match split_frontmatter(content) {
        Some((front, body)) => (parse_frontmatter(front), body),
        None => (Vec::new(), content),
    };
    let field = |key: &str| {
        front
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| unquote(v).to_string())
            .filter(|v| !v.is_empty())
    };
    let meta = SkillMeta {
        name: field("name").unwrap_or_else(|| dir_name.to_string()),
        description: field("description").unwrap_or_default(),
    };
    let body = body.trim();
    (meta, (!body.is_empty()).then(|| body.to_string()))
}

/// Split `---\n<front>\n---\n<body>` into its two halves.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.trim_start_matches([' ', '\t', '\r']);
    let rest = rest.strip_prefix('\n')?;
    let end = rest.find("\n---")?;
    let front = &rest[..end];
    let after = &rest[end + 4..];
    // Drop the remainder of the closing delimiter line.
    let body = match after.find('\n') {
        Some(i) => &after[i + 1..],
        None => "",
    };
    Some((front, body))
}

/// Parse `key: value` lines. Indented lines continue the previous value.
fn parse_frontmatter(block: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for line in block.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = pairs.last_mut() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some(idx) = line.find(':') {
            let key = line[..idx].trim().to_string();
            let value = line[idx + 1..].trim().to_string();
            if !key.is_empty() {
                pairs.push((key, value));
            }
        }
    }
    pairs
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'')
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
