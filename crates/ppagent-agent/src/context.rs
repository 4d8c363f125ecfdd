//! Context builder: assembles the system prompt and the tool set for a run.
//!
//! The prompt is the base identity, then the project rules (if any), then
//! one section per skill that contributes prompt text.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use ppagent_core::log::{EventSink, LogCategory};

use crate::rules::{format_rules_for_prompt, load_rules, DEFAULT_RULES_FILE};
use crate::skills::{build_system_prompt, LoadedSkill, SkillsLoader};
use crate::tools::registry::{collect_tools, ToolRegistry};
use crate::tools::Tool;

/// Identity block every system prompt starts with.
pub const BASE_SYSTEM_PROMPT: &str = "You are PPAgent, an AI assistant.
You have access to tools: read_file, write_file, list_dir, run_command. Use them when you need to read/write files, list directories, or run shell commands.
Answer concisely. When suggesting code, use the project's existing style and dependencies.";

// ─────────────────────────────────────────────
// Context builder
// ─────────────────────────────────────────────

/// Rules and skills discovered for one project root.
#[derive(Debug)]
pub struct ContextBuilder {
    rules: String,
    skills: Vec<LoadedSkill>,
}

impl ContextBuilder {
    /// Discover rules and skills under `root`.
    pub fn load(root: &Path, command_timeout_secs: u64, sink: Arc<dyn EventSink>) -> Self {
        let rules = load_rules(root, DEFAULT_RULES_FILE);
        if !rules.is_empty() {
            sink.record(
                LogCategory::Cli,
                "Rules loaded",
                Some(json!({ "length": rules.chars().count() })),
            );
        }

        let skills = SkillsLoader::new(root, command_timeout_secs, Arc::clone(&sink)).load_all();
        let names: Vec<&str> = skills.iter().map(|s| s.meta.name.as_str()).collect();
        sink.record(
            LogCategory::Cli,
            "Skills loaded",
            Some(json!({ "count": skills.len(), "names": names })),
        );
        debug!(rules = rules.len(), skills = skills.len(), "context loaded");

        Self::from_parts(rules, skills)
    }

    /// Build from already-loaded pieces.
    pub fn from_parts(rules: String, skills: Vec<LoadedSkill>) -> Self {
        Self { rules, skills }
    }

    /// Raw rules text (`""` when the project has none).
    pub fn rules(&self) -> &str {
        &self.rules
    }

    pub fn skills(&self) -> &[LoadedSkill] {
        &self.skills
    }

    /// Names of the loaded skills, in load order.
    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.meta.name.clone()).collect()
    }

    /// Base prompt + rules block + skill sections.
    pub fn build_system_prompt(&self) -> String {
        let base = format!("{BASE_SYSTEM_PROMPT}{}", format_rules_for_prompt(&self.rules));
        build_system_prompt(&self.skills, &base)
    }

    /// Built-ins overlaid with every skill's tools.
    pub fn build_tools(&self, builtins: Vec<Arc<dyn Tool>>) -> ToolRegistry {
        collect_tools(&self.skills, builtins)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use ppagent_core::log::NullEventSink;

    use crate::skills::SkillMeta;
    use crate::tools::builtin_tools;

    fn skill(name: &str, prompt: Option<&str>) -> LoadedSkill {
        LoadedSkill {
            meta: SkillMeta {
                name: name.into(),
                description: String::new(),
            },
            system_prompt: prompt.map(str::to_string),
            tools: Vec::new(),
            dir: PathBuf::from("skills").join(name),
        }
    }

    #[test]
    fn test_prompt_without_rules_or_skills() {
        let ctx = ContextBuilder::from_parts(String::new(), Vec::new());
        assert_eq!(ctx.build_system_prompt(), BASE_SYSTEM_PROMPT);
    }

    #[test]
    fn test_prompt_order() {
        let ctx = ContextBuilder::from_parts(
            "Never push to main.".into(),
            vec![skill("git", Some("Use git carefully.")), skill("quiet", None)],
        );
        let prompt = ctx.build_system_prompt();

        let rules_at = prompt.find("## Rules you must follow").unwrap();
        let skill_at = prompt.find("## Skill: git\nUse git carefully.").unwrap();
        assert!(prompt.starts_with(BASE_SYSTEM_PROMPT));
        assert!(rules_at < skill_at);
        assert!(prompt.contains("Never push to main."));
        assert!(!prompt.contains("## Skill: quiet"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("rules")).unwrap();
        fs::write(dir.path().join("rules/rules.md"), "Answer in English.\n").unwrap();
        let skill_dir = dir.path().join("skills/notes");
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(
            skill_dir.join("SKILL.md"),
            "---\nname: notes\ndescription: Take notes\n---\nKeep notes short.\n",
        )
        .unwrap();

        let ctx = ContextBuilder::load(dir.path(), 5, Arc::new(NullEventSink));
        assert_eq!(ctx.rules(), "Answer in English.");
        assert_eq!(ctx.skill_names(), vec!["notes"]);
        let prompt = ctx.build_system_prompt();
        assert!(prompt.contains("Answer in English."));
        assert!(prompt.contains("## Skill: notes\nKeep notes short."));
    }

    #[test]
    fn test_build_tools_includes_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ContextBuilder::from_parts(String::new(), Vec::new());
        let tools = ctx.build_tools(builtin_tools(dir.path(), 5, Arc::new(NullEventSink)));
        assert_eq!(
            tools.tool_names(),
            vec!["list_dir", "read_file", "run_command", "write_file"]
        );
    }
}
