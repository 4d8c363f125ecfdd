//! Project rules: markdown the agent must always follow.
//!
//! Looked up in `<root>/.agents/rules/` first, then `<root>/rules/`.

use std::path::{Path, PathBuf};

use tracing::warn;

/// File read by [`load_rules`] when no name is given.
pub const DEFAULT_RULES_FILE: &str = "rules.md";

/// Separator between rule files in [`load_all_rules`].
const RULES_SEPARATOR: &str = "\n\n---\n\n";

fn rules_dirs(root: &Path) -> [PathBuf; 2] {
    [root.join(".agents").join("rules"), root.join("rules")]
}

/// Content of one rules file, trimmed; `""` if neither directory has it.
pub fn load_rules(root: &Path, filename: &str) -> String {
    for dir in rules_dirs(root) {
        if let Ok(content) = std::fs::read_to_string(dir.join(filename)) {
            return content.trim().to_string();
        }
    }
    String::new()
}

/// All `*.md` files of the first rules directory that has any content,
/// alphabetically, joined by a horizontal rule.
pub fn load_all_rules(root: &Path) -> String {
    for dir in rules_dirs(root) {
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => continue,
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();

        let parts: Vec<String> = files
            .iter()
            .filter_map(|path| match std::fs::read_to_string(path) {
                Ok(content) => Some(content.trim().to_string()),
                Err(e) => {
                    warn!("Failed to read rules file {}: {}", path.display(), e);
                    None
                }
            })
            .filter(|c| !c.is_empty())
            .collect();

        if !parts.is_empty() {
            return parts.join(RULES_SEPARATOR);
        }
    }
    String::new()
}

/// Wrap rules text for the system prompt; `""` when there are no rules.
pub fn format_rules_for_prompt(rules: &str) -> String {
    let trimmed = rules.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!(
        "\n## Rules you must follow\nAlways follow these rules in your answers and actions.\n\n{trimmed}\n"
    )
}
