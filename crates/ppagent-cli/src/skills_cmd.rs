//! `ppagent skills` and `ppagent install-skill`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::json;
use tracing::warn;

use ppagent_agent::SkillsLoader;
use ppagent_core::config::load_settings;
use ppagent_core::log::{EventSink, FileEventSink, LogCategory};
use ppagent_core::utils::{is_plain_dir_name, truncate_string};

use crate::helpers::copy_dir_recursive;

/// Descriptions longer than this are shortened in the listing.
const MAX_DESCRIPTION_CHARS: usize = 120;

/// List every skill the agent would load.
pub async fn list() -> Result<()> {
    let config = load_settings()?;
    let sink = Arc::new(FileEventSink::spawn(config.log_file()));
    sink.record(LogCategory::Command, "skills started", None);

    let skills = SkillsLoader::new(&config.root, config.command_timeout_secs, sink.clone()).load_all();
    sink.record(
        LogCategory::Command,
        "skills list",
        Some(json!({ "count": skills.len() })),
    );

    if skills.is_empty() {
        println!("No skills installed. Add folders under skills/ or run `ppagent install-skill <path>`.");
    } else {
        println!("{}\n", "Installed skills:".bold());
        for skill in &skills {
            println!("  {}", skill.meta.name.cyan());
            if !skill.meta.description.is_empty() {
                println!(
                    "    {}",
                    truncate_string(&skill.meta.description, MAX_DESCRIPTION_CHARS)
                );
            }
            let tools = skill.tool_names();
            if !tools.is_empty() {
                println!("    {} {}", "tools:".dimmed(), tools.join(", "));
            }
            println!();
        }
    }

    sink.flush().await;
    Ok(())
}

/// Copy a skill directory into `<root>/skills/<name>`.
pub async fn install(source: &Path) -> Result<()> {
    let config = load_settings()?;
    let sink = FileEventSink::spawn(config.log_file());
    sink.record(
        LogCategory::Command,
        "install-skill started",
        Some(json!({ "arg": source.display().to_string() })),
    );

    let result = install_skill(source, &config.project_skills_dir());
    match &result {
        Ok(dest) => {
            sink.record(
                LogCategory::Command,
                "skill installed",
                Some(json!({ "dest": dest.display().to_string() })),
            );
            println!("Installed skill: {} -> {}", dir_name(dest), dest.display());
        }
        Err(e) => sink.record(
            LogCategory::Error,
            "install-skill",
            Some(json!({ "error": format!("{e:#}") })),
        ),
    }

    sink.flush().await;
    result.map(|_| ())
}

/// Copy `source` into `skills_dir`, keeping its directory name.
///
/// Existing files at the destination are overwritten.
pub fn install_skill(source: &Path, skills_dir: &Path) -> Result<PathBuf> {
    if !source.is_dir() {
        bail!("Not a directory: {}", source.display());
    }
    let source = source
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", source.display()))?;
    let name = dir_name(&source);
    if !is_plain_dir_name(&name) {
        bail!("Cannot derive a skill name from {}", source.display());
    }

    let has_manifest = ["skill.json", "SKILL.md", "tools.json"]
        .iter()
        .any(|f| source.join(f).is_file());
    if !has_manifest {
        warn!(
            "{} has no skill.json, SKILL.md or tools.json; it will not load as a skill",
            source.display()
        );
    }

    std::fs::create_dir_all(skills_dir)
        .with_context(|| format!("failed to create {}", skills_dir.display()))?;
    let skills_dir = skills_dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", skills_dir.display()))?;
    let dest = skills_dir.join(&name);

    let resolved_dest = if dest.exists() {
        dest.canonicalize()
            .with_context(|| format!("failed to resolve {}", dest.display()))?
    } else {
        dest.clone()
    };
    if resolved_dest == source {
        warn!("{} is already installed in place", source.display());
        return Ok(dest);
    }
    if resolved_dest.starts_with(&source) {
        bail!(
            "Cannot install {} into {}: the destination is inside the source",
            source.display(),
            dest.display()
        );
    }

    copy_dir_recursive(&source, &dest)?;
    Ok(dest)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
