//! `ppagent status`: show configuration and project status.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use ppagent_agent::rules::{load_all_rules, load_rules, DEFAULT_RULES_FILE};
use ppagent_agent::SkillsLoader;
use ppagent_core::config::load_settings;
use ppagent_core::log::NullEventSink;
use ppagent_core::session::SessionStore;

use crate::helpers::skill_list;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_settings()?;

    println!();
    println!("{}", "PPAgent Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Root:".bold(),
        config.root.display(),
        present(config.root.is_dir())
    );
    println!("  {:<18} {}", "Model:".bold(), config.model);
    println!("  {:<18} {}", "Base URL:".bold(), config.base_url);
    let key_status = if config.has_api_key() {
        format!("{} (key set)", "✓".green())
    } else {
        format!("{}", "✗ not set".red())
    };
    println!("  {:<18} {}", "API key:".bold(), key_status);
    println!(
        "  {:<18} {}",
        "Limits:".bold(),
        format!(
            "max_turns: {} | history: {} | command timeout: {}s",
            config.max_turns, config.history_limit, config.command_timeout_secs
        )
        .dimmed()
    );

    // Skills
    println!();
    let skills = SkillsLoader::new(
        &config.root,
        config.command_timeout_secs,
        Arc::new(NullEventSink),
    )
    .load_all();
    let names: Vec<String> = skills.iter().map(|s| s.meta.name.clone()).collect();
    println!("  {:<18} {}", "Skills:".bold(), skill_list(&names));
    for dir in [config.project_skills_dir(), config.installed_skills_dir()] {
        println!("    {:<16} {}", dir.display(), present(dir.is_dir()));
    }

    // Rules
    let rules = load_rules(&config.root, DEFAULT_RULES_FILE);
    let rules_status = if rules.is_empty() {
        format!("{}", "· none".dimmed())
    } else {
        format!("{} ({} chars)", DEFAULT_RULES_FILE, rules.chars().count())
    };
    println!("  {:<18} {}", "Rules:".bold(), rules_status);
    let all_rules = load_all_rules(&config.root);
    if !all_rules.is_empty() && all_rules != rules {
        println!(
            "    {}",
            format!("all rule files: {} chars", all_rules.chars().count()).dimmed()
        );
    }

    // Sessions + log
    let sessions = SessionStore::new(&config.root).list_session_ids();
    println!("  {:<18} {}", "Sessions:".bold(), sessions.len());
    println!(
        "  {:<18} {} {}",
        "Log file:".bold(),
        config.log_file().display(),
        present(config.log_file().is_file())
    );

    println!();
    Ok(())
}

fn present(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".dimmed().to_string()
    }
}
