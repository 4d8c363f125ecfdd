//! Shared CLI helpers: banner, response printing, skill directory copy.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

/// Print an agent response to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "PPAgent".cyan().bold());
    println!("{response}");
    println!();
}

/// Print an error line to stderr.
pub fn print_error(message: &str) {
    eprintln!("\n{} {message}\n", "Error:".red().bold());
}

/// Print the banner shown at REPL start.
pub fn print_banner(session_id: &str, history_len: usize, skills: &[String]) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "PPAgent".cyan().bold(), version.dimmed());
    println!(
        "{}",
        "Interactive chat. Type a message, or \"exit\" to quit.".dimmed()
    );
    println!(
        "Session: {} | History: {} messages | Skills: {}",
        session_id,
        history_len,
        skill_list(skills)
    );
    println!();
}

/// Comma-separated skill names, or `none`.
pub fn skill_list(skills: &[String]) -> String {
    if skills.is_empty() {
        "none".to_string()
    } else {
        skills.join(", ")
    }
}

/// Print a "thinking" placeholder while the agent runs.
pub fn print_thinking() {
    eprint!("{}", "… thinking".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

/// Recursively copy `src` into `dest`, creating directories as needed.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    for entry in std::fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target).with_context(|| {
                format!("failed to copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
