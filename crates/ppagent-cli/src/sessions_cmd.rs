//! `ppagent sessions`: list stored conversation sessions.

use anyhow::Result;
use colored::Colorize;

use ppagent_core::config::load_settings;
use ppagent_core::session::SessionStore;

pub fn run() -> Result<()> {
    let config = load_settings()?;
    let store = SessionStore::new(&config.root);
    let ids = store.list_session_ids();

    if ids.is_empty() {
        println!("No sessions in {}", store.sessions_dir().display());
        return Ok(());
    }

    println!("{}\n", "Sessions:".bold());
    for id in ids {
        let count = store.get_session_messages(&id, None).len();
        println!("  {:<32} {}", id, format!("{count} messages").dimmed());
    }
    println!();
    Ok(())
}
