//! Sessions: one stored conversation per context.
//!
//! Terminal runs all share the `terminal` session so a conversation
//! continues across restarts; Slack channels and groups get one each.
//!
//! # Disk format
//!
//! Each session is a directory under `<root>/.agents/sessions/` holding a
//! pretty-printed `session.json` and a `messages.json` array.

pub mod manager;

pub use manager::{
    session_id, to_history, Session, SessionError, SessionKind, SessionMessage, SessionMeta,
    SessionRole, SessionStore, TERMINAL_SESSION_ID,
};
