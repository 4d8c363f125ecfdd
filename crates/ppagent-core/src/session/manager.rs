//! Session persistence.
//!
//! Layout under `<root>/.agents/sessions/`:
//! - `<id>/session.json`: `{"id","type","createdAt","updatedAt","meta"?}`
//! - `<id>/messages.json`: `[{"role":"user","content":"hi","at":"..."}]`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Message;
use crate::utils;

/// Id shared by every terminal run, so the conversation survives restarts.
pub const TERMINAL_SESSION_ID: &str = "terminal";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ─────────────────────────────────────────────
// Session records
// ─────────────────────────────────────────────

/// Conversation context a session belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    Terminal,
    Slack,
    SlackChannel,
    SlackGroup,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Terminal => "terminal",
            SessionKind::Slack => "slack",
            SessionKind::SlackChannel => "slack-channel",
            SessionKind::SlackGroup => "slack-group",
        }
    }

    fn is_slack(&self) -> bool {
        !matches!(self, SessionKind::Terminal)
    }
}

/// Optional context attached to a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    /// Slack channel/group id for slack kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Human-readable label (e.g. channel name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SessionMeta {
    pub fn is_empty(&self) -> bool {
        self.channel_id.is_none() && self.label.is_none() && self.extra.is_empty()
    }
}

/// Contents of `session.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SessionMeta>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    User,
    Assistant,
}

/// One stored exchange message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: SessionRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
}

impl SessionMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: SessionRole::User,
            content: content.into(),
            at: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: SessionRole::Assistant,
            content: content.into(),
            at: None,
        }
    }
}

impl From<&SessionMessage> for Message {
    fn from(m: &SessionMessage) -> Self {
        match m.role {
            SessionRole::User => Message::user(m.content.clone()),
            SessionRole::Assistant => Message::assistant(m.content.clone()),
        }
    }
}

/// Convert stored messages into transcript history.
pub fn to_history(messages: &[SessionMessage]) -> Vec<Message> {
    messages.iter().map(Message::from).collect()
}

// ─────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────

/// File-backed session storage rooted at `<root>/.agents/sessions`.
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    /// Store for the project at `root`. Nothing is created until first use.
    pub fn new(root: &Path) -> Self {
        Self {
            sessions_dir: root.join(".agents").join("sessions"),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Return the existing session for this context or create it.
    ///
    /// An existing `session.json` is returned unchanged (the given meta is
    /// not merged in).
    pub fn get_or_create_session(
        &self,
        kind: SessionKind,
        meta: Option<SessionMeta>,
    ) -> Result<Session, SessionError> {
        let id = session_id(kind, meta.as_ref());
        let dir = self.sessions_dir.join(&id);
        let session_path = dir.join("session.json");

        if let Ok(raw) = std::fs::read_to_string(&session_path) {
            match serde_json::from_str::<Session>(&raw) {
                Ok(session) => return Ok(session),
                Err(e) => warn!(
                    "Corrupt session file {}, recreating: {}",
                    session_path.display(),
                    e
                ),
            }
        }

        let now = Utc::now();
        let session = Session {
            id,
            kind,
            created_at: now,
            updated_at: now,
            meta: meta.filter(|m| !m.is_empty()),
        };
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        write_json(&session_path, &session)?;
        write_json(&dir.join("messages.json"), &Vec::<SessionMessage>::new())?;
        debug!("Created session '{}'", session.id);
        Ok(session)
    }

    /// Append messages, stamping those without `at`, and bump `updatedAt`.
    pub fn append_to_session(
        &self,
        session_id: &str,
        messages: &[SessionMessage],
    ) -> Result<(), SessionError> {
        if messages.is_empty() {
            return Ok(());
        }
        let dir = self.sessions_dir.join(session_id);
        let session_path = dir.join("session.json");
        let messages_path = dir.join("messages.json");
        let now = Utc::now();

        let mut existing = match std::fs::read_to_string(&messages_path) {
            Ok(raw) => serde_json::from_str::<Vec<SessionMessage>>(&raw).unwrap_or_else(|e| {
                warn!("Discarding corrupt {}: {}", messages_path.display(), e);
                Vec::new()
            }),
            Err(_) => {
                std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
                Vec::new()
            }
        };
        existing.extend(messages.iter().map(|m| SessionMessage {
            at: m.at.or(Some(now)),
            ..m.clone()
        }));
        write_json(&messages_path, &existing)?;

        // A missing session.json doesn't undo the append.
        if let Ok(raw) = std::fs::read_to_string(&session_path) {
            if let Ok(mut session) = serde_json::from_str::<Session>(&raw) {
                session.updated_at = now;
                write_json(&session_path, &session)?;
            }
        }
        debug!(
            "Appended {} message(s) to session '{}'",
            messages.len(),
            session_id
        );
        Ok(())
    }

    /// Stored messages, oldest first; only the last `max` when given.
    ///
    /// Missing or unreadable files yield an empty list.
    pub fn get_session_messages(&self, session_id: &str, max: Option<usize>) -> Vec<SessionMessage> {
        let path = self.sessions_dir.join(session_id).join("messages.json");
        let all: Vec<SessionMessage> = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(all) => all,
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    return Vec::new();
                }
            },
            Err(_) => return Vec::new(),
        };
        match max {
            Some(max) if all.len() > max => all[all.len() - max..].to_vec(),
            _ => all,
        }
    }

    /// Names of the session directories, sorted.
    pub fn list_session_ids(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut ids: Vec<String> = entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        ids.sort();
        ids
    }
}

/// Derive the session id for a context.
pub fn session_id(kind: SessionKind, meta: Option<&SessionMeta>) -> String {
    if kind == SessionKind::Terminal {
        return TERMINAL_SESSION_ID.to_string();
    }
    let channel = meta.and_then(|m| m.channel_id.as_deref());
    match channel {
        Some(channel) if kind.is_slack() => {
            format!("{}-{}", kind.as_str(), utils::sanitize_session_suffix(channel))
        }
        _ => {
            let random = uuid::Uuid::new_v4().simple().to_string();
            let suffix = format!("{}-{}", Utc::now().timestamp_millis(), &random[..4]);
            format!("{}-{}", kind.as_str(), utils::sanitize_session_suffix(&suffix))
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SessionError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SessionError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| io_err(path, e))
}

fn io_err(path: &Path, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        (store, dir)
    }

    fn channel(id: &str) -> SessionMeta {
        SessionMeta {
            channel_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_terminal_session_id_is_fixed() {
        let (store, _dir) = make_store();
        let session = store.get_or_create_session(SessionKind::Terminal, None).unwrap();
        assert_eq!(session.id, "terminal");
        assert!(store.sessions_dir().join("terminal/session.json").exists());
        assert!(store.get_session_messages("terminal", None).is_empty());
    }

    #[test]
    fn test_existing_session_returned_unchanged() {
        let (store, _dir) = make_store();
        let first = store.get_or_create_session(SessionKind::Terminal, None).unwrap();
        let second = store
            .get_or_create_session(SessionKind::Terminal, Some(channel("ignored")))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_slack_channel_id_sanitized() {
        let id = session_id(SessionKind::SlackChannel, Some(&channel("C01/AB#z")));
        assert_eq!(id, "slack-channel-C01-AB-z");
    }

    #[test]
    fn test_random_id_shape() {
        let id = session_id(SessionKind::Slack, None);
        let rest = id.strip_prefix("slack-").unwrap();
        let (millis, hex) = rest.split_once('-').unwrap();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(hex.len(), 4);
    }

    #[test]
    fn test_empty_meta_omitted() {
        let (store, _dir) = make_store();
        let session = store
            .get_or_create_session(SessionKind::Terminal, Some(SessionMeta::default()))
            .unwrap();
        assert!(session.meta.is_none());
        let raw =
            std::fs::read_to_string(store.sessions_dir().join("terminal/session.json")).unwrap();
        assert!(!raw.contains("meta"));
        assert!(raw.contains("\"createdAt\""));
        assert!(raw.contains("\"type\": \"terminal\""));
    }

    #[test]
    fn test_append_and_limit() {
        let (store, _dir) = make_store();
        let session = store.get_or_create_session(SessionKind::Terminal, None).unwrap();
        for i in 0..5 {
            store
                .append_to_session(&session.id, &[SessionMessage::user(format!("msg {}", i))])
                .unwrap();
        }

        let all = store.get_session_messages(&session.id, None);
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|m| m.at.is_some()));

        let last = store.get_session_messages(&session.id, Some(2));
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].content, "msg 3");
        assert_eq!(last[1].content, "msg 4");
    }

    #[test]
    fn test_append_bumps_updated_at() {
        let (store, _dir) = make_store();
        let created = store.get_or_create_session(SessionKind::Terminal, None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store
            .append_to_session("terminal", &[SessionMessage::assistant("hi")])
            .unwrap();
        let reloaded = store.get_or_create_session(SessionKind::Terminal, None).unwrap();
        assert!(reloaded.updated_at > created.updated_at);
        assert_eq!(reloaded.created_at, created.created_at);
    }

    #[test]
    fn test_append_keeps_existing_timestamp() {
        let (store, _dir) = make_store();
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let msg = SessionMessage {
            at: Some(at),
            ..SessionMessage::user("old")
        };
        store.append_to_session("terminal", &[msg]).unwrap();
        let stored = store.get_session_messages("terminal", None);
        assert_eq!(stored[0].at, Some(at));
    }

    #[test]
    fn test_append_empty_is_noop() {
        let (store, _dir) = make_store();
        store.append_to_session("nothing", &[]).unwrap();
        assert!(!store.sessions_dir().join("nothing").exists());
    }

    #[test]
    fn test_corrupt_messages_read_as_empty() {
        let (store, _dir) = make_store();
        let dir = store.sessions_dir().join("terminal");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("messages.json"), "not json").unwrap();
        assert!(store.get_session_messages("terminal", None).is_empty());
    }

    #[test]
    fn test_list_session_ids() {
        let (store, _dir) = make_store();
        assert!(store.list_session_ids().is_empty());
        store.get_or_create_session(SessionKind::Terminal, None).unwrap();
        store
            .get_or_create_session(SessionKind::SlackGroup, Some(channel("G1")))
            .unwrap();
        assert_eq!(store.list_session_ids(), vec!["slack-group-G1", "terminal"]);
    }

    #[test]
    fn test_history_conversion() {
        let history = to_history(&[SessionMessage::user("q"), SessionMessage::assistant("a")]);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), "user");
        assert_eq!(history[1].role(), "assistant");
    }
}
