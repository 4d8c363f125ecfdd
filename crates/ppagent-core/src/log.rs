//! Activity log: categorized, best-effort event records.
//!
//! The agent, tools, skill loader and CLI report what they do through an
//! injected [`EventSink`]. Recording never fails and never blocks the caller.
//!
//! # File format
//!
//! `FileEventSink` appends one line per event to `<root>/logs/ppagent.log`:
//!
//! ```text
//! 2026-01-01T12:00:00.000Z [tool] read_file {"path":"src/main.rs"}
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Messages longer than this are cut and suffixed with `…`.
pub const MAX_MESSAGE_CHARS: usize = 2000;

// ─────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────

/// What part of the system an event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Cli,
    Agent,
    Tool,
    Skills,
    Command,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Cli => "cli",
            LogCategory::Agent => "agent",
            LogCategory::Tool => "tool",
            LogCategory::Skills => "skills",
            LogCategory::Command => "command",
            LogCategory::Error => "error",
        }
    }
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// EventSink trait
// ─────────────────────────────────────────────

/// Destination for activity records.
///
/// Implementations must swallow their own failures.
pub trait EventSink: Send + Sync {
    fn record(&self, category: LogCategory, message: &str, data: Option<Value>);
}

/// Render one log line (without the trailing newline).
pub fn format_line(
    timestamp: &str,
    category: LogCategory,
    message: &str,
    data: Option<&Value>,
) -> String {
    let mut msg: String = message.replace(['\r', '\n'], " ");
    if msg.chars().count() > MAX_MESSAGE_CHARS {
        msg = msg.chars().take(MAX_MESSAGE_CHARS).collect();
        msg.push('…');
    }
    match data {
        Some(data) if !is_blank(data) => format!("{} [{}] {} {}", timestamp, category, msg, data),
        _ => format!("{} [{}] {}", timestamp, category, msg),
    }
}

fn is_blank(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

// ─────────────────────────────────────────────
// FileEventSink
// ─────────────────────────────────────────────

/// Appends records to a log file from a background writer task.
pub struct FileEventSink {
    tx: mpsc::UnboundedSender<WriterCommand>,
    path: PathBuf,
}

enum WriterCommand {
    Line(String),
    Flush(oneshot::Sender<()>),
}

impl FileEventSink {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(path.clone(), rx));
        Self { tx, path }
    }

    /// The file this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every record sent so far has been written.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriterCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl EventSink for FileEventSink {
    fn record(&self, category: LogCategory, message: &str, data: Option<Value>) {
        let ts = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let line = format_line(&ts, category, message, data.as_ref());
        // Receiver only goes away at runtime shutdown.
        let _ = self.tx.send(WriterCommand::Line(line));
    }
}

async fn write_loop(path: PathBuf, mut rx: mpsc::UnboundedReceiver<WriterCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WriterCommand::Line(line) => {
                if let Err(e) = append_line(&path, &line).await {
                    warn!("Failed to write activity log {}: {}", path.display(), e);
                }
            }
            WriterCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Activity log writer stopped");
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await
}

// ─────────────────────────────────────────────
// Other sinks
// ─────────────────────────────────────────────

/// Forwards records to `tracing`.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, category: LogCategory, message: &str, data: Option<Value>) {
        let data = data.map(|d| d.to_string()).unwrap_or_default();
        match category {
            LogCategory::Error => error!(category = %category, data = %data, "{}", message),
            LogCategory::Tool | LogCategory::Command => {
                debug!(category = %category, data = %data, "{}", message)
            }
            _ => info!(category = %category, data = %data, "{}", message),
        }
    }
}

/// Discards everything.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn record(&self, _category: LogCategory, _message: &str, _data: Option<Value>) {}
}

/// Sends each record to every inner sink.
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutEventSink {
    fn record(&self, category: LogCategory, message: &str, data: Option<Value>) {
        for sink in &self.sinks {
            sink.record(category, message, data.clone());
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
