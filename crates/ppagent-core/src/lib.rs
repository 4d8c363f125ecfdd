//! PPAgent core: shared types, configuration, sessions and the activity log.
//!
//! - **types**: chat messages, tool calls/definitions, transport request/response
//! - **config**: environment-driven configuration
//! - **session**: file-backed conversation sessions
//! - **log**: best-effort activity log sinks
//! - **utils**: small string/path helpers

pub mod config;
pub mod log;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Config;
pub use log::{EventSink, LogCategory};
pub use types::{Message, MessageContent, ToolCall, ToolDefinition};
