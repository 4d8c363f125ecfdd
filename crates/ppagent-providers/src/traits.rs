//! Chat transport trait: how the agent loop reaches a model.
//!
//! Tests substitute scripted implementations; production uses
//! [`HttpTransport`](crate::HttpTransport).

use async_trait::async_trait;
use ppagent_core::types::{ChatRequest, ChatResponse};

/// A request/response channel to a chat-completion backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one chat completion request.
    ///
    /// Transport failures (network, non-2xx status, undecodable body) are
    /// returned as `Err`; the caller decides how to surface them.
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
