//! HTTP transport for OpenAI-compatible chat completion APIs.
//!
//! Works against OpenAI itself and anything that speaks the same
//! `/chat/completions` dialect (local servers, proxies, gateways).

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tracing::{debug, error};

use ppagent_core::types::{ChatRequest, ChatResponse};

use crate::traits::ChatTransport;

/// Upper bound for one completion round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ─────────────────────────────────────────────
// HttpTransport
// ─────────────────────────────────────────────

/// Talks to any OpenAI-compatible HTTP API via `reqwest`.
pub struct HttpTransport {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport for `api_base` authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpTransport {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, |t| t.len()),
            "Calling chat completions"
        );

        let url = self.completions_url();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .with_context(|| format!("HTTP request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %error_text, "API error");
            bail!("API returned {}: {}", status, error_text);
        }

        let chat_resp = response
            .json::<ChatResponse>()
            .await
            .context("Failed to parse chat completion response")?;

        debug!(
            choices = chat_resp.choices.len(),
            total_tokens = chat_resp.usage.as_ref().map_or(0, |u| u.total_tokens),
            "Chat completion received"
        );
        Ok(chat_resp)
    }

    fn display_name(&self) -> &str {
        "openai-compatible"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
