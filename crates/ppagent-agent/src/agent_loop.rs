//! Agent loop: the model ↔ tool-calling turn loop.
//!
//! [`run_agent`] sends the transcript to the model, dispatches any tool calls
//! it asks for, feeds the results back and repeats until the model answers in
//! plain text or the turn budget runs out. It always produces an answer
//! string; failures surface as fixed strings in the content.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use ppagent_core::config::schema::DEFAULT_MAX_TURNS;
use ppagent_core::log::{EventSink, LogCategory};
use ppagent_core::types::{ChatRequest, Message, ToolChoice};
use ppagent_providers::traits::ChatTransport;

use crate::tools::registry::ToolRegistry;

/// Returned when the backend sends no candidate message.
pub const NO_RESPONSE: &str = "No response from model.";

/// Returned when the final answer has no text.
pub const NO_TEXT_RESPONSE: &str = "(no text response)";

/// Returned when the turn budget is exhausted.
pub const MAX_TURNS_REACHED: &str = "Max turns reached. Try a shorter or simpler request.";

/// Returned when the transport itself fails.
pub const MODEL_REQUEST_FAILED: &str = "Model request failed. See the log for details.";

// ─────────────────────────────────────────────
// Options / outcome
// ─────────────────────────────────────────────

/// Everything one agent run needs.
#[derive(Clone)]
pub struct AgentOptions {
    pub transport: Arc<dyn ChatTransport>,
    pub model: String,
    pub system_prompt: String,
    pub tools: Arc<ToolRegistry>,
    /// Turn budget; `0` means [`DEFAULT_MAX_TURNS`].
    pub max_turns: usize,
    pub sink: Arc<dyn EventSink>,
}

impl AgentOptions {
    fn turn_budget(&self) -> usize {
        if self.max_turns == 0 {
            DEFAULT_MAX_TURNS
        } else {
            self.max_turns
        }
    }

    fn record(&self, message: &str, data: serde_json::Value) {
        self.sink.record(LogCategory::Agent, message, Some(data));
    }
}

/// Result of [`run_agent`].
#[derive(Clone, Debug, PartialEq)]
pub struct AgentOutcome {
    /// The answer shown to the user.
    pub content: String,
    /// Prior transcript plus everything appended during this run
    /// (no system message).
    pub transcript: Vec<Message>,
}

impl AgentOutcome {
    fn new(content: impl Into<String>, transcript: Vec<Message>) -> Self {
        Self {
            content: content.into(),
            transcript,
        }
    }
}

// ─────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────

/// Run one user message through the model/tool loop.
///
/// `history` is never mutated; the returned transcript is a new vector
/// starting with a copy of it.
pub async fn run_agent(options: &AgentOptions, user_message: &str, history: &[Message]) -> AgentOutcome {
    let max_turns = options.turn_budget();
    let mut transcript: Vec<Message> = history.to_vec();
    transcript.push(Message::user(user_message));

    options.record(
        "runAgent started",
        json!({
            "userMessage": user_message,
            "historyLength": history.len(),
            "maxTurns": max_turns,
            "toolCount": options.tools.len(),
        }),
    );
    info!(model = %options.model, max_turns, tools = options.tools.len(), "agent run started");

    let definitions = if options.tools.is_empty() {
        None
    } else {
        Some(options.tools.get_definitions())
    };

    let mut turn = 0;
    while turn < max_turns {
        turn += 1;

        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Message::system(options.system_prompt.clone()));
        messages.extend(transcript.iter().cloned());
        let request = ChatRequest {
            model: options.model.clone(),
            messages,
            tool_choice: definitions.as_ref().map(|_| ToolChoice::Auto),
            tools: definitions.clone(),
        };

        options.record(
            "LLM request",
            json!({ "turn": turn, "messageCount": request.messages.len() }),
        );
        debug!(turn, messages = request.messages.len(), "model request");

        let response = match options.transport.complete(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(turn, error = %format!("{e:#}"), "model request failed");
                options.sink.record(
                    LogCategory::Error,
                    "Model request failed",
                    Some(json!({ "turn": turn, "error": format!("{e:#}") })),
                );
                return AgentOutcome::new(MODEL_REQUEST_FAILED, transcript);
            }
        };

        let Some(reply) = response.into_first_message() else {
            options.record("No response from model", json!({ "turn": turn }));
            return AgentOutcome::new(NO_RESPONSE, transcript);
        };

        let assistant: Message = reply.into();
        let calls = assistant.tool_calls().to_vec();
        let text = match &assistant {
            Message::Assistant {
                content: Some(content),
                ..
            } => content.extract_text(),
            _ => String::new(),
        };
        transcript.push(assistant);

        if calls.is_empty() {
            let trimmed = text.trim();
            let content = if trimmed.is_empty() {
                NO_TEXT_RESPONSE.to_string()
            } else {
                trimmed.to_string()
            };
            options.record(
                "Agent response (final)",
                json!({ "turn": turn, "length": content.chars().count() }),
            );
            info!(turn, "agent run finished");
            return AgentOutcome::new(content, transcript);
        }

        let names: Vec<&str> = calls.iter().map(|c| c.function.name.as_str()).collect();
        options.record("Tool calls", json!({ "turn": turn, "calls": names }));

        for call in &calls {
            let name = call.function.name.as_str();
            options.record(
                "Tool executed",
                json!({ "name": name, "arguments": call.function.arguments }),
            );

            let result = options.tools.dispatch(name, &call.function.arguments).await;

            if is_failure(&result) {
                options.record("Tool error", json!({ "name": name, "error": &result }));
            } else {
                options.record(
                    "Tool result",
                    json!({ "name": name, "length": result.chars().count() }),
                );
            }
            transcript.push(Message::tool_result(call.id.clone(), result));
        }
    }

    options.record("Max turns reached", json!({ "maxTurns": max_turns }));
    warn!(max_turns, "agent run hit the turn budget");
    AgentOutcome::new(MAX_TURNS_REACHED, transcript)
}

/// Whether a dispatch result reports a failure rather than tool output.
fn is_failure(result: &str) -> bool {
    result.starts_with("Error: ") || result.starts_with("Unknown tool: ")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
