//! Core types for PPAgent: chat messages, tool calls, tool schemas and the
//! request/response shapes of the OpenAI chat-completions protocol.
//!
//! Backends send assistant content either as a plain string or as a list of
//! typed segments. That duality is modelled explicitly by [`MessageContent`]
//! instead of being inspected at runtime.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message. Each variant maps to a `role` field value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: MessageContent },

    #[serde(rename = "assistant")]
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<MessageContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },

    /// Result of exactly one tool call, linked by `tool_call_id`.
    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message with text content.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
        }
    }

    /// Create an assistant message with tool calls (no text content).
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// The wire name of this message's role.
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }

    /// Tool calls carried by an assistant message; empty for every other role.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant {
                tool_calls: Some(calls),
                ..
            } => calls,
            _ => &[],
        }
    }
}

// ─────────────────────────────────────────────
// Message content (plain text or typed segments)
// ─────────────────────────────────────────────

/// Message content: either a plain string or a list of typed segments.
///
/// When serialized: text becomes a plain string, segments an array of objects.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Segments(Vec<ContentSegment>),
}

impl MessageContent {
    /// Concatenate the textual content.
    ///
    /// Plain text is returned verbatim; for segments only `text` segments
    /// contribute, in order. Nothing is trimmed here.
    pub fn extract_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Segments(segments) => {
                segments.iter().filter_map(ContentSegment::as_text).collect()
            }
        }
    }
}

/// One segment of segmented content.
///
/// Anything that is not a well-formed text segment is kept as raw JSON so it
/// round-trips to the backend untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ContentSegment {
    Text(TextSegment),
    Other(serde_json::Value),
}

impl ContentSegment {
    /// Build a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        ContentSegment::Text(TextSegment {
            kind: TextKind::Text,
            text: text.into(),
        })
    }

    /// The text of a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentSegment::Text(segment) => Some(&segment.text),
            ContentSegment::Other(_) => None,
        }
    }
}

/// `{"type": "text", "text": "..."}`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TextSegment {
    #[serde(rename = "type")]
    kind: TextKind,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
enum TextKind {
    #[serde(rename = "text")]
    Text,
}

// ─────────────────────────────────────────────
// Tool Calls (function calling)
// ─────────────────────────────────────────────

/// A tool call from the assistant, requesting execution of a function.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique ID for this tool call (used to match results).
    pub id: String,
    /// Always "function" in current OpenAI API.
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /// The function to call.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        ToolCall {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// The function name and arguments within a tool call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Name of the function/tool to call.
    pub name: String,
    /// Raw JSON-encoded arguments string, parsed by the dispatcher.
    /// An absent or null field reads as `{}`; an empty string is kept as is.
    #[serde(default = "empty_arguments", deserialize_with = "arguments_or_empty")]
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

fn empty_arguments() -> String {
    "{}".to_string()
}

fn arguments_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(empty_arguments))
}

// ─────────────────────────────────────────────
// Tool Definitions (for LLM requests)
// ─────────────────────────────────────────────

/// Definition of a tool, sent to the LLM so it knows what tools are available.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Always "function".
    #[serde(rename = "type")]
    pub tool_type: String,
    /// The function schema.
    pub function: FunctionDefinition,
}

/// Schema of a function tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        ToolDefinition {
            tool_type: function_type(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// JSON-Schema-like parameter object: `{"type":"object","properties":{..},"required":[..]}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParameterSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Schema keywords not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single named parameter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PropertySchema {
    #[serde(rename = "type", default = "string_type")]
    pub property_type: String,
    #[serde(default)]
    pub description: String,
    /// `items`, `enum` and similar keywords, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn object_type() -> String {
    "object".to_string()
}

fn string_type() -> String {
    "string".to_string()
}

impl ParameterSchema {
    /// An object schema with no properties.
    pub fn object() -> Self {
        Self {
            schema_type: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Add an optional property.
    pub fn property(
        mut self,
        name: impl Into<String>,
        property_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            PropertySchema {
                property_type: property_type.into(),
                description: description.into(),
                extra: BTreeMap::new(),
            },
        );
        self
    }

    /// Add a property and mark it required.
    pub fn required_property(
        self,
        name: impl Into<String>,
        property_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let mut schema = self.property(name.clone(), property_type, description);
        if !schema.required.contains(&name) {
            schema.required.push(name);
        }
        schema
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::object()
    }
}

// ─────────────────────────────────────────────
// Chat completion request / response
// ─────────────────────────────────────────────

/// Tool-choice policy. Only `"auto"` is ever sent.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolChoice {
    #[serde(rename = "auto")]
    Auto,
}

/// Request body for an OpenAI-compatible chat completion API.
///
/// `tools` and `tool_choice` are omitted entirely when no tools are offered;
/// some backends reject an empty tool list.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

/// Raw chat completion response from an OpenAI-compatible API.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

/// A single candidate in a chat completion response.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<AssistantMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message within a candidate.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl AssistantMessage {
    /// A text-only reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
        }
    }

    /// A reply requesting tool calls.
    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: Some(tool_calls),
        }
    }
}

impl From<AssistantMessage> for Message {
    fn from(msg: AssistantMessage) -> Self {
        Message::Assistant {
            content: msg.content,
            tool_calls: msg.tool_calls.filter(|calls| !calls.is_empty()),
        }
    }
}

impl ChatResponse {
    /// A response with a single candidate.
    pub fn single(message: AssistantMessage) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: Some(message),
                finish_reason: None,
            }],
            ..Default::default()
        }
    }

    /// The first candidate's message, if the backend produced one.
    pub fn into_first_message(self) -> Option<AssistantMessage> {
        self.choices.into_iter().next().and_then(|c| c.message)
    }
}

/// Token usage statistics from the LLM.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_text_message_serialization() {
        let json = serde_json::to_value(Message::user("Hello, world!")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello, world!");
    }

    #[test]
    fn test_assistant_tool_calls_serialization() {
        let msg = Message::assistant_tool_calls(vec![ToolCall::new(
            "call_123",
            "read_file",
            r#"{"path": "README.md"}"#,
        )]);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert!(json.get("content").is_none());
        let calls = json["tool_calls"].as_array().unwrap();
        assert_eq!(calls[0]["id"], "call_123");
        assert_eq!(calls[0]["type"], "function");
        assert_eq!(calls[0]["function"]["name"], "read_file");
    }

    #[test]
    fn test_tool_result_serialization() {
        let json = serde_json::to_value(Message::tool_result("call_1", "done")).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert_eq!(json["content"], "done");
    }

    #[test]
    fn test_assistant_with_null_content_deserializes() {
        let msg: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_abc",
                "type": "function",
                "function": { "name": "list_dir", "arguments": "{}" }
            }]
        }))
        .unwrap();
        assert_eq!(msg.tool_calls().len(), 1);
        assert_eq!(msg.tool_calls()[0].function.name, "list_dir");
    }

    #[test]
    fn test_missing_or_null_arguments_read_as_empty_object() {
        let missing: ToolCall = serde_json::from_value(json!({
            "id": "c1",
            "function": { "name": "list_dir" }
        }))
        .unwrap();
        assert_eq!(missing.function.arguments, "{}");

        let null: ToolCall = serde_json::from_value(json!({
            "id": "c2",
            "function": { "name": "list_dir", "arguments": null }
        }))
        .unwrap();
        assert_eq!(null.function.arguments, "{}");

        let empty: ToolCall = serde_json::from_value(json!({
            "id": "c3",
            "function": { "name": "list_dir", "arguments": "" }
        }))
        .unwrap();
        assert_eq!(empty.function.arguments, "");
    }

    #[test]
    fn test_empty_tool_calls_dropped_from_assistant() {
        let reply: AssistantMessage = serde_json::from_value(json!({
            "content": "done",
            "tool_calls": []
        }))
        .unwrap();
        let msg: Message = reply.into();
        assert!(msg.tool_calls().is_empty());

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert_eq!(json["content"], "done");
    }

    #[test]
    fn test_tool_calls_empty_for_other_roles() {
        assert!(Message::user("x").tool_calls().is_empty());
        assert!(Message::assistant("x").tool_calls().is_empty());
    }

    #[test]
    fn test_extract_text_plain() {
        let content = MessageContent::Text("  hi  ".into());
        assert_eq!(content.extract_text(), "  hi  ");
    }

    #[test]
    fn test_extract_text_segments_skips_non_text() {
        let content: MessageContent = serde_json::from_value(json!([
            {"type": "text", "text": "A"},
            {"type": "image"},
            {"type": "text", "text": "B"}
        ]))
        .unwrap();
        assert_eq!(content.extract_text(), "AB");
    }

    #[test]
    fn test_text_typed_segment_without_text_is_other() {
        let content: MessageContent =
            serde_json::from_value(json!([{"type": "text"}, {"type": "text", "text": "x"}])).unwrap();
        match &content {
            MessageContent::Segments(parts) => {
                assert!(parts[0].as_text().is_none());
                assert_eq!(parts[1].as_text(), Some("x"));
            }
            _ => panic!("Expected segments"),
        }
        assert_eq!(content.extract_text(), "x");
    }

    #[test]
    fn test_other_segment_round_trips_untouched() {
        let raw = json!({"type": "image_url", "image_url": {"url": "data:,"}});
        let segment: ContentSegment = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&segment).unwrap(), raw);
    }

    #[test]
    fn test_parameter_schema_builder() {
        let schema = ParameterSchema::object()
            .required_property("path", "string", "Relative file path")
            .property("content", "string", "Content to write");
        let json = serde_json::to_value(&schema).unwrap();

        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["path"]["type"], "string");
        assert_eq!(json["properties"]["content"]["description"], "Content to write");
        assert_eq!(json["required"], json!(["path"]));
    }

    #[test]
    fn test_parameter_schema_keeps_unmodelled_keywords() {
        let raw = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "mode": {"enum": ["fast", "slow"]}
            },
            "additionalProperties": false
        });
        let schema: ParameterSchema = serde_json::from_value(raw).unwrap();
        assert_eq!(schema.properties["mode"].property_type, "string");
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["properties"]["tags"]["items"]["type"], "string");
        assert_eq!(json["properties"]["mode"]["enum"], json!(["fast", "slow"]));
        assert_eq!(json["additionalProperties"], false);
    }

    #[test]
    fn test_parameter_schema_omits_empty_required() {
        let json = serde_json::to_value(ParameterSchema::object()).unwrap();
        assert!(json.get("required").is_none());
    }

    #[test]
    fn test_chat_request_without_tools_omits_fields() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::system("sys"), Message::user("Hello")],
            tools: None,
            tool_choice: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_chat_request_with_tools_sends_auto() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::user("Search")],
            tools: Some(vec![ToolDefinition::new("t", "d", ParameterSchema::object())]),
            tool_choice: Some(ToolChoice::Auto),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["tools"][0]["function"]["name"], "t");
    }

    #[test]
    fn test_chat_response_first_message() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-abc",
            "choices": [
                {"message": {"content": "first"}, "finish_reason": "stop"},
                {"message": {"content": "second"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        }))
        .unwrap();
        let msg = resp.into_first_message().unwrap();
        assert_eq!(msg, AssistantMessage::text("first"));
    }

    #[test]
    fn test_chat_response_without_choices_has_no_message() {
        let resp: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(resp.into_first_message().is_none());

        let resp: ChatResponse =
            serde_json::from_value(json!({"choices": [{"finish_reason": "stop"}]})).unwrap();
        assert!(resp.into_first_message().is_none());
    }

    #[test]
    fn test_assistant_message_into_message() {
        let msg: Message = AssistantMessage::with_tool_calls(vec![ToolCall::new("c", "n", "{}")]).into();
        assert_eq!(msg.role(), "assistant");
        assert_eq!(msg.tool_calls()[0].id, "c");
    }
}
