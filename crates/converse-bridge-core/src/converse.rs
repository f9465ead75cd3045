//! Converse wire types
//!
//! Request body and stream events of the Converse / ConverseStream API, in their
//! JSON form. Field names are camelCase on the wire.

use crate::chat::ImageFormat;
use serde::{Deserialize, Serialize};

/// Request body for a streaming Converse call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub model_id: String,

    pub messages: Vec<Message>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<SystemContentBlock>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<InferenceConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfiguration>,

    /// Model-specific fields passed through untouched (e.g. reasoning budgets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_model_request_fields: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: ConversationRole,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

/// Content block of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    Text(String),
    Image(ImageBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageBlock {
    pub format: ImageFormat,
    pub source: ImageSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ImageSource {
    /// Base64 encoded image bytes
    Bytes(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBlock {
    pub tool_use_id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: Vec<ToolResultContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolResultStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ToolResultContentBlock {
    Text(String),
    Json(serde_json::Value),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolResultStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemContentBlock {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfiguration {
    pub tools: Vec<Tool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    ToolSpec(ToolSpecification),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpecification {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub input_schema: ToolInputSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ToolInputSchema {
    Json(serde_json::Value),
}

/// `{"auto":{}}`, `{"any":{}}` or `{"tool":{"name":...}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ToolChoice {
    Auto(EmptyObject),
    Any(EmptyObject),
    Tool(SpecificToolChoice),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmptyObject {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecificToolChoice {
    pub name: String,
}

/// One event of a ConverseStream response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ConverseStreamEvent {
    MessageStart(MessageStartEvent),
    ContentBlockStart(ContentBlockStartEvent),
    ContentBlockDelta(ContentBlockDeltaEvent),
    ContentBlockStop(ContentBlockStopEvent),
    MessageStop(MessageStopEvent),
    Metadata(MetadataEvent),

    // Error events
    InternalServerException(StreamErrorEvent),
    ModelStreamErrorException(StreamErrorEvent),
    ServiceUnavailableException(StreamErrorEvent),
    ThrottlingException(StreamErrorEvent),
    ValidationException(StreamErrorEvent),
}

impl ConverseStreamEvent {
    /// Name and payload of an exception event, if this is one
    pub fn as_exception(&self) -> Option<(&'static str, &StreamErrorEvent)> {
        match self {
            ConverseStreamEvent::InternalServerException(e) => Some(("internalServerException", e)),
            ConverseStreamEvent::ModelStreamErrorException(e) => {
                Some(("modelStreamErrorException", e))
            }
            ConverseStreamEvent::ServiceUnavailableException(e) => {
                Some(("serviceUnavailableException", e))
            }
            ConverseStreamEvent::ThrottlingException(e) => Some(("throttlingException", e)),
            ConverseStreamEvent::ValidationException(e) => Some(("validationException", e)),
            _ => None,
        }
    }

    pub fn block_start_tool(index: u32, tool_use_id: &str, name: &str) -> Self {
        ConverseStreamEvent::ContentBlockStart(ContentBlockStartEvent {
            content_block_index: index,
            start: ContentBlockStart {
                tool_use: Some(ToolUseBlockStart {
                    tool_use_id: tool_use_id.to_string(),
                    name: name.to_string(),
                }),
            },
        })
    }

    pub fn text_delta(index: u32, text: &str) -> Self {
        Self::delta(
            index,
            ContentBlockDelta {
                text: Some(text.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn reasoning_delta(index: u32, text: &str) -> Self {
        Self::delta(
            index,
            ContentBlockDelta {
                reasoning_content: Some(ReasoningContentDelta {
                    text: Some(text.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
    }

    pub fn tool_input_delta(index: u32, input: &str) -> Self {
        Self::delta(
            index,
            ContentBlockDelta {
                tool_use: Some(ToolUseBlockDelta {
                    input: input.to_string(),
                }),
                ..Default::default()
            },
        )
    }

    pub fn block_stop(index: u32) -> Self {
        ConverseStreamEvent::ContentBlockStop(ContentBlockStopEvent {
            content_block_index: index,
        })
    }

    pub fn message_stop(stop_reason: StopReason) -> Self {
        ConverseStreamEvent::MessageStop(MessageStopEvent {
            stop_reason,
            additional_model_response_fields: None,
        })
    }

    fn delta(index: u32, delta: ContentBlockDelta) -> Self {
        ConverseStreamEvent::ContentBlockDelta(ContentBlockDeltaEvent {
            content_block_index: index,
            delta,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageStartEvent {
    pub role: ConversationRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockStartEvent {
    #[serde(alias = "index")]
    pub content_block_index: u32,
    #[serde(default)]
    pub start: ContentBlockStart,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockStart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<ToolUseBlockStart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBlockStart {
    pub tool_use_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockDeltaEvent {
    #[serde(alias = "index")]
    pub content_block_index: u32,
    pub delta: ContentBlockDelta,
}

/// Delta payload; at most one field is set by the service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<ReasoningContentDelta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<ToolUseBlockDelta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningContentDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacted_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUseBlockDelta {
    /// Fragment of the tool input JSON text
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockStopEvent {
    #[serde(alias = "index")]
    pub content_block_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageStopEvent {
    pub stop_reason: StopReason,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_model_response_fields: Option<serde_json::Value>,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    GuardrailIntervened,
    ContentFiltered,
    Other(String),
}

impl From<String> for StopReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            "guardrail_intervened" => StopReason::GuardrailIntervened,
            "content_filtered" => StopReason::ContentFiltered,
            _ => StopReason::Other(value),
        }
    }
}

impl From<StopReason> for String {
    fn from(value: StopReason) -> Self {
        match value {
            StopReason::EndTurn => "end_turn".to_string(),
            StopReason::ToolUse => "tool_use".to_string(),
            StopReason::MaxTokens => "max_tokens".to_string(),
            StopReason::StopSequence => "stop_sequence".to_string(),
            StopReason::GuardrailIntervened => "guardrail_intervened".to_string(),
            StopReason::ContentFiltered => "content_filtered".to_string(),
            StopReason::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamErrorEvent {
    #[serde(default)]
    pub message: String,
}
