//! Per-model conversion policy
//!
//! Model families differ in what they accept inside a Converse request: whether
//! tool results may be structured JSON, whether `toolChoice` is honoured,
//! whether tool results may carry a status, whether images are accepted and
//! how extended reasoning is requested.

use converse_bridge_core::model_id::{model_vendor, strip_region_prefix};

/// How tool result content is sent back to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolResultFormat {
    /// `{"json": ...}` blocks when the result parses as JSON
    Json,
    /// Always `{"text": ...}`
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    pub tool_result_format: ToolResultFormat,
    pub supports_tool_choice: bool,
    pub supports_tool_result_status: bool,
    pub supports_images: bool,
    /// Reasoning is requested with an explicit `thinking` token budget
    pub supports_thinking_budget: bool,
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self {
            tool_result_format: ToolResultFormat::Text,
            supports_tool_choice: false,
            supports_tool_result_status: false,
            supports_images: true,
            supports_thinking_budget: false,
        }
    }
}

impl ModelProfile {
    /// Resolve the profile for a model or inference profile id
    pub fn for_model(model_id: &str) -> Self {
        let base = strip_region_prefix(model_id).to_ascii_lowercase();

        match model_vendor(&base) {
            "anthropic" => Self {
                tool_result_format: ToolResultFormat::Json,
                supports_tool_choice: true,
                supports_tool_result_status: true,
                supports_images: true,
                supports_thinking_budget: true,
            },
            "amazon" => Self {
                tool_result_format: ToolResultFormat::Json,
                supports_tool_choice: base.contains("nova"),
                supports_tool_result_status: false,
                supports_images: base.contains("nova") && !base.contains("micro"),
                supports_thinking_budget: false,
            },
            "mistral" => Self {
                supports_tool_choice: base.contains("mistral-large"),
                supports_images: base.contains("pixtral"),
                ..Self::default()
            },
            "meta" => Self {
                supports_images: base.contains("llama4")
                    || base.contains("11b")
                    || base.contains("90b"),
                ..Self::default()
            },
            "cohere" | "deepseek" | "openai" | "qwen" | "writer" => Self {
                supports_images: false,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}
