//! Input token estimation
//!
//! A character-count heuristic: close enough to reject requests that clearly
//! exceed a model's context window before they are sent.

use converse_bridge_core::converse::{
    ContentBlock, ConverseRequest, ToolResultContentBlock,
};

const CHARS_PER_TOKEN: usize = 4;

/// Flat cost charged per image
pub const IMAGE_TOKENS: usize = 1_600;

/// Per-message framing overhead
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Estimate tokens for a plain string
pub fn estimate_text_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate the input tokens of a full request: messages, system blocks and tool specs
pub fn estimate_request_tokens(request: &ConverseRequest) -> usize {
    let system: usize = request
        .system
        .iter()
        .map(|block| estimate_text_tokens(&block.text))
        .sum();

    let messages: usize = request
        .messages
        .iter()
        .map(|message| {
            MESSAGE_OVERHEAD_TOKENS
                + message
                    .content
                    .iter()
                    .map(estimate_block_tokens)
                    .sum::<usize>()
        })
        .sum();

    let tools = request
        .tool_config
        .as_ref()
        .map(|config| {
            serde_json::to_string(&config.tools)
                .map(|serialized| estimate_text_tokens(&serialized))
                .unwrap_or_default()
        })
        .unwrap_or_default();

    system + messages + tools
}

fn estimate_block_tokens(block: &ContentBlock) -> usize {
    match block {
        ContentBlock::Text(text) => estimate_text_tokens(text),
        ContentBlock::Image(_) => IMAGE_TOKENS,
        ContentBlock::ToolUse(tool_use) => {
            estimate_text_tokens(&tool_use.name) + estimate_text_tokens(&tool_use.input.to_string())
        }
        ContentBlock::ToolResult(result) => result
            .content
            .iter()
            .map(|content| match content {
                ToolResultContentBlock::Text(text) => estimate_text_tokens(text),
                ToolResultContentBlock::Json(value) => estimate_text_tokens(&value.to_string()),
            })
            .sum(),
    }
}
