//! Message conversion
//!
//! Maps the generic conversation onto Converse messages and system blocks in a
//! single forward pass. Tool results are gathered in a [`ToolResultBatch`] and
//! emitted as one user message once the conversation moves past them.

use crate::profile::{ModelProfile, ToolResultFormat};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use converse_bridge_core::{
    chat::{ChatMessage, ChatRole, ContentPart},
    converse::{
        ContentBlock, ConversationRole, ImageBlock, ImageSource, Message, SystemContentBlock,
        ToolResultBlock, ToolResultContentBlock, ToolResultStatus, ToolUseBlock,
    },
    tool_names::ToolNameMap,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Result of converting a conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedMessages {
    pub messages: Vec<Message>,
    pub system: Vec<SystemContentBlock>,
}

/// Pending tool results between an assistant turn and the next non-result message
#[derive(Debug, Default)]
enum ToolResultBatch {
    #[default]
    Flushed,
    Open(Vec<ContentBlock>),
}

impl ToolResultBatch {
    fn push(&mut self, block: ContentBlock) {
        match self {
            ToolResultBatch::Flushed => *self = ToolResultBatch::Open(vec![block]),
            ToolResultBatch::Open(blocks) => blocks.push(block),
        }
    }

    fn take(&mut self) -> Option<Vec<ContentBlock>> {
        match std::mem::take(self) {
            ToolResultBatch::Open(blocks) => Some(blocks),
            ToolResultBatch::Flushed => None,
        }
    }
}

pub struct MessageConverter<'a> {
    profile: &'a ModelProfile,
    names: &'a ToolNameMap,
}

impl<'a> MessageConverter<'a> {
    pub fn new(profile: &'a ModelProfile, names: &'a ToolNameMap) -> Self {
        Self { profile, names }
    }

    /// Convert a validated conversation
    pub fn convert(&self, messages: &[ChatMessage]) -> ConvertedMessages {
        let mut out = ConvertedMessages::default();
        let mut batch = ToolResultBatch::Flushed;

        for message in messages {
            if message.role == ChatRole::System {
                self.convert_system(message, &mut out.system);
                continue;
            }

            let mut text = String::new();
            let mut images = Vec::new();
            let mut tool_uses = Vec::new();

            for part in &message.parts {
                match part {
                    ContentPart::Text { text: t } => text.push_str(t),
                    ContentPart::Image { format, data } => {
                        if self.profile.supports_images {
                            images.push(ContentBlock::Image(ImageBlock {
                                format: *format,
                                source: ImageSource::Bytes(STANDARD.encode(data)),
                            }));
                        } else {
                            warn!("Dropping {} image: model does not accept images", format.as_str());
                        }
                    }
                    ContentPart::ToolCall {
                        call_id,
                        name,
                        input,
                    } => tool_uses.push(ContentBlock::ToolUse(ToolUseBlock {
                        tool_use_id: call_id.clone(),
                        name: self.names.wire(name).to_string(),
                        input: tool_input(input),
                    })),
                    ContentPart::ToolResult {
                        call_id,
                        content,
                        is_error,
                    } => batch.push(self.tool_result_block(call_id, content, *is_error)),
                }
            }

            if message.is_tool_results_only() {
                continue;
            }

            let pending = batch.take();
            let mut content = Vec::new();

            // Only a user message carrying results of its own shares a message with the batch
            if message.role == ChatRole::User && message.has_tool_results() {
                content.extend(pending.unwrap_or_default());
            } else if let Some(results) = pending {
                push_message(&mut out.messages, ConversationRole::User, results);
            }

            if !text.trim().is_empty() {
                content.push(ContentBlock::Text(text));
            }
            content.extend(images);
            if message.role == ChatRole::Assistant {
                content.extend(tool_uses);
            }

            let role = match message.role {
                ChatRole::Assistant => ConversationRole::Assistant,
                _ => ConversationRole::User,
            };
            push_message(&mut out.messages, role, content);
        }

        if let Some(results) = batch.take() {
            push_message(&mut out.messages, ConversationRole::User, results);
        }

        out
    }

    fn convert_system(&self, message: &ChatMessage, system: &mut Vec<SystemContentBlock>) {
        let text: String = message
            .parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if message.parts.iter().any(|p| !matches!(p, ContentPart::Text { .. })) {
            debug!("Ignoring non-text parts in system message");
        }
        if !text.trim().is_empty() {
            system.push(SystemContentBlock { text });
        }
    }

    fn tool_result_block(&self, call_id: &str, content: &[String], is_error: bool) -> ContentBlock {
        let text = content.concat();

        let block = match self.profile.tool_result_format {
            ToolResultFormat::Text => ToolResultContentBlock::Text(text),
            ToolResultFormat::Json => match serde_json::from_str::<Value>(&text) {
                Ok(value @ Value::Object(_)) => ToolResultContentBlock::Json(value),
                Ok(value) => ToolResultContentBlock::Json(json!({ "result": value })),
                Err(e) => {
                    debug!(
                        "Tool result '{}' is not JSON ({}), sending as text",
                        call_id, e
                    );
                    ToolResultContentBlock::Text(text)
                }
            },
        };

        let status = (is_error && self.profile.supports_tool_result_status)
            .then_some(ToolResultStatus::Error);

        ContentBlock::ToolResult(ToolResultBlock {
            tool_use_id: call_id.to_string(),
            content: vec![block],
            status,
        })
    }
}

/// Tool inputs must be JSON objects on the wire
fn tool_input(input: &Value) -> Value {
    match input {
        Value::Null => json!({}),
        other => other.clone(),
    }
}

fn push_message(messages: &mut Vec<Message>, role: ConversationRole, content: Vec<ContentBlock>) {
    if content.is_empty() {
        debug!("Skipping {:?} message with no convertible content", role);
        return;
    }
    messages.push(Message { role, content });
}

#[cfg(test)]
mod tests;
