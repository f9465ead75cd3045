//! Structural request validation
//!
//! Runs before conversion; every check here rejects the request without any
//! network interaction.

use converse_bridge_core::{
    Error, Result,
    chat::{ChatMessage, ChatRequest, ChatRole, ContentPart, ToolMode},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Maximum number of tool declarations accepted by the Converse API
pub const MAX_TOOLS: usize = 128;

static TOOL_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

#[derive(Debug, Clone)]
pub struct RequestValidator {
    max_tools: usize,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self {
            max_tools: MAX_TOOLS,
        }
    }
}

impl RequestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tools(mut self, max_tools: usize) -> Self {
        self.max_tools = max_tools;
        self
    }

    /// Validate tool declarations and message structure
    pub fn validate(&self, request: &ChatRequest) -> Result<()> {
        self.validate_tools(request)?;
        validate_messages(&request.messages)
    }

    fn validate_tools(&self, request: &ChatRequest) -> Result<()> {
        if request.tools.len() > self.max_tools {
            return Err(Error::TooManyTools {
                count: request.tools.len(),
                max: self.max_tools,
            });
        }

        if request.tool_mode == ToolMode::Required && request.tools.len() > 1 {
            return Err(Error::ToolChoice(format!(
                "required tool mode needs exactly one tool, got {}",
                request.tools.len()
            )));
        }

        let mut seen = HashSet::new();
        for tool in &request.tools {
            validate_tool_name(&tool.name)?;
            if !seen.insert(tool.name.as_str()) {
                return Err(Error::InvalidToolName(format!(
                    "tool '{}' is declared more than once",
                    tool.name
                )));
            }
        }

        Ok(())
    }
}

/// Check a tool name against the allowed character set
pub fn validate_tool_name(name: &str) -> Result<()> {
    if TOOL_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidToolName(format!(
            "'{}' must match [A-Za-z0-9_-]+",
            name
        )))
    }
}

/// Check tool call / tool result pairing across the whole history.
///
/// Every tool call of an assistant turn must be answered by tool results in the
/// user message(s) directly after it, before any other content and before the
/// next assistant turn.
pub fn validate_messages(messages: &[ChatMessage]) -> Result<()> {
    if !messages.iter().any(|m| m.role != ChatRole::System) {
        return Err(Error::InvalidRequest(
            "conversation has no user or assistant messages".to_string(),
        ));
    }

    // Outstanding call ids, in the order they were issued
    let mut pending: Vec<&str> = Vec::new();

    for (position, message) in messages.iter().enumerate() {
        match message.role {
            ChatRole::Assistant => {
                if let Some(id) = pending.first() {
                    return Err(Error::ToolPairing(format!(
                        "message {}: assistant turn starts while tool call '{}' is unanswered",
                        position, id
                    )));
                }
                for part in &message.parts {
                    match part {
                        ContentPart::ToolCall { call_id, name, .. } => {
                            validate_tool_name(name)?;
                            if pending.contains(&call_id.as_str()) {
                                return Err(Error::ToolPairing(format!(
                                    "message {}: duplicate tool call id '{}'",
                                    position, call_id
                                )));
                            }
                            pending.push(call_id);
                        }
                        ContentPart::ToolResult { call_id, .. } => {
                            return Err(Error::ToolPairing(format!(
                                "message {}: tool result '{}' in an assistant message",
                                position, call_id
                            )));
                        }
                        _ => {}
                    }
                }
            }
            ChatRole::User => {
                for part in &message.parts {
                    match part {
                        ContentPart::ToolResult { call_id, .. } => {
                            let Some(slot) = pending.iter().position(|id| *id == call_id.as_str()) else {
                                return Err(Error::ToolPairing(format!(
                                    "message {}: tool result '{}' has no matching tool call",
                                    position, call_id
                                )));
                            };
                            pending.remove(slot);
                        }
                        ContentPart::ToolCall { call_id, .. } => {
                            return Err(Error::ToolPairing(format!(
                                "message {}: tool call '{}' in a user message",
                                position, call_id
                            )));
                        }
                        _ => {
                            if let Some(id) = pending.first() {
                                return Err(Error::ToolPairing(format!(
                                    "message {}: content interleaved before result for tool call '{}'",
                                    position, id
                                )));
                            }
                        }
                    }
                }
            }
            ChatRole::System => {
                if let Some(id) = pending.first() {
                    return Err(Error::ToolPairing(format!(
                        "message {}: system message while tool call '{}' is unanswered",
                        position, id
                    )));
                }
            }
        }
    }

    match pending.first() {
        Some(id) => Err(Error::ToolPairing(format!(
            "tool call '{}' is never answered",
            id
        ))),
        None => Ok(()),
    }
}
