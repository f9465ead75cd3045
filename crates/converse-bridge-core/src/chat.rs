//! Generic chat types
//!
//! These types describe a multi-turn, tool-calling conversation independently of
//! the wire protocol used to execute it. Content parts are an explicit tagged
//! union constructed at the boundary; nothing downstream inspects shapes to guess
//! what a part is.

use serde::{Deserialize, Serialize};

/// A chat request as handed to the adapter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Vendor model identifier, possibly carrying a region prefix (`us.`, `eu.`)
    pub model_id: String,

    /// Ordered conversation history
    pub messages: Vec<ChatMessage>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,

    /// Whether the model may answer freely or must call the single declared tool
    #[serde(default)]
    pub tool_mode: ToolMode,

    /// Sampling and length options
    #[serde(default)]
    pub options: ModelOptions,
}

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(ChatRole::System, vec![ContentPart::text(text)])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, vec![ContentPart::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, vec![ContentPart::text(text)])
    }

    /// True when the message carries at least one part and every part is a tool result
    pub fn is_tool_results_only(&self) -> bool {
        !self.parts.is_empty()
            && self
                .parts
                .iter()
                .all(|part| matches!(part, ContentPart::ToolResult { .. }))
    }

    pub fn has_tool_results(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, ContentPart::ToolResult { .. }))
    }

    /// Tool calls carried by this message, in order
    pub fn tool_calls(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        self.parts.iter().filter_map(|part| match part {
            ContentPart::ToolCall {
                call_id,
                name,
                input,
            } => Some((call_id.as_str(), name.as_str(), input)),
            _ => None,
        })
    }
}

/// Content part of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        format: ImageFormat,
        /// Raw image bytes, base64 encoded in serialized form
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    ToolCall {
        call_id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        call_id: String,
        content: Vec<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn tool_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        ContentPart::ToolCall {
            call_id: call_id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentPart::ToolResult {
            call_id: call_id.into(),
            content: vec![content.into()],
            is_error: false,
        }
    }
}

/// Image encodings accepted by the vendor protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Parse a MIME type (`image/png`) or bare extension (`jpg`)
    pub fn from_mime(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        let subtype = value.strip_prefix("image/").unwrap_or(&value);
        match subtype {
            "png" => Some(ImageFormat::Png),
            "jpeg" | "jpg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Tool declaration supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arbitrary JSON schema for the tool input
    #[serde(default)]
    pub input_schema: serde_json::Value,
}

/// Tool-choice mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    /// The model decides whether to call a tool
    #[default]
    Auto,
    /// The model must call the single declared tool
    Required,
}

/// Sampling and length options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Request extended reasoning when the model supports it; `None` follows configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<bool>,
}

/// Incremental response part delivered to a progress sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePart {
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    Thinking {
        text: String,
    },
}

impl ResponsePart {
    pub fn text(text: impl Into<String>) -> Self {
        ResponsePart::Text { text: text.into() }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        ResponsePart::Thinking { text: text.into() }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
