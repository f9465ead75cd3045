//! ConverseBridge request conversion
//!
//! Turns a generic [`ChatRequest`](converse_bridge_core::chat::ChatRequest) into
//! the pieces of a Converse request:
//! - [`validate`]: structural checks run before anything else
//! - [`messages`]: message list and system blocks
//! - [`tools`]: tool configuration and tool-choice mode
//! - [`schema`]: JSON schema sanitizing for tool inputs
//! - [`profile`]: per-model conversion policy
//! - [`tokens`]: input token estimation

pub mod messages;
pub mod profile;
pub mod schema;
pub mod tokens;
pub mod tools;
pub mod validate;

pub use messages::{ConvertedMessages, MessageConverter};
pub use profile::{ModelProfile, ToolResultFormat};
pub use schema::{sanitize_function_name, sanitize_schema};
pub use tools::{PreparedTools, build_tool_config};
pub use validate::RequestValidator;
