//! ConverseBridge
//!
//! Adapts generic tool-calling chat requests to the Bedrock Converse streaming
//! protocol and turns the resulting event stream back into response parts.
//!
//! [`ChatAdapter`] ties the pieces together:
//! 1. validate the request
//! 2. convert messages and tool declarations
//! 3. apply inference limits and reasoning settings from the capability catalog
//! 4. reject requests whose estimated input exceeds the model's limit
//! 5. dispatch through a [`ConverseTransport`] and stream parts to a [`ProgressSink`]

pub mod adapter;
pub mod config;
pub mod logging;

pub use adapter::{ChatAdapter, PreparedRequest};
pub use config::BridgeConfig;
pub use logging::init_logging;

pub use converse_bridge_capabilities::CapabilityResolver;
pub use converse_bridge_core::{
    Error, Result,
    chat::{ChatMessage, ChatRequest, ContentPart, ResponsePart},
    sink::ProgressSink,
    transport::{ConverseTransport, Credentials},
};
pub use converse_bridge_stream::StreamSummary;
