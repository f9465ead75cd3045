//! Error types for ConverseBridge Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Request rejections raised before dispatch
    #[error("Invalid tool name: {0}")]
    InvalidToolName(String),

    #[error("Tool call pairing violated: {0}")]
    ToolPairing(String),

    #[error("Invalid tool choice: {0}")]
    ToolChoice(String),

    #[error("Too many tools: {count} declared, at most {max} allowed")]
    TooManyTools { count: usize, max: usize },

    #[error("Token limit exceeded: estimated {estimated} input tokens, model accepts {limit}")]
    TokenLimitExceeded { estimated: usize, limit: usize },

    // Dispatch and streaming errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Stream error ({kind}): {message}")]
    Stream { kind: String, message: String },

    #[error("Progress sink error: {0}")]
    Sink(String),

    #[error("Capability catalog error: {0}")]
    Catalog(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors raised while validating a request, before anything is sent.
    pub fn is_request_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_)
                | Error::InvalidToolName(_)
                | Error::ToolPairing(_)
                | Error::ToolChoice(_)
                | Error::TooManyTools { .. }
                | Error::TokenLimitExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
