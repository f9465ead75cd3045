//! ConverseBridge stream processing
//!
//! Consumes ConverseStream events and turns them into generic response parts:
//! - [`ToolCallReconstructor`]: rebuilds tool calls from incremental argument fragments
//! - [`StreamEventProcessor`]: drives a whole stream into a progress sink

pub mod processor;
pub mod reconstructor;

pub use processor::{StreamEventProcessor, StreamSummary};
pub use reconstructor::ToolCallReconstructor;
