//! ConverseBridge Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout ConverseBridge:
//! - Generic chat request/response types
//! - Converse wire types (request body and stream events)
//! - Progress sink, transport and credential abstractions
//! - Core error types

pub mod chat;
pub mod converse;
pub mod error;
pub mod model_id;
pub mod sink;
pub mod tool_names;
pub mod transport;

pub use error::{Error, Result};
