//! End-to-end integration tests for ConverseBridge
//!
//! The tests under `tests/` drive [`converse_bridge::ChatAdapter`] with a
//! scripted transport and a mocked capability catalog to verify the full
//! request flow: validation, conversion, dispatch and stream processing.
