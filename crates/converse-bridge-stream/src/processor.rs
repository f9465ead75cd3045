//! Stream event processing
//!
//! Text and reasoning deltas go to the sink as they arrive; tool input deltas
//! go through the [`ToolCallReconstructor`]. Cancellation is observed before
//! every event. Per-stream state is reset when processing starts and again on
//! every exit, including the processing future being dropped.

use crate::reconstructor::{ToolCallReconstructor, report};
use converse_bridge_core::{
    Error, Result,
    chat::ResponsePart,
    converse::{ConverseStreamEvent, StopReason, TokenUsage},
    sink::ProgressSink,
    tool_names::ToolNameMap,
};
use futures::{Stream, StreamExt};
use std::ops::{Deref, DerefMut};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// Outcome of processing one stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub stop_reason: Option<StopReason>,
    pub usage: Option<TokenUsage>,
    /// Tool calls delivered to the sink
    pub tool_calls: usize,
    pub cancelled: bool,
}

#[derive(Debug)]
struct StreamState {
    reconstructor: ToolCallReconstructor,
    text_emitted: bool,
    tool_started: bool,
    summary: StreamSummary,
}

impl StreamState {
    fn reset(&mut self) {
        self.reconstructor.reset();
        self.text_emitted = false;
        self.tool_started = false;
        self.summary = StreamSummary::default();
    }

    fn is_idle(&self) -> bool {
        self.reconstructor.is_empty() && !self.text_emitted && !self.tool_started
    }

    fn handle(&mut self, event: ConverseStreamEvent, sink: &mut dyn ProgressSink) -> Result<()> {
        if let Some((kind, payload)) = event.as_exception() {
            return Err(Error::Stream {
                kind: kind.to_string(),
                message: payload.message.clone(),
            });
        }

        match event {
            ConverseStreamEvent::MessageStart(start) => {
                trace!(role = ?start.role, "Message start");
            }
            ConverseStreamEvent::ContentBlockStart(start) => {
                let index = start.content_block_index;
                if let Some(tool_use) = start.start.tool_use {
                    // Keep preceding text from running into the tool call
                    if self.text_emitted && !self.tool_started {
                        report(sink, ResponsePart::text(" "));
                    }
                    self.tool_started = true;
                    self.reconstructor.start_tool_call(
                        index,
                        Some(tool_use.tool_use_id),
                        Some(tool_use.name),
                    );
                }
            }
            ConverseStreamEvent::ContentBlockDelta(delta_event) => {
                let index = delta_event.content_block_index;
                let delta = delta_event.delta;

                if let Some(reasoning) = delta.reasoning_content {
                    if let Some(text) = reasoning.text.filter(|t| !t.is_empty()) {
                        report(sink, ResponsePart::Thinking { text });
                    }
                    if reasoning.signature.is_some() || reasoning.redacted_content.is_some() {
                        trace!(index, "Skipping reasoning signature");
                    }
                }

                if let Some(text) = delta.text.filter(|t| !t.is_empty()) {
                    report(sink, ResponsePart::Text { text });
                    self.text_emitted = true;
                }

                if let Some(tool_use) = delta.tool_use {
                    self.reconstructor.append_args(index, &tool_use.input);
                    if self.reconstructor.try_emit(index, sink, false) {
                        self.summary.tool_calls += 1;
                    }
                }
            }
            ConverseStreamEvent::ContentBlockStop(stop) => {
                if self
                    .reconstructor
                    .try_emit(stop.content_block_index, sink, true)
                {
                    self.summary.tool_calls += 1;
                }
            }
            ConverseStreamEvent::MessageStop(stop) => {
                self.summary.tool_calls += self.reconstructor.emit_all(sink);
                debug!(stop_reason = ?stop.stop_reason, "Message stop");
                self.summary.stop_reason = Some(stop.stop_reason);
                self.reconstructor.reset();
                self.text_emitted = false;
                self.tool_started = false;
            }
            ConverseStreamEvent::Metadata(metadata) => {
                if let Some(usage) = metadata.usage {
                    self.summary.usage = Some(usage);
                }
            }
            _ => {}
        }

        Ok(())
    }
}

/// Resets the wrapped state when dropped
struct ResetOnDrop<'a>(&'a mut StreamState);

impl Deref for ResetOnDrop<'_> {
    type Target = StreamState;

    fn deref(&self) -> &StreamState {
        self.0
    }
}

impl DerefMut for ResetOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut StreamState {
        self.0
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// Processes ConverseStream events for one model
#[derive(Debug)]
pub struct StreamEventProcessor {
    model_id: String,
    state: StreamState,
}

impl StreamEventProcessor {
    pub fn new(model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        Self {
            state: StreamState {
                reconstructor: ToolCallReconstructor::new(model_id.clone()),
                text_emitted: false,
                tool_started: false,
                summary: StreamSummary::default(),
            },
            model_id,
        }
    }

    /// Report tool calls under the caller's names instead of wire names
    pub fn with_tool_names(mut self, names: ToolNameMap) -> Self {
        let reconstructor = ToolCallReconstructor::new(self.model_id.clone()).with_tool_names(names);
        self.state.reconstructor = reconstructor;
        self
    }

    /// True when no per-stream state is held
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Consume `events`, delivering response parts to `sink` until the stream
    /// ends, an error occurs or `cancel` fires.
    #[instrument(skip_all, fields(model = %self.model_id))]
    pub async fn process<S>(
        &mut self,
        events: S,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary>
    where
        S: Stream<Item = Result<ConverseStreamEvent>>,
    {
        let mut state = ResetOnDrop(&mut self.state);
        state.reset();

        let mut events = std::pin::pin!(events);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Stream cancelled");
                    state.summary.cancelled = true;
                    break;
                }
                next = events.next() => next,
            };

            let Some(event) = next else {
                if !state.reconstructor.is_empty() {
                    debug!("Stream ended without message stop, flushing open tool calls");
                    let emitted = state.reconstructor.emit_all(sink);
                    state.summary.tool_calls += emitted;
                }
                break;
            };

            state.handle(event?, sink)?;
        }

        Ok(std::mem::take(&mut state.summary))
    }
}
