//! Tool call reconstruction
//!
//! Tool arguments arrive as JSON text split across any number of deltas per
//! content block index. Each index buffers its fragments and emits a tool call
//! as soon as the buffer parses as a JSON object. Block and message stops force
//! a final attempt; a forced attempt that still fails is logged and dropped.
//! Identical calls (same name, same arguments) are emitted once per stream.

use converse_bridge_core::{
    chat::ResponsePart, sink::ProgressSink, tool_names::ToolNameMap,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Max characters of a failed argument buffer written to logs
const LOG_FRAGMENT_CHARS: usize = 200;

#[derive(Debug, Default)]
struct ToolCallBuffer {
    id: Option<String>,
    name: Option<String>,
    args: String,
}

#[derive(Debug)]
pub struct ToolCallReconstructor {
    model_id: String,
    names: ToolNameMap,
    buffers: HashMap<u32, ToolCallBuffer>,
    completed: HashSet<u32>,
    emitted_keys: HashSet<String>,
}

impl ToolCallReconstructor {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            names: ToolNameMap::new(),
            buffers: HashMap::new(),
            completed: HashSet::new(),
            emitted_keys: HashSet::new(),
        }
    }

    /// Translate wire tool names back to caller names on emission
    pub fn with_tool_names(mut self, names: ToolNameMap) -> Self {
        self.names = names;
        self
    }

    /// Register the tool call announced by a block start
    pub fn start_tool_call(&mut self, index: u32, id: Option<String>, name: Option<String>) {
        if self.completed.contains(&index) {
            trace!(index, "Ignoring start for completed tool call block");
            return;
        }
        let buffer = self.buffers.entry(index).or_default();
        buffer.id = id.or(buffer.id.take());
        buffer.name = name.or(buffer.name.take());
    }

    /// Append an argument fragment for a block
    pub fn append_args(&mut self, index: u32, fragment: &str) {
        if self.completed.contains(&index) {
            trace!(index, "Ignoring arguments for completed tool call block");
            return;
        }
        self.buffers
            .entry(index)
            .or_default()
            .args
            .push_str(fragment);
    }

    /// Try to emit the tool call buffered at `index`.
    ///
    /// Returns true when a tool call was delivered to the sink.
    pub fn try_emit(&mut self, index: u32, sink: &mut dyn ProgressSink, force: bool) -> bool {
        if self.completed.contains(&index) {
            return false;
        }
        let Some(buffer) = self.buffers.get(&index) else {
            return false;
        };

        let Some(input) = parse_arguments(&buffer.args, force) else {
            if force {
                warn!(
                    model = %self.model_id,
                    index,
                    fragment = %truncate(&buffer.args, LOG_FRAGMENT_CHARS),
                    "Dropping tool call with unparseable arguments"
                );
                self.finish(index);
            }
            return false;
        };

        let Some(wire_name) = buffer.name.clone() else {
            if force {
                warn!(model = %self.model_id, index, "Dropping tool call without a name");
                self.finish(index);
            }
            return false;
        };

        let id = buffer.id.clone();
        self.finish(index);

        let name = self.names.original(&wire_name).to_string();
        let key = format!("{}:{}", name, canonical_json(&input));
        if !self.emitted_keys.insert(key) {
            trace!(model = %self.model_id, index, tool = %name, "Discarding duplicate tool call");
            return false;
        }

        let id = id.unwrap_or_else(generate_tool_call_id);
        debug!(model = %self.model_id, index, tool = %name, id = %id, "Emitting tool call");
        report(sink, ResponsePart::ToolCall { id, name, input })
    }

    /// Force emission of every open block, lowest index first. Returns the number emitted.
    pub fn emit_all(&mut self, sink: &mut dyn ProgressSink) -> usize {
        let mut indices: Vec<u32> = self.buffers.keys().copied().collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .filter(|index| self.try_emit(*index, sink, true))
            .count()
    }

    /// True when no block is buffered
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Drop all buffers, completion marks and dedup keys
    pub fn reset(&mut self) {
        self.buffers.clear();
        self.completed.clear();
        self.emitted_keys.clear();
    }

    fn finish(&mut self, index: u32) {
        self.buffers.remove(&index);
        self.completed.insert(index);
    }
}

/// Deliver a part, logging sink failures instead of propagating them
pub(crate) fn report(sink: &mut dyn ProgressSink, part: ResponsePart) -> bool {
    match sink.report(part) {
        Ok(()) => true,
        Err(e) => {
            warn!("Progress sink rejected response part: {}", e);
            false
        }
    }
}

fn parse_arguments(args: &str, force: bool) -> Option<Value> {
    let raw = args.trim();
    if raw.is_empty() {
        // Argument-less tools may never send input
        return force.then(|| Value::Object(Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn generate_tool_call_id() -> String {
    format!("tooluse_{}", Uuid::new_v4().simple())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// JSON text with object keys sorted at every level
fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converse_bridge_core::{Error, Result};
    use proptest::prelude::*;
    use serde_json::json;

    fn tool_calls(parts: &[ResponsePart]) -> Vec<(&str, &str, &Value)> {
        parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::ToolCall { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_emits_once_arguments_parse() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(0, Some("a".into()), Some("calc".into()));

        rec.append_args(0, "{\"op\":\"add\",");
        assert!(!rec.try_emit(0, &mut sink, false));
        assert!(sink.is_empty());

        rec.append_args(0, "\"a\":1,\"b\":2}");
        assert!(rec.try_emit(0, &mut sink, false));
        assert_eq!(
            tool_calls(&sink),
            vec![("a", "calc", &json!({"op": "add", "a": 1, "b": 2}))]
        );

        // Stop after emission is a no-op
        assert!(!rec.try_emit(0, &mut sink, true));
        rec.append_args(0, "garbage");
        assert_eq!(sink.len(), 1);
        assert!(rec.is_empty());
    }

    #[test]
    fn test_forced_failure_drops_call() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(2, Some("b".into()), Some("calc".into()));
        rec.append_args(2, "{\"op\":");

        assert!(!rec.try_emit(2, &mut sink, true));
        assert!(sink.is_empty());
        assert!(rec.is_empty());

        rec.append_args(2, "\"add\"}");
        assert!(!rec.try_emit(2, &mut sink, true));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_non_object_arguments_are_not_emitted() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(0, Some("a".into()), Some("calc".into()));
        rec.append_args(0, "[1, 2]");

        assert!(!rec.try_emit(0, &mut sink, false));
        assert!(!rec.try_emit(0, &mut sink, true));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_arguments_on_forced_emission() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(0, Some("t".into()), Some("now".into()));

        assert!(!rec.try_emit(0, &mut sink, false));
        assert!(rec.try_emit(0, &mut sink, true));
        assert_eq!(tool_calls(&sink), vec![("t", "now", &json!({}))]);
    }

    #[test]
    fn test_duplicates_across_indices_are_dropped() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(0, Some("a".into()), Some("search".into()));
        rec.start_tool_call(1, Some("b".into()), Some("search".into()));
        rec.append_args(0, "{\"q\":\"x\",\"n\":{\"a\":1,\"b\":2}}");
        rec.append_args(1, "{\"n\":{\"b\":2,\"a\":1},\"q\":\"x\"}");

        assert_eq!(rec.emit_all(&mut sink), 1);
        assert_eq!(tool_calls(&sink).len(), 1);
        assert_eq!(tool_calls(&sink)[0].0, "a");
    }

    #[test]
    fn test_same_arguments_different_tools_both_emit() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(0, None, Some("read".into()));
        rec.start_tool_call(1, None, Some("write".into()));
        rec.append_args(0, "{\"path\":\"a\"}");
        rec.append_args(1, "{\"path\":\"a\"}");

        assert_eq!(rec.emit_all(&mut sink), 2);
    }

    #[test]
    fn test_missing_id_is_generated() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(0, None, Some("calc".into()));
        rec.append_args(0, "{}");
        assert!(rec.try_emit(0, &mut sink, false));

        let (id, _, _) = tool_calls(&sink)[0];
        assert!(id.starts_with("tooluse_"));
        assert!(id.len() > "tooluse_".len());
    }

    #[test]
    fn test_nameless_buffer_is_dropped_when_forced() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        rec.append_args(3, "{\"a\":1}");

        assert!(!rec.try_emit(3, &mut sink, false));
        assert!(!rec.is_empty());
        assert!(!rec.try_emit(3, &mut sink, true));
        assert!(rec.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_names_are_mapped_back() {
        let mut names = ToolNameMap::new();
        names.insert("1lookup", "tool_1lookup");

        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model").with_tool_names(names);
        rec.start_tool_call(0, Some("a".into()), Some("tool_1lookup".into()));
        rec.append_args(0, "{}");
        rec.try_emit(0, &mut sink, false);

        assert_eq!(tool_calls(&sink)[0].1, "1lookup");
    }

    #[test]
    fn test_reset_clears_dedup_keys() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let mut rec = ToolCallReconstructor::new("model");
        for _ in 0..2 {
            rec.start_tool_call(0, None, Some("calc".into()));
            rec.append_args(0, "{\"x\":1}");
            assert!(rec.try_emit(0, &mut sink, false));
            rec.reset();
        }
        assert_eq!(sink.len(), 2);
    }

    struct FailingSink;

    impl ProgressSink for FailingSink {
        fn report(&mut self, _part: ResponsePart) -> Result<()> {
            Err(Error::Sink("closed".to_string()))
        }
    }

    #[test]
    fn test_sink_failure_is_not_fatal() {
        let mut sink = FailingSink;
        let mut rec = ToolCallReconstructor::new("model");
        rec.start_tool_call(0, None, Some("calc".into()));
        rec.append_args(0, "{}");

        assert!(!rec.try_emit(0, &mut sink, false));
        assert!(rec.is_empty());
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        assert_eq!(
            canonical_json(&json!({"b": [{"z": 1, "y": 2}], "a": "x"})),
            r#"{"a":"x","b":[{"y":2,"z":1}]}"#
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    fn arb_object() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z {}\\[\\]:,\"]{0,12}".prop_map(Value::String),
            Just(Value::Null),
        ];
        let value = leaf.prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        });
        prop::collection::btree_map("[a-z_]{1,8}", value, 0..6)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn prop_any_split_yields_one_call(
            object in arb_object(),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let text = object.to_string();
            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(text.len() + 1)).collect();
            points.push(0);
            points.push(text.len());
            points.sort_unstable();
            points.dedup();

            let mut sink: Vec<ResponsePart> = Vec::new();
            let mut rec = ToolCallReconstructor::new("model");
            rec.start_tool_call(0, Some("id".into()), Some("tool".into()));
            for window in points.windows(2) {
                rec.append_args(0, &text[window[0]..window[1]]);
                rec.try_emit(0, &mut sink, false);
            }
            rec.try_emit(0, &mut sink, true);

            let calls = tool_calls(&sink);
            prop_assert_eq!(calls.len(), 1);
            prop_assert_eq!(calls[0].2, &object);
        }
    }
}
