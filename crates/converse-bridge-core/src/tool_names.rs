//! Mapping between caller tool names and the names sent on the wire

use std::collections::HashMap;

/// Wire name -> caller name for tools whose declared name had to be rewritten
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolNameMap {
    to_original: HashMap<String, String>,
    to_wire: HashMap<String, String>,
}

impl ToolNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `original` is sent as `wire`. Identity pairs are not stored.
    pub fn insert(&mut self, original: &str, wire: &str) {
        if original == wire {
            return;
        }
        self.to_original
            .insert(wire.to_string(), original.to_string());
        self.to_wire.insert(original.to_string(), wire.to_string());
    }

    /// Caller name for a name received from the model
    pub fn original<'a>(&'a self, wire: &'a str) -> &'a str {
        self.to_original.get(wire).map(String::as_str).unwrap_or(wire)
    }

    /// Wire name for a caller name
    pub fn wire<'a>(&'a self, original: &'a str) -> &'a str {
        self.to_wire.get(original).map(String::as_str).unwrap_or(original)
    }

    pub fn is_empty(&self) -> bool {
        self.to_original.is_empty()
    }
}
