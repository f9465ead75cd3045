//! JSON schema sanitizing for tool input definitions
//!
//! Tool schemas arrive in whatever JSON-schema dialect the caller produced. The
//! Converse API accepts a small subset, so schemas are reduced to an allow-list
//! of keywords, composites are collapsed to a single branch and missing pieces
//! get defaults. Sanitizing never fails and is idempotent.

use serde_json::{Map, Value, json};

/// Keywords that survive sanitizing
const ALLOWED_KEYWORDS: &[&str] = &[
    "type",
    "properties",
    "required",
    "additionalProperties",
    "description",
    "enum",
    "default",
    "items",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "pattern",
    "format",
];

const COMPOSITE_KEYWORDS: &[&str] = &["anyOf", "oneOf", "allOf"];

const KNOWN_TYPES: &[&str] = &[
    "string", "number", "integer", "boolean", "object", "array", "null",
];

/// Property-name fragments that mark a numeric field as integer-valued
const INTEGER_NAME_MARKERS: &[&str] = &[
    "id", "limit", "count", "index", "size", "offset", "length", "page", "num",
];

const MAX_FUNCTION_NAME_LEN: usize = 64;

/// Sanitize a tool input schema.
///
/// `property_name` is the key this schema sits under in its parent's
/// `properties`, used to tighten `number` to `integer` for id-like fields.
pub fn sanitize_schema(schema: &Value, property_name: Option<&str>) -> Value {
    let Some(object) = schema.as_object() else {
        return empty_object_schema();
    };

    if let Some(branch) = pick_composite_branch(object) {
        let mut branch = branch.clone();
        if let (Some(branch_obj), Some(description)) =
            (branch.as_object_mut(), object.get("description"))
            && !branch_obj.contains_key("description")
        {
            branch_obj.insert("description".to_string(), description.clone());
        }
        return sanitize_schema(&branch, property_name);
    }

    let mut schema_type = resolve_type(object.get("type"));
    if schema_type == "number" && property_name.is_some_and(is_integer_like) {
        schema_type = "integer".to_string();
    }

    let mut out = Map::new();
    for key in ALLOWED_KEYWORDS {
        let Some(value) = object.get(*key) else {
            continue;
        };
        match *key {
            "description" | "pattern" | "format" if value.is_string() => {
                out.insert(key.to_string(), value.clone());
            }
            "minLength" | "maxLength" | "minimum" | "maximum" if value.is_number() => {
                out.insert(key.to_string(), value.clone());
            }
            "enum" if value.is_array() => {
                out.insert(key.to_string(), value.clone());
            }
            "default" => {
                out.insert(key.to_string(), value.clone());
            }
            _ => {}
        }
    }

    match schema_type.as_str() {
        "object" => {
            let properties = object
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, prop)| (name.clone(), sanitize_schema(prop, Some(name))))
                        .collect::<Map<_, _>>()
                })
                .unwrap_or_default();
            out.insert("properties".to_string(), Value::Object(properties));

            if let Some(required) = object.get("required").and_then(Value::as_array) {
                let required: Vec<Value> = required.iter().filter(|v| v.is_string()).cloned().collect();
                if !required.is_empty() {
                    out.insert("required".to_string(), Value::Array(required));
                }
            }

            if let Some(additional) = object.get("additionalProperties").filter(|v| v.is_boolean()) {
                out.insert("additionalProperties".to_string(), additional.clone());
            }
        }
        "array" => {
            let items = match object.get("items") {
                Some(Value::Array(tuple)) => tuple
                    .first()
                    .map(|first| sanitize_schema(first, property_name))
                    .unwrap_or_else(string_schema),
                Some(items @ Value::Object(_)) => sanitize_schema(items, property_name),
                _ => string_schema(),
            };
            out.insert("items".to_string(), items);
        }
        _ => {}
    }

    out.insert("type".to_string(), Value::String(schema_type));
    Value::Object(out)
}

/// Reduce a tool name to `[A-Za-z0-9_-]`, starting with a letter, at most 64 characters
pub fn sanitize_function_name(name: &str) -> String {
    let filtered: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if filtered.is_empty() {
        return "tool".to_string();
    }

    let prefixed = if filtered.starts_with(|c: char| c.is_ascii_alphabetic()) {
        filtered
    } else {
        format!("tool_{}", filtered)
    };

    let mut collapsed = String::with_capacity(prefixed.len());
    for c in prefixed.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    collapsed.truncate(MAX_FUNCTION_NAME_LEN);
    collapsed
}

fn pick_composite_branch(object: &Map<String, Value>) -> Option<&Value> {
    let branches = COMPOSITE_KEYWORDS
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_array))
        .find(|branches| !branches.is_empty())?;

    branches
        .iter()
        .find(|branch| branch.get("type").and_then(Value::as_str) == Some("string"))
        .or_else(|| branches.first())
}

fn resolve_type(value: Option<&Value>) -> String {
    let resolved = match value {
        Some(Value::String(t)) if KNOWN_TYPES.contains(&t.as_str()) => Some(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null" && KNOWN_TYPES.contains(t)),
        _ => None,
    };
    resolved.unwrap_or("object").to_string()
}

fn is_integer_like(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with("_id")
        || INTEGER_NAME_MARKERS
            .iter()
            .any(|marker| name.contains(marker))
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn string_schema() -> Value {
    json!({"type": "string"})
}
