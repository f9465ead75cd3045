//! Model identifier helpers
//!
//! Inference profile identifiers carry a routing prefix in front of the base
//! model id, e.g. `us.anthropic.claude-3-5-sonnet-20241022-v2:0`.

/// Known cross-region routing prefixes
const REGION_PREFIXES: &[&str] = &["us", "eu", "apac", "ap", "us-gov", "jp", "au", "ca", "global"];

/// Strip a leading region prefix token, if any
pub fn strip_region_prefix(model_id: &str) -> &str {
    match model_id.split_once('.') {
        Some((prefix, rest)) if REGION_PREFIXES.contains(&prefix.to_ascii_lowercase().as_str()) => {
            rest
        }
        _ => model_id,
    }
}

/// Model vendor, i.e. the first dotted token of the base id (`anthropic`, `meta`)
pub fn model_vendor(model_id: &str) -> &str {
    let base = strip_region_prefix(model_id);
    base.split_once('.').map(|(vendor, _)| vendor).unwrap_or(base)
}

/// Normalized form used for fuzzy matching against third-party catalogs:
/// region prefix removed, lowercased, `.` replaced by `-`
pub fn normalize_for_matching(model_id: &str) -> String {
    strip_region_prefix(model_id.trim())
        .to_lowercase()
        .replace('.', "-")
}
