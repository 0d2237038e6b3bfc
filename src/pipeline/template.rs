//! Sentinel substitution for handler templates.
//!
//! Templates reference their configuration through sentinel tokens of the
//! form `__PARAM_<KEY>__`, where `<KEY>` is upper-case words joined by single
//! underscores. Substitution rules:
//! - a single left-to-right pass; substituted text is never rescanned
//! - a sentinel is always read as the longest key the grammar allows, so a
//!   short key never matches inside a longer sentinel
//! - values are inserted as JSON literals, which are valid JS expressions

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

fn sentinel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"__PARAM_([A-Z0-9]+(?:_[A-Z0-9]+)*)__").expect("sentinel pattern is valid")
    })
}

/// Sentinel token for a parameter key.
pub fn sentinel(key: &str) -> String {
    format!("__PARAM_{}__", key.to_ascii_uppercase())
}

/// Whether `key` can be used as a sentinel key.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('_')
        && !key.ends_with('_')
        && !key.contains("__")
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Serialize a value as a literal safe to embed in JS source.
pub fn js_literal(value: &Value) -> String {
    value
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Keys of every sentinel referenced by `template`.
pub fn referenced_keys(template: &str) -> BTreeSet<String> {
    sentinel_pattern()
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replace every sentinel whose key is present in `values`.
///
/// `values` maps upper-case keys to already-serialized literals. Sentinels
/// without a value are left as they are.
pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> String {
    if values.is_empty() {
        return template.to_string();
    }
    sentinel_pattern()
        .replace_all(template, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(literal) => literal.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
