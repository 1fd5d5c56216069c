//! Value helpers shared by extraction and injection.
//!
//! Values are `serde_json::Value`; mappings keep insertion order.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Reserved key holding per-key match counts in a full extraction.
pub const COUNTS_KEY: &str = "valuesCounts";

/// Delimiter that marks a string value as a list of members.
pub const SPLIT_DELIMITER: char = ',';

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Render a value as the plain string a node would display.
///
/// - null is the empty string
/// - arrays join their entries with `,`
/// - mappings join their non-empty leaves with a space, in mapping order
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(to_text)
            .collect::<Vec<_>>()
            .join(&SPLIT_DELIMITER.to_string()),
        Value::Object(map) => map
            .values()
            .map(to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Compare a node's string value against a bound value.
///
/// Scalars compare by their text form, so `"42"` matches `42`.
/// Null never matches.
pub fn text_matches(node_value: &str, value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(_) => false,
        other => node_value == to_text(other),
    }
}

/// True when `text` equals any of `members`.
pub fn is_member(text: &str, members: &[Value]) -> bool {
    members.iter().any(|m| text_matches(text, m))
}

/// Heuristic markup detection: a `<` followed later by a `>`.
pub fn looks_like_markup(s: &str) -> bool {
    match s.find('<') {
        Some(open) => s[open..].contains('>'),
        None => false,
    }
}

/// A non-empty array whose non-null entries are all mappings.
pub fn as_rows(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items)
            if items.iter().any(Value::is_object)
                && items.iter().all(|v| v.is_object() || v.is_null()) =>
        {
            Some(items.as_slice())
        }
        _ => None,
    }
}

/// Drop markup tags, keeping the text between them.
pub fn strip_tags(markup: &str) -> Cow<'_, str> {
    TAG_RE.replace_all(markup, "")
}

/// Escape text for inclusion in rendered markup.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Copy of `values` without the reserved counts entry.
pub fn without_counts(values: &Map<String, Value>) -> Map<String, Value> {
    values
        .iter()
        .filter(|(k, _)| k.as_str() != COUNTS_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_scalars_when_rendering_text_then_matches_display_form() {
        assert_eq!(to_text(&json!(null)), "");
        assert_eq!(to_text(&json!("a")), "a");
        assert_eq!(to_text(&json!(42)), "42");
        assert_eq!(to_text(&json!(true)), "true");
        assert_eq!(to_text(&json!(["a", 1, null])), "a,1,");
    }

    #[test]
    fn given_mapping_when_rendering_text_then_joins_leaves_with_space() {
        let value = json!({"b": "b", "c": {"d": "d"}, "e": ""});
        assert_eq!(to_text(&value), "b d");
    }

    #[test]
    fn given_number_when_matching_text_then_compares_loosely() {
        assert!(text_matches("42", &json!(42)));
        assert!(text_matches("on", &json!("on")));
        assert!(!text_matches("", &json!(null)));
        assert!(is_member("b", &[json!("a"), json!("b")]));
    }

    #[test]
    fn given_strings_when_detecting_markup_then_requires_open_before_close() {
        assert!(looks_like_markup("<b>bold</b>"));
        assert!(looks_like_markup("a < b > c"));
        assert!(!looks_like_markup("a > b < c"));
        assert!(!looks_like_markup("plain"));
    }

    #[test]
    fn given_arrays_when_checking_rows_then_requires_mappings() {
        assert!(as_rows(&json!([{"f": "x"}, null, {"f": "y"}])).is_some());
        assert!(as_rows(&json!([{"f": "x"}, "y"])).is_none());
        assert!(as_rows(&json!([null])).is_none());
        assert!(as_rows(&json!([])).is_none());
        assert!(as_rows(&json!({"f": "x"})).is_none());
    }

    #[test]
    fn given_markup_when_stripping_then_keeps_text() {
        assert_eq!(strip_tags("<b>bold</b> text"), "bold text");
        assert_eq!(escape("a<b"), "a&lt;b");
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
    }
}
