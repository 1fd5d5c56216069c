//! Nested reconciliation for nest-only extraction
//!
//! Every key that appears inside a nested mapping is removed from each
//! enclosing mapping, so each value has a single home. The entry a walk
//! descended through is never removed from its own mapping.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::trace;

use crate::domain::COUNTS_KEY;

/// One enclosing mapping on the walk.
#[derive(Default)]
struct Frame {
    doomed: HashSet<String>,
    /// Key of the entry currently being descended into
    via: Option<String>,
}

/// Strip flat copies of nested entries from `values`, depth first.
pub fn reconcile(values: &mut Map<String, Value>) {
    let mut ancestors: Vec<Frame> = Vec::new();
    strip_nested(values, &mut ancestors);
}

fn strip_nested(map: &mut Map<String, Value>, ancestors: &mut Vec<Frame>) {
    ancestors.push(Frame::default());
    for (key, value) in map.iter_mut() {
        if key == COUNTS_KEY {
            continue;
        }
        if let Some(frame) = ancestors.last_mut() {
            frame.via = Some(key.clone());
        }
        match value {
            Value::Object(sub) => visit(sub, ancestors),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(sub) = item {
                        visit(sub, ancestors);
                    }
                }
            }
            _ => {}
        }
    }

    let doomed = ancestors.pop().map(|frame| frame.doomed).unwrap_or_default();
    if !doomed.is_empty() {
        trace!("reconcile: removing {} flat keys", doomed.len());
        map.retain(|key, _| !doomed.contains(key));
    }
}

fn visit(sub: &mut Map<String, Value>, ancestors: &mut Vec<Frame>) {
    strip_nested(sub, ancestors);
    for key in sub.keys() {
        if key == COUNTS_KEY {
            continue;
        }
        for frame in ancestors.iter_mut() {
            if frame.via.as_deref() != Some(key.as_str()) {
                frame.doomed.insert(key.clone());
            }
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reconciled(value: Value) -> Value {
        let Value::Object(mut map) = value else {
            panic!("expected mapping");
        };
        reconcile(&mut map);
        Value::Object(map)
    }

    #[test]
    fn given_nested_leaf_when_reconciling_then_flat_copy_removed() {
        let out = reconciled(json!({"a": {"b": "1"}, "b": "1", "c": "2"}));
        assert_eq!(out, json!({"a": {"b": "1"}, "c": "2"}));
    }

    #[test]
    fn given_deep_nesting_when_reconciling_then_every_ancestor_is_cleaned() {
        let out = reconciled(json!({
            "a": {"b": {"c": "1"}, "c": "1"},
            "c": "1",
            "d": "x"
        }));
        assert_eq!(out, json!({"a": {"b": {"c": "1"}}, "d": "x"}));
    }

    #[test]
    fn given_rows_when_reconciling_then_walks_array_elements() {
        let out = reconciled(json!({
            "rows": [{"f": "x"}, {"f": "y"}],
            "f": ["x", "y"]
        }));
        assert_eq!(out, json!({"rows": [{"f": "x"}, {"f": "y"}]}));
    }

    #[test]
    fn given_nested_mapping_with_flat_copy_when_reconciling_then_flat_mapping_removed() {
        let out = reconciled(json!({
            "a": {"b": "b", "c": {"d": "d"}, "d": "d"},
            "b": "b",
            "c": {"d": "d"},
            "d": "d"
        }));
        assert_eq!(out, json!({"a": {"b": "b", "c": {"d": "d"}}}));
    }

    #[test]
    fn given_container_named_like_its_child_when_reconciling_then_container_kept() {
        let out = reconciled(json!({"a": {"a": "1"}}));
        assert_eq!(out, json!({"a": {"a": "1"}}));
    }
}
