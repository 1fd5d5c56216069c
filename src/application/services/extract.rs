//! Value extraction
//!
//! Reads each field by kind and folds the per-node results of a key into
//! one value: a scalar when they all agree, an array otherwise.

use serde_json::{Map, Value};
use tracing::{debug, instrument, trace, warn};

use crate::application::options::{Options, UncheckedPolicy};
use crate::application::services::collect::{collect_keys, has_descendant_fields, resolve_fields};
use crate::application::services::reconcile::reconcile;
use crate::domain::{ChoiceMode, ChoiceOption, InputKind, NodeId, NodeKind, COUNTS_KEY};
use crate::infrastructure::traits::NodeTree;

/// Consolidated value of one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    /// Number of nodes that contributed a value
    pub count: usize,
}

impl Extracted {
    fn is_missing(&self) -> bool {
        self.count == 0
    }
}

/// Extract every key under `roots`.
///
/// With `only_nest` the result is reconciled so nested leaves are not
/// repeated flat. With `include_match_counts` a `valuesCounts` entry maps
/// each key to its match count.
#[instrument(level = "trace", skip(tree, opts))]
pub fn get_all(tree: &dyn NodeTree, roots: &[NodeId], opts: &Options) -> Map<String, Value> {
    let mut counts = Map::new();
    let mut values = extract_mapping(tree, roots, opts, 0, Some(&mut counts));
    debug!("get_all: {} keys from {} roots", values.len(), roots.len());

    if opts.only_nest {
        reconcile(&mut values);
    }
    if opts.include_match_counts {
        values.insert(COUNTS_KEY.to_string(), Value::Object(counts));
    }
    values
}

/// Extract one key under `roots`. Null when nothing matches.
#[instrument(level = "trace", skip(tree, opts))]
pub fn get_one(tree: &dyn NodeTree, roots: &[NodeId], key: &str, opts: &Options) -> Value {
    extract_key(tree, roots, key, &opts.for_single_key(), 0).value
}

/// Extract one key, keeping the match count.
pub fn extract_key(
    tree: &dyn NodeTree,
    roots: &[NodeId],
    key: &str,
    opts: &Options,
    depth: usize,
) -> Extracted {
    let fields = resolve_fields(tree, roots, key, opts);
    trace!("extract_key: key={} fields={}", key, fields.len());
    consolidate(
        fields
            .into_iter()
            .map(|node| extract_node(tree, node, opts, depth)),
    )
}

/// Fold per-node results: missing ones are dropped, equal ones collapse
/// to a scalar, differing ones form an array in encounter order.
pub fn consolidate(results: impl IntoIterator<Item = Option<Value>>) -> Extracted {
    let present: Vec<Value> = results.into_iter().flatten().collect();
    let count = present.len();
    let value = if present.is_empty() {
        Value::Null
    } else if present.iter().all(|v| *v == present[0]) {
        present[0].clone()
    } else {
        Value::Array(present)
    };
    Extracted { value, count }
}

fn extract_mapping(
    tree: &dyn NodeTree,
    roots: &[NodeId],
    opts: &Options,
    depth: usize,
    mut counts: Option<&mut Map<String, Value>>,
) -> Map<String, Value> {
    let mut values = Map::new();
    for key in collect_keys(tree, roots, opts) {
        let extracted = extract_key(tree, roots, &key, opts, depth);
        if let Some(counts) = counts.as_deref_mut() {
            counts.insert(key.clone(), Value::from(extracted.count));
        }
        if !extracted.is_missing() {
            values.insert(key, extracted.value);
        }
    }
    values
}

/// Value of a single node, None when the node contributes nothing.
pub fn extract_node(
    tree: &dyn NodeTree,
    node: NodeId,
    opts: &Options,
    depth: usize,
) -> Option<Value> {
    let kind = tree.kind(node)?;
    match kind {
        NodeKind::Input(InputKind::Checkbox | InputKind::Radio) => {
            let value = Value::String(tree.value(node).unwrap_or_default());
            if tree.is_checked(node) {
                return Some(value);
            }
            match &opts.unchecked_value {
                UncheckedPolicy::Skip => None,
                UncheckedPolicy::Always => Some(value),
                UncheckedPolicy::Sentinel(sentinel) => Some(sentinel.clone()),
            }
        }
        NodeKind::Input(_) | NodeKind::MultiLineText => {
            Some(Value::String(tree.value(node).unwrap_or_default()))
        }
        NodeKind::ChoiceList(mode) => Some(selected_options(tree, node, mode, opts)),
        NodeKind::Form => {
            if !opts.single_value() {
                if let Some(nested) = nested_mapping(tree, node, opts, depth) {
                    return Some(nested);
                }
            }
            Some(Value::String(tree.attribute(node, "action").unwrap_or_default()))
        }
        NodeKind::Embed => Some(Value::String(tree.attribute(node, "src").unwrap_or_default())),
        NodeKind::Container => {
            if let Some(bound) = tree.attribute(node, "value").filter(|v| !v.is_empty()) {
                return Some(Value::String(bound));
            }
            if !opts.only_flat {
                if let Some(nested) = nested_mapping(tree, node, opts, depth) {
                    return Some(nested);
                }
            }
            let text = tree.text(node).trim().to_string();
            if text.is_empty() {
                Some(Value::String(tree.markup(node)))
            } else {
                Some(Value::String(text))
            }
        }
    }
}

fn nested_mapping(
    tree: &dyn NodeTree,
    node: NodeId,
    opts: &Options,
    depth: usize,
) -> Option<Value> {
    if !has_descendant_fields(tree, node, opts) {
        return None;
    }
    if depth >= opts.max_depth {
        warn!(
            "nested extraction stopped at depth {} (max_depth={})",
            depth, opts.max_depth
        );
        return None;
    }
    let children = tree.children(node);
    let nested = extract_mapping(tree, &children, opts, depth + 1, None);
    (!nested.is_empty()).then_some(Value::Object(nested))
}

/// Comparison key of a choice option: trimmed text, or its value with
/// `use_selection_value`.
pub(crate) fn option_key(option: &ChoiceOption, opts: &Options) -> String {
    if opts.use_selection_value {
        option.effective_value().to_string()
    } else {
        option.text.trim().to_string()
    }
}

fn selected_options(tree: &dyn NodeTree, node: NodeId, mode: ChoiceMode, opts: &Options) -> Value {
    let mut selected = tree
        .choice_options(node)
        .into_iter()
        .filter(|o| o.selected)
        .map(|o| Value::String(option_key(&o, opts)))
        .peekable();
    if selected.peek().is_none() {
        return Value::Null;
    }
    match mode {
        ChoiceMode::Single => selected.next().unwrap_or(Value::Null),
        ChoiceMode::Multi => Value::Array(selected.collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_equal_results_when_consolidating_then_scalar() {
        let out = consolidate(vec![Some(json!("A")), None, Some(json!("A"))]);
        assert_eq!(out.value, json!("A"));
        assert_eq!(out.count, 2);
    }

    #[test]
    fn given_differing_results_when_consolidating_then_array_in_order() {
        let out = consolidate(vec![Some(json!("A")), Some(json!("B")), Some(json!("A"))]);
        assert_eq!(out.value, json!(["A", "B", "A"]));
        assert_eq!(out.count, 3);
    }

    #[test]
    fn given_only_missing_results_when_consolidating_then_null() {
        let out = consolidate(vec![None, None]);
        assert_eq!(out.value, Value::Null);
        assert!(out.is_missing());
    }

    #[test]
    fn given_equal_mappings_when_consolidating_then_compares_structurally() {
        let out = consolidate(vec![Some(json!({"a": "1"})), Some(json!({"a": "1"}))]);
        assert_eq!(out.value, json!({"a": "1"}));
    }
}
