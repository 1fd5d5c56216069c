//! Value injection
//!
//! For each key the target fields are resolved, a workspace is built for
//! the value and every field is assigned in document order.

use serde_json::{Map, Value};
use tracing::{debug, instrument, trace, warn};

use crate::application::events::{FieldSetEvent, SetAllEvent, WorkspaceSnapshot};
use crate::application::options::Options;
use crate::application::services::collect::resolve_fields;
use crate::application::services::distribute::distribute;
use crate::application::services::extract::option_key;
use crate::domain::value::{as_rows, is_member, looks_like_markup, text_matches, to_text};
use crate::domain::{ChoiceMode, InputKind, NodeId, NodeKind, COUNTS_KEY, SPLIT_DELIMITER};
use crate::infrastructure::traits::NodeTree;

/// Data key under which a full-mapping set mirrors its input.
pub const MIRROR_DATA_KEY: &str = "values";

/// Per-key distribution state, discarded after the key is set.
#[derive(Debug)]
struct Workspace<'a> {
    key: &'a str,
    fields: Vec<NodeId>,
    /// Value assigned to the next field
    current: Value,
    /// Split parts or array entries, used for membership tests
    values: Vec<Value>,
    index: usize,
    split: bool,
}

impl<'a> Workspace<'a> {
    fn new(
        tree: &dyn NodeTree,
        key: &'a str,
        fields: Vec<NodeId>,
        value: &Value,
        opts: &Options,
    ) -> Self {
        let mut ws = Self {
            key,
            fields,
            current: value.clone(),
            values: Vec::new(),
            index: 0,
            split: false,
        };
        match value {
            Value::Array(items) if !items.is_empty() => {
                ws.values = items.clone();
                ws.current = if ws.fields.len() == 1 {
                    ws.single_field_value(tree, items, value, opts)
                } else {
                    items
                        .iter()
                        .find(|v| !v.is_null())
                        .cloned()
                        .unwrap_or(Value::Null)
                };
            }
            Value::String(s) if s.contains(SPLIT_DELIMITER) => {
                ws.split = true;
                ws.values = s
                    .split(SPLIT_DELIMITER)
                    .map(|part| Value::String(part.to_string()))
                    .collect();
            }
            _ => {}
        }
        ws
    }

    /// Many values, one field: the first entry, unless the field has
    /// children that can receive the whole array.
    fn single_field_value(
        &self,
        tree: &dyn NodeTree,
        items: &[Value],
        value: &Value,
        opts: &Options,
    ) -> Value {
        let mut present = items.iter().filter(|v| !v.is_null());
        let Some(first) = present.next() else {
            return Value::Null;
        };
        if present.next().is_none() || opts.no_clone || tree.children(self.fields[0]).is_empty() {
            first.clone()
        } else {
            value.clone()
        }
    }

    /// Move the cursor after a field was set. Past the end the last value
    /// is held.
    fn advance(&mut self) {
        if self.fields.len() <= 1 {
            return;
        }
        self.index += 1;
        if !self.split {
            if let Some(next) = self.values.get(self.index) {
                self.current = next.clone();
            }
        }
    }

    fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            key: self.key.to_string(),
            field_count: self.fields.len(),
            index: self.index,
            split: self.split,
            values: self.values.clone(),
        }
    }
}

/// Apply every key of `values` to the fields under `roots`.
///
/// With `mirror_to_data` the whole mapping is also stored under the
/// `values` data key of each root; with `emit_set_all_event` the observer
/// is notified once at the end.
#[instrument(level = "trace", skip(tree, values, opts))]
pub fn set_all(
    tree: &mut dyn NodeTree,
    roots: &[NodeId],
    values: &Map<String, Value>,
    opts: &Options,
) {
    debug!("set_all: {} keys onto {} roots", values.len(), roots.len());
    apply_mapping(tree, roots, values, opts, 0);

    if opts.mirror_to_data {
        for &root in roots {
            tree.set_data(root, MIRROR_DATA_KEY, Value::Object(values.clone()));
        }
    }
    if opts.emit_set_all_event {
        if let Some(observer) = &opts.observer {
            let event = SetAllEvent {
                roots: roots.to_vec(),
                values: values.clone(),
            };
            observer.set_all(tree, &event);
        }
    }
}

/// Apply a single key.
#[instrument(level = "trace", skip(tree, value, opts))]
pub fn set_one(tree: &mut dyn NodeTree, roots: &[NodeId], key: &str, value: &Value, opts: &Options) {
    inject_key(tree, roots, key, value, &opts.for_single_key(), 0);
}

/// Distribute an array of mappings over `roots`, one entry per root.
#[instrument(level = "trace", skip(tree, rows, opts))]
pub fn set_rows(tree: &mut dyn NodeTree, roots: &[NodeId], rows: &[Value], opts: &Options) {
    let applied = distribute(tree, roots, rows, opts, 0);
    debug!("set_rows: {} of {} entries applied", applied.len(), rows.len());
}

pub(crate) fn apply_mapping(
    tree: &mut dyn NodeTree,
    roots: &[NodeId],
    values: &Map<String, Value>,
    opts: &Options,
    depth: usize,
) {
    for (key, value) in values {
        if key == COUNTS_KEY {
            continue;
        }
        inject_key(tree, roots, key, value, opts, depth);
    }
}

fn inject_key(
    tree: &mut dyn NodeTree,
    roots: &[NodeId],
    key: &str,
    value: &Value,
    opts: &Options,
    depth: usize,
) {
    let fields = resolve_fields(tree, roots, key, opts);
    trace!("inject_key: key={} fields={}", key, fields.len());

    if opts.mirror_to_data {
        for &root in roots {
            tree.set_data(root, key, value.clone());
        }
    }
    if opts.mirror_to_attribute {
        let text = to_text(value);
        for &root in roots {
            tree.set_attribute(root, key, &text);
        }
    }
    if fields.is_empty() {
        return;
    }

    if fields.len() > 1 && !opts.only_flat {
        if let Some(rows) = as_rows(value) {
            let applied = distribute(tree, &fields, rows, opts, depth);
            for (index, (node, entry)) in applied.into_iter().enumerate() {
                let workspace = WorkspaceSnapshot {
                    key: key.to_string(),
                    field_count: fields.len(),
                    index,
                    split: false,
                    values: rows.to_vec(),
                };
                notify(tree, node, key, entry, workspace, opts);
            }
            return;
        }
    }

    let mut ws = Workspace::new(tree, key, fields.clone(), value, opts);
    for node in fields {
        dispatch(tree, node, &ws, opts, depth);
        let current = ws.current.clone();
        notify(tree, node, key, current, ws.snapshot(), opts);
        ws.advance();
    }
}

fn notify(
    tree: &mut dyn NodeTree,
    node: NodeId,
    key: &str,
    value: Value,
    workspace: WorkspaceSnapshot,
    opts: &Options,
) {
    if !opts.emit_set_events {
        return;
    }
    if let Some(observer) = &opts.observer {
        let event = FieldSetEvent {
            node,
            key: key.to_string(),
            value,
            workspace,
        };
        observer.field_set(tree, &event);
    }
}

fn dispatch(tree: &mut dyn NodeTree, node: NodeId, ws: &Workspace<'_>, opts: &Options, depth: usize) {
    let current = &ws.current;
    if !opts.only_flat {
        match current {
            Value::Object(map) if depth < opts.max_depth => {
                apply_mapping(tree, &[node], map, opts, depth + 1);
                return;
            }
            Value::Object(_) => {
                warn!(
                    "nested injection of '{}' stopped at depth {} (max_depth={})",
                    ws.key, depth, opts.max_depth
                );
            }
            Value::Array(_) => {
                if let Some(rows) = as_rows(current) {
                    distribute(tree, &[node], rows, opts, depth);
                    return;
                }
            }
            _ => {}
        }
    }

    match current {
        Value::Object(_) | Value::Array(_) => {
            assign(tree, node, &Value::String(to_text(current)), &ws.values, opts)
        }
        scalar => assign(tree, node, scalar, &ws.values, opts),
    }
}

/// Scalar assignment by node kind.
fn assign(tree: &mut dyn NodeTree, node: NodeId, value: &Value, members: &[Value], opts: &Options) {
    let Some(kind) = tree.kind(node) else {
        return;
    };
    match kind {
        NodeKind::Input(InputKind::Checkbox | InputKind::Radio) => {
            let own = tree.value(node).unwrap_or_default();
            let checked = text_matches(&own, value) || is_member(&own, members);
            tree.set_checked(node, checked);
        }
        NodeKind::Input(_) | NodeKind::MultiLineText => tree.set_value(node, &to_text(value)),
        NodeKind::ChoiceList(mode) => select_options(tree, node, mode, value, members, opts),
        NodeKind::Form => tree.set_attribute(node, "action", &to_text(value)),
        NodeKind::Embed => tree.set_attribute(node, "src", &to_text(value)),
        NodeKind::Container => {
            let text = to_text(value);
            if tree.attribute(node, "value").is_some() {
                tree.set_attribute(node, "value", &text);
            } else if looks_like_markup(&text) {
                tree.set_markup(node, &text);
            } else {
                tree.set_text(node, &text);
            }
        }
    }
}

fn select_options(
    tree: &mut dyn NodeTree,
    node: NodeId,
    mode: ChoiceMode,
    value: &Value,
    members: &[Value],
    opts: &Options,
) {
    let keys: Vec<String> = tree
        .choice_options(node)
        .iter()
        .map(|o| option_key(o, opts))
        .collect();

    match mode {
        ChoiceMode::Multi => {
            for (i, key) in keys.iter().enumerate() {
                let selected = if members.is_empty() {
                    text_matches(key, value)
                } else {
                    is_member(key, members)
                };
                tree.set_option_selected(node, i, selected);
            }
        }
        ChoiceMode::Single => {
            let chosen = keys.iter().rposition(|key| text_matches(key, value));
            for i in 0..keys.len() {
                tree.set_option_selected(node, i, Some(i) == chosen);
            }
        }
    }
}
