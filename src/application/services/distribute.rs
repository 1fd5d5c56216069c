//! Array distribution
//!
//! Spreads an array of mappings over a node selection, one entry per node,
//! cloning the most recently used node when entries outnumber nodes.

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::application::options::Options;
use crate::application::services::inject::apply_mapping;
use crate::domain::NodeId;
use crate::infrastructure::traits::NodeTree;

/// Apply `rows[i]` to the i-th node of `selection`, growing the selection
/// with clones when needed.
///
/// Returns the (node, entry) pairs that were applied, in order. Nodes are
/// never removed; with `no_clone` surplus entries are dropped.
pub fn distribute(
    tree: &mut dyn NodeTree,
    selection: &[NodeId],
    rows: &[Value],
    opts: &Options,
    depth: usize,
) -> Vec<(NodeId, Value)> {
    let Some(&first) = selection.first() else {
        return Vec::new();
    };
    if depth >= opts.max_depth {
        warn!(
            "array distribution stopped at depth {} (max_depth={})",
            depth, opts.max_depth
        );
        return Vec::new();
    }

    let mut selection = selection.to_vec();
    let mut applied = Vec::with_capacity(rows.len());
    let mut last = first;

    for (i, entry) in rows.iter().enumerate() {
        let Value::Object(map) = entry else {
            debug!("distribute: skipping non-mapping entry {}", i);
            if let Some(&node) = selection.get(i) {
                last = node;
            }
            continue;
        };

        let target = match selection.get(i) {
            Some(&node) => node,
            None if opts.no_clone => {
                debug!(
                    "distribute: cloning disabled, dropping {} entries",
                    rows.len() - i
                );
                break;
            }
            None => match clone_after(tree, last) {
                Some(copy) => {
                    selection.push(copy);
                    copy
                }
                None => {
                    debug!(
                        "distribute: cannot place clone, dropping {} entries",
                        rows.len() - i
                    );
                    break;
                }
            },
        };

        trace!("distribute: entry {} -> {:?}", i, target);
        apply_mapping(tree, &[target], map, opts, depth + 1);
        applied.push((target, entry.clone()));
        last = target;
    }
    applied
}

fn clone_after(tree: &mut dyn NodeTree, anchor: NodeId) -> Option<NodeId> {
    let copy = tree.clone_node(anchor)?;
    if tree.insert_after(anchor, copy) {
        Some(copy)
    } else {
        tree.discard(copy);
        None
    }
}
