//! Key collection and field resolution
//!
//! A field is a node carrying the key attribute. Both helpers walk the
//! roots themselves plus their descendants, in document order.

use itertools::Itertools;
use tracing::trace;

use crate::application::options::Options;
use crate::domain::NodeId;
use crate::infrastructure::traits::NodeTree;

/// All fields under `roots` (roots included), deduplicated, filtered.
pub fn collect_fields(tree: &dyn NodeTree, roots: &[NodeId], opts: &Options) -> Vec<NodeId> {
    fields_matching(tree, roots, None, opts)
}

/// Distinct key names under `roots`, first-seen order. Empty keys are ignored.
pub fn collect_keys(tree: &dyn NodeTree, roots: &[NodeId], opts: &Options) -> Vec<String> {
    let keys: Vec<String> = collect_fields(tree, roots, opts)
        .into_iter()
        .filter_map(|node| tree.attribute(node, &opts.key_attribute))
        .filter(|key| !key.is_empty())
        .unique()
        .collect();
    trace!("collect_keys: {} keys under {} roots", keys.len(), roots.len());
    keys
}

/// Fields whose key attribute equals `key`.
pub fn resolve_fields(
    tree: &dyn NodeTree,
    roots: &[NodeId],
    key: &str,
    opts: &Options,
) -> Vec<NodeId> {
    fields_matching(tree, roots, Some(key), opts)
}

/// Whether `node` has descendant fields (the node itself excluded).
pub fn has_descendant_fields(tree: &dyn NodeTree, node: NodeId, opts: &Options) -> bool {
    tree.find_by_key(node, &opts.key_attribute, None)
        .into_iter()
        .any(|n| opts.accepts(tree, n))
}

fn fields_matching(
    tree: &dyn NodeTree,
    roots: &[NodeId],
    key: Option<&str>,
    opts: &Options,
) -> Vec<NodeId> {
    let attr = opts.key_attribute.as_str();
    roots
        .iter()
        .flat_map(|&root| {
            let own = tree
                .attribute(root, attr)
                .filter(|found| key.map_or(true, |k| k == found.as_str()))
                .map(|_| root);
            own.into_iter().chain(tree.find_by_key(root, attr, key))
        })
        .unique()
        .filter(|&node| opts.accepts(tree, node))
        .collect()
}
