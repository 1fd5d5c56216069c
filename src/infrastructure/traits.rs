//! Node accessor boundary trait
//!
//! The values engine reads and mutates trees only through `NodeTree`,
//! so any host tree (a DOM binding, a widget toolkit, the bundled
//! `Document` arena) can be bound by implementing it.

use serde_json::Value;

use crate::domain::{ChoiceOption, Document, NodeData, NodeId, NodeKind};

/// Tree manipulation capability consumed by the values engine.
///
/// Unknown or removed node ids are tolerated: readers return `None` or
/// empty results and writers do nothing.
pub trait NodeTree {
    /// Kind of `node`, None if the node does not exist.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Tag name of `node`.
    fn tag(&self, node: NodeId) -> Option<String>;

    /// Read an attribute.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Write an attribute, creating it if needed.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Direct children, in order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Descendants of `node` (not `node` itself) carrying attribute `attr`,
    /// restricted to those whose attribute equals `key` when given.
    /// Document order.
    fn find_by_key(&self, node: NodeId, attr: &str, key: Option<&str>) -> Vec<NodeId>;

    /// Displayed text of the subtree.
    fn text(&self, node: NodeId) -> String;

    /// Replace the node's content with plain text.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Inner markup of the node.
    fn markup(&self, node: NodeId) -> String;

    /// Replace the node's content with markup.
    fn set_markup(&mut self, node: NodeId, markup: &str);

    /// Live value of an input-like node.
    fn value(&self, node: NodeId) -> Option<String>;

    fn set_value(&mut self, node: NodeId, value: &str);

    fn is_checked(&self, node: NodeId) -> bool;

    fn set_checked(&mut self, node: NodeId, checked: bool);

    /// Options of a choice list, in order.
    fn choice_options(&self, node: NodeId) -> Vec<ChoiceOption>;

    fn set_option_selected(&mut self, node: NodeId, index: usize, selected: bool);

    /// Side-channel data attached to the node.
    fn data(&self, node: NodeId, key: &str) -> Option<Value>;

    fn set_data(&mut self, node: NodeId, key: &str, value: Value);

    /// Deep copy of the subtree at `node`, detached from the tree.
    fn clone_node(&mut self, node: NodeId) -> Option<NodeId>;

    /// Attach the detached `node` right after `anchor`. False if impossible.
    fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> bool;

    /// Drop a detached node that was never inserted.
    fn discard(&mut self, node: NodeId);
}

impl Document {
    fn with_data<T>(&self, node: NodeId, f: impl FnOnce(&NodeData) -> T) -> Option<T> {
        self.get_node(node).map(|n| f(&n.data))
    }

    fn update_data(&mut self, node: NodeId, f: impl FnOnce(&mut NodeData)) {
        if let Some(n) = self.get_node_mut(node) {
            f(&mut n.data);
        }
    }
}

impl NodeTree for Document {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.with_data(node, |d| d.kind)
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.with_data(node, |d| d.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_data(node, |d| d.attributes.get(name).cloned())
            .flatten()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.update_data(node, |d| {
            d.attributes.insert(name.to_string(), value.to_string());
        });
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get_node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn find_by_key(&self, node: NodeId, attr: &str, key: Option<&str>) -> Vec<NodeId> {
        self.iter_from(node)
            .skip(1)
            .filter(|(_, n)| match (n.data.attributes.get(attr), key) {
                (Some(found), Some(wanted)) => found == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn text(&self, node: NodeId) -> String {
        self.text_content(node)
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        self.update_data(node, |d| {
            d.text = text.to_string();
            d.markup = None;
        });
    }

    fn markup(&self, node: NodeId) -> String {
        self.inner_markup(node)
    }

    fn set_markup(&mut self, node: NodeId, markup: &str) {
        self.clear_children(node);
        self.update_data(node, |d| {
            d.text.clear();
            d.markup = Some(markup.to_string());
        });
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.with_data(node, |d| d.value.clone()).flatten()
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        self.update_data(node, |d| d.value = Some(value.to_string()));
    }

    fn is_checked(&self, node: NodeId) -> bool {
        self.with_data(node, |d| d.checked).unwrap_or(false)
    }

    fn set_checked(&mut self, node: NodeId, checked: bool) {
        self.update_data(node, |d| d.checked = checked);
    }

    fn choice_options(&self, node: NodeId) -> Vec<ChoiceOption> {
        self.with_data(node, |d| d.options.clone())
            .unwrap_or_default()
    }

    fn set_option_selected(&mut self, node: NodeId, index: usize, selected: bool) {
        self.update_data(node, |d| {
            if let Some(option) = d.options.get_mut(index) {
                option.selected = selected;
            }
        });
    }

    fn data(&self, node: NodeId, key: &str) -> Option<Value> {
        self.with_data(node, |d| d.data.get(key).cloned()).flatten()
    }

    fn set_data(&mut self, node: NodeId, key: &str, value: Value) {
        self.update_data(node, |d| {
            d.data.insert(key.to_string(), value);
        });
    }

    fn clone_node(&mut self, node: NodeId) -> Option<NodeId> {
        self.clone_subtree(node)
    }

    fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> bool {
        Document::insert_after(self, anchor, node)
    }

    fn discard(&mut self, node: NodeId) {
        let detached = self.get_node(node).map(|n| n.parent.is_none()).unwrap_or(false);
        if detached && self.root() != Some(node) {
            self.remove_subtree(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentBuilder, NodeSpec};

    #[test]
    fn given_document_when_finding_by_key_then_excludes_start_node() {
        let spec = NodeSpec::new("div").named("a").children([
            NodeSpec::new("span").named("a"),
            NodeSpec::new("span").named("b"),
        ]);
        let doc = DocumentBuilder::new().build(&spec).unwrap();
        let root = doc.root().unwrap();

        assert_eq!(doc.find_by_key(root, "name", Some("a")).len(), 1);
        assert_eq!(doc.find_by_key(root, "name", None).len(), 2);
        assert!(doc.find_by_key(root, "id", None).is_empty());
    }

    #[test]
    fn given_children_when_setting_text_then_children_are_replaced() {
        let spec = NodeSpec::new("div").child(NodeSpec::new("span").text("old"));
        let mut doc = DocumentBuilder::new().build(&spec).unwrap();
        let root = doc.root().unwrap();

        doc.set_text(root, "new");

        assert!(NodeTree::children(&doc, root).is_empty());
        assert_eq!(NodeTree::text(&doc, root), "new");
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn given_detached_clone_when_discarding_then_removed() {
        let spec = NodeSpec::new("div").child(NodeSpec::new("span"));
        let mut doc = DocumentBuilder::new().build(&spec).unwrap();
        let root = doc.root().unwrap();

        let copy = doc.clone_node(root).unwrap();
        assert_eq!(doc.len(), 4);
        doc.discard(copy);
        assert_eq!(doc.len(), 2);

        // attached nodes are left alone
        doc.discard(root);
        assert_eq!(doc.len(), 2);
    }
}
