//! Arena-backed node tree.
//!
//! Nodes live in a generational arena, so ids of removed nodes never
//! alias new ones. Parent/child links are kept on both sides.

use std::collections::BTreeMap;
use std::fmt;

use generational_arena::{Arena, Index};
use serde_json::Value;
use termtree::Tree;
use tracing::instrument;

use crate::domain::entities::{ChoiceOption, NodeSpec};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::kind::NodeKind;
use crate::domain::value::{escape, strip_tags};

/// Identifier of a node inside a `Document`.
pub type NodeId = Index;

/// Payload of a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub tag: String,
    /// Classified from tag and attributes at creation
    pub kind: NodeKind,
    pub attributes: BTreeMap<String, String>,
    /// Own text, rendered before the children
    pub text: String,
    /// Opaque inner markup, set instead of text and children
    pub markup: Option<String>,
    /// Live value of inputs and textareas
    pub value: Option<String>,
    pub checked: bool,
    pub options: Vec<ChoiceOption>,
    /// Side-channel data store
    pub data: BTreeMap<String, Value>,
}

impl NodeData {
    /// Create node data for `tag`, classifying its kind.
    pub fn new(tag: impl Into<String>, attributes: BTreeMap<String, String>) -> Self {
        let tag = tag.into();
        let kind = NodeKind::classify(&tag, &attributes);
        Self {
            tag,
            kind,
            attributes,
            text: String::new(),
            markup: None,
            value: None,
            checked: false,
            options: Vec::new(),
            data: BTreeMap::new(),
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if let Some(name) = self.attributes.get("name") {
            write!(f, "[name={}]", name)?;
        }
        if self.kind != NodeKind::Container {
            write!(f, " ({})", self.kind)?;
        }
        Ok(())
    }
}

/// Tree node in the arena.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for roots and detached nodes
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena-based document tree.
#[derive(Debug, Default)]
pub struct Document {
    arena: Arena<TreeNode>,
    root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `parent`, or as the document root when `parent` is None.
    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let node_idx = self.arena.insert(TreeNode {
            data,
            parent,
            children: Vec::new(),
        });

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: NodeId) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, idx: NodeId) -> bool {
        self.arena.contains(idx)
    }

    /// Number of live nodes, detached ones included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order iterator over the tree below the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Pre-order iterator over `node` and its descendants.
    pub fn iter_from(&self, node: NodeId) -> TreeIterator<'_> {
        TreeIterator::new(self, Some(node))
    }

    /// Descendants of `node` in document order, `node` excluded.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.iter_from(node).skip(1).map(|(idx, _)| idx).collect()
    }

    pub fn depth(&self) -> usize {
        self.root.map(|root| self.calculate_depth(root)).unwrap_or(0)
    }

    fn calculate_depth(&self, node_idx: NodeId) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Nodes whose attribute `name` equals `value`, in document order.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.data.attributes.get(name).map(String::as_str) == Some(value))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Deep copy of the subtree at `node`. The copy is detached (no parent).
    #[instrument(level = "trace", skip(self))]
    pub fn clone_subtree(&mut self, node: NodeId) -> Option<NodeId> {
        let data = self.get_node(node)?.data.clone();
        let copy = self.arena.insert(TreeNode {
            data,
            parent: None,
            children: Vec::new(),
        });

        let mut stack = vec![(node, copy)];
        while let Some((original, copied)) = stack.pop() {
            let children = match self.get_node(original) {
                Some(n) => n.children.clone(),
                None => continue,
            };
            for child in children {
                let Some(child_data) = self.get_node(child).map(|n| n.data.clone()) else {
                    continue;
                };
                let child_copy = self.arena.insert(TreeNode {
                    data: child_data,
                    parent: Some(copied),
                    children: Vec::new(),
                });
                if let Some(parent) = self.arena.get_mut(copied) {
                    parent.children.push(child_copy);
                }
                stack.push((child, child_copy));
            }
        }
        Some(copy)
    }

    /// Attach the detached `node` as the sibling right after `anchor`.
    ///
    /// Fails when `anchor` has no parent or `node` is already attached.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> bool {
        let Some(parent_idx) = self.get_node(anchor).and_then(|a| a.parent) else {
            return false;
        };
        match self.get_node(node) {
            Some(n) if n.parent.is_none() && Some(node) != self.root => {}
            _ => return false,
        }
        let Some(parent) = self.arena.get_mut(parent_idx) else {
            return false;
        };
        let position = parent
            .children
            .iter()
            .position(|&c| c == anchor)
            .map(|p| p + 1)
            .unwrap_or(parent.children.len());
        parent.children.insert(position, node);
        if let Some(n) = self.arena.get_mut(node) {
            n.parent = Some(parent_idx);
        }
        true
    }

    /// Remove `node` and its subtree from the arena.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_subtree(&mut self, node: NodeId) {
        if let Some(parent_idx) = self.get_node(node).and_then(|n| n.parent) {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.retain(|&c| c != node);
            }
        }
        if self.root == Some(node) {
            self.root = None;
        }
        let mut stack = vec![node];
        while let Some(idx) = stack.pop() {
            if let Some(removed) = self.arena.remove(idx) {
                stack.extend(removed.children);
            }
        }
    }

    /// Drop all children of `node`, leaving the node in place.
    pub fn clear_children(&mut self, node: NodeId) {
        let children = match self.get_node(node) {
            Some(n) => n.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_subtree(child);
        }
    }

    /// Displayed text of the subtree: own text, stripped markup and the
    /// text of each child, non-empty pieces joined by a space.
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(n) = self.get_node(node) else {
            return String::new();
        };
        let mut parts: Vec<String> = Vec::new();
        if !n.data.text.is_empty() {
            parts.push(n.data.text.clone());
        }
        if let Some(markup) = &n.data.markup {
            parts.push(strip_tags(markup).into_owned());
        }
        for option in &n.data.options {
            if !option.text.is_empty() {
                parts.push(option.text.clone());
            }
        }
        for &child in &n.children {
            let text = self.text_content(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    /// Inner markup of `node`: opaque markup if set, else escaped text
    /// followed by each child's outer markup.
    pub fn inner_markup(&self, node: NodeId) -> String {
        let Some(n) = self.get_node(node) else {
            return String::new();
        };
        if let Some(markup) = &n.data.markup {
            return markup.clone();
        }
        let mut out = escape(&n.data.text).into_owned();
        for option in &n.data.options {
            out.push_str("<option");
            if let Some(value) = &option.value {
                out.push_str(&format!(" value=\"{}\"", escape(value)));
            }
            if option.selected {
                out.push_str(" selected");
            }
            out.push('>');
            out.push_str(&escape(&option.text));
            out.push_str("</option>");
        }
        for &child in &n.children {
            out.push_str(&self.outer_markup(child));
        }
        out
    }

    /// Markup of `node` including its own tag.
    pub fn outer_markup(&self, node: NodeId) -> String {
        let Some(n) = self.get_node(node) else {
            return String::new();
        };
        let mut out = format!("<{}", n.data.tag);
        for (name, value) in &n.data.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
        }
        if n.data.kind.is_checkable() && n.data.checked {
            out.push_str(" checked");
        }
        out.push('>');
        if n.data.kind.is_void() {
            return out;
        }
        out.push_str(&self.inner_markup(node));
        out.push_str(&format!("</{}>", n.data.tag));
        out
    }

    /// Serializable description of the subtree at `node`.
    pub fn to_spec(&self, node: NodeId) -> DomainResult<NodeSpec> {
        let n = self
            .get_node(node)
            .ok_or_else(|| DomainError::StaleNode(format!("{:?}", node)))?;
        let children = n
            .children
            .iter()
            .map(|&child| self.to_spec(child))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(NodeSpec {
            tag: n.data.tag.clone(),
            attributes: n.data.attributes.clone(),
            text: n.data.text.clone(),
            markup: n.data.markup.clone(),
            value: n.data.value.clone(),
            checked: n.data.checked,
            options: n.data.options.clone(),
            data: n.data.data.clone(),
            children,
        })
    }

    /// Description of the whole document.
    pub fn to_root_spec(&self) -> DomainResult<NodeSpec> {
        let root = self.root.ok_or(DomainError::EmptyDocument)?;
        self.to_spec(root)
    }

    /// Printable tree of tags and names.
    pub fn render_tree(&self) -> Tree<String> {
        match self.root {
            Some(root) => self.render_subtree(root),
            None => Tree::new("Empty document".to_string()),
        }
    }

    fn render_subtree(&self, node: NodeId) -> Tree<String> {
        match self.get_node(node) {
            Some(n) => {
                let leaves: Vec<_> = n
                    .children
                    .iter()
                    .map(|&child| self.render_subtree(child))
                    .collect();
                Tree::new(n.data.to_string()).with_leaves(leaves)
            }
            None => Tree::new("?".to_string()),
        }
    }
}

/// Pre-order (document order) iterator.
pub struct TreeIterator<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(doc: &'a Document, start: Option<NodeId>) -> Self {
        Self {
            doc,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.doc.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(tag: &str, name: Option<&str>) -> NodeData {
        let mut attributes = BTreeMap::new();
        if let Some(name) = name {
            attributes.insert("name".to_string(), name.to_string());
        }
        NodeData::new(tag, attributes)
    }

    //      root
    //      /  \
    //     a    c
    //     |
    //     b
    fn sample() -> (Document, NodeId, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.insert_node(data("div", None), None);
        let a = doc.insert_node(data("div", Some("a")), Some(root));
        let b = doc.insert_node(data("span", Some("b")), Some(a));
        let c = doc.insert_node(data("span", Some("c")), Some(root));
        (doc, root, a, b, c)
    }

    #[test]
    fn given_tree_when_iterating_then_visits_in_document_order() {
        let (doc, root, a, b, c) = sample();
        let order: Vec<_> = doc.iter().map(|(idx, _)| idx).collect();
        assert_eq!(order, vec![root, a, b, c]);
        assert_eq!(doc.descendants(a), vec![b]);
        assert_eq!(doc.depth(), 3);
    }

    #[test]
    fn given_subtree_when_cloning_and_inserting_then_sibling_follows_anchor() {
        let (mut doc, root, a, _b, c) = sample();

        let copy = doc.clone_subtree(a).unwrap();
        assert!(doc.get_node(copy).unwrap().parent.is_none());
        assert!(doc.insert_after(a, copy));

        let children = &doc.get_node(root).unwrap().children;
        assert_eq!(children, &vec![a, copy, c]);
        let copy_children = &doc.get_node(copy).unwrap().children;
        assert_eq!(copy_children.len(), 1);
        assert_eq!(doc.get_node(copy_children[0]).unwrap().data.tag, "span");
    }

    #[test]
    fn given_root_anchor_when_inserting_after_then_fails() {
        let (mut doc, root, a, _, _) = sample();
        let copy = doc.clone_subtree(a).unwrap();
        assert!(!doc.insert_after(root, copy));
        // already attached nodes cannot be inserted again
        assert!(!doc.insert_after(a, a));
    }

    #[test]
    fn given_subtree_when_removing_then_arena_shrinks() {
        let (mut doc, root, a, b, _) = sample();
        doc.remove_subtree(a);
        assert!(!doc.contains(a));
        assert!(!doc.contains(b));
        assert_eq!(doc.get_node(root).unwrap().children.len(), 1);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn given_text_and_children_when_reading_content_then_joins_with_space() {
        let (mut doc, _root, a, b, _) = sample();
        doc.get_node_mut(b).unwrap().data.text = "b".to_string();
        doc.get_node_mut(a).unwrap().data.text = "a".to_string();
        assert_eq!(doc.text_content(a), "a b");
        assert_eq!(
            doc.inner_markup(a),
            "a<span name=\"b\">b</span>".to_string()
        );
    }
}
