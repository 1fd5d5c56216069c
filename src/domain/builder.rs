//! Document builder: turns a `NodeSpec` description into an arena tree.

use tracing::debug;

use crate::domain::arena::{Document, NodeData, NodeId};
use crate::domain::entities::NodeSpec;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::kind::NodeKind;

/// Default value of a checkbox or radio without a `value` attribute.
const CHECKABLE_DEFAULT_VALUE: &str = "on";

/// Constructs documents from node descriptions.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    nodes_built: usize,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document whose root is `spec`.
    pub fn build(&mut self, spec: &NodeSpec) -> DomainResult<Document> {
        let mut doc = Document::new();
        self.build_into(&mut doc, spec, None)?;
        debug!("build: {} nodes", self.nodes_built);
        Ok(doc)
    }

    /// Build `spec` into an existing document, under `parent` (or as root).
    pub fn build_into(
        &mut self,
        doc: &mut Document,
        spec: &NodeSpec,
        parent: Option<NodeId>,
    ) -> DomainResult<NodeId> {
        let root_path = spec.tag.clone();
        let root_idx = doc.insert_node(Self::node_data(spec, &root_path)?, parent);
        self.nodes_built += 1;

        let mut stack: Vec<(&NodeSpec, NodeId, String)> = vec![(spec, root_idx, root_path)];
        while let Some((current, current_idx, path)) = stack.pop() {
            // Insert children in order so sibling order is preserved
            for (i, child) in current.children.iter().enumerate() {
                let child_path = format!("{}/{}[{}]", path, child.tag, i);
                let data = Self::node_data(child, &child_path)?;
                let child_idx = doc.insert_node(data, Some(current_idx));
                self.nodes_built += 1;
                stack.push((child, child_idx, child_path));
            }
        }

        Ok(root_idx)
    }

    /// Number of nodes built so far.
    pub fn nodes_built(&self) -> usize {
        self.nodes_built
    }

    fn node_data(spec: &NodeSpec, path: &str) -> DomainResult<NodeData> {
        if spec.tag.trim().is_empty() {
            return Err(DomainError::InvalidNode {
                path: path.to_string(),
                reason: "empty tag".to_string(),
            });
        }

        let mut data = NodeData::new(spec.tag.trim(), spec.attributes.clone());
        data.text = spec.text.clone();
        data.markup = spec.markup.clone();
        data.checked = spec.checked;
        data.options = spec.options.clone();
        data.data = spec.data.clone();
        let kind = data.kind;
        data.value = match kind {
            NodeKind::Input(_) => spec
                .value
                .clone()
                .or_else(|| spec.attributes.get("value").cloned())
                .or_else(|| {
                    kind.is_checkable()
                        .then(|| CHECKABLE_DEFAULT_VALUE.to_string())
                }),
            NodeKind::MultiLineText => spec.value.clone().or_else(|| Some(spec.text.clone())),
            _ => spec.value.clone(),
        };

        if matches!(kind, NodeKind::ChoiceList(_)) && !spec.children.is_empty() {
            return Err(DomainError::InvalidNode {
                path: path.to_string(),
                reason: "choice lists hold options, not children".to_string(),
            });
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ChoiceOption;
    use crate::domain::kind::{ChoiceMode, InputKind};

    #[test]
    fn given_nested_spec_when_building_then_preserves_sibling_order() {
        let spec = NodeSpec::new("div").children([
            NodeSpec::new("span").named("first"),
            NodeSpec::new("div").named("second").child(NodeSpec::new("b").named("inner")),
            NodeSpec::new("span").named("third"),
        ]);

        let mut builder = DocumentBuilder::new();
        let doc = builder.build(&spec).unwrap();

        let names: Vec<_> = doc
            .iter()
            .filter_map(|(_, n)| n.data.attributes.get("name").cloned())
            .collect();
        assert_eq!(names, vec!["first", "second", "inner", "third"]);
        assert_eq!(builder.nodes_built(), 5);
        assert_eq!(doc.to_root_spec().unwrap(), spec);
    }

    #[test]
    fn given_inputs_when_building_then_initialises_live_values() {
        let spec = NodeSpec::new("form").children([
            NodeSpec::new("input").attr("type", "checkbox"),
            NodeSpec::new("input").attr("value", "typed"),
            NodeSpec::new("textarea").text("notes"),
            NodeSpec::new("select")
                .attr("multiple", "")
                .option(ChoiceOption::new("A").selected()),
        ]);

        let doc = DocumentBuilder::new().build(&spec).unwrap();
        let nodes: Vec<_> = doc.iter().skip(1).map(|(_, n)| n.data.clone()).collect();

        assert_eq!(nodes[0].kind, NodeKind::Input(InputKind::Checkbox));
        assert_eq!(nodes[0].value.as_deref(), Some("on"));
        assert_eq!(nodes[1].value.as_deref(), Some("typed"));
        assert_eq!(nodes[2].value.as_deref(), Some("notes"));
        assert_eq!(nodes[3].kind, NodeKind::ChoiceList(ChoiceMode::Multi));
    }

    #[test]
    fn given_empty_tag_when_building_then_errors_with_path() {
        let spec = NodeSpec::new("div").child(NodeSpec::new(" "));
        let result = DocumentBuilder::new().build(&spec);
        match result {
            Err(DomainError::InvalidNode { path, .. }) => assert_eq!(path, "div/ [0]"),
            other => panic!("expected InvalidNode, got {:?}", other),
        }
    }
}
