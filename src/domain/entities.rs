//! Domain entities: node payloads and the serializable document description

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One option of a choice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChoiceOption {
    /// Displayed text
    pub text: String,
    /// Underlying value, falls back to the trimmed text when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub selected: bool,
}

impl ChoiceOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
            selected: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// The option's value as submitted by a form.
    pub fn effective_value(&self) -> &str {
        self.value.as_deref().unwrap_or_else(|| self.text.trim())
    }
}

/// Serializable description of a node and its subtree.
///
/// Documents are exchanged as JSON trees of `NodeSpec`; `DocumentBuilder`
/// turns them into an arena and `Document::to_spec` turns them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NodeSpec {
    /// Tag name, e.g. `div`, `input`, `select`
    pub tag: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Own text, rendered before the children
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Opaque inner markup; replaces text and children when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    /// Live value of inputs and textareas (defaults from the `value` attribute)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    /// Side-channel data attached to the node
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Shorthand for the `name` attribute.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.attr("name", name)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = Some(markup.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn option(mut self, option: ChoiceOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }
}
