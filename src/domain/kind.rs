//! Node kinds: the closed set of behaviours the values engine dispatches on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flavour of an input-like node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Checkbox,
    Radio,
    Other,
}

/// Whether a choice list accepts one or several selected options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceMode {
    Single,
    Multi,
}

/// Kind of a tree node, classified once when the node is created.
///
/// Anything that is not recognised as a form control, form or embed
/// is a `Container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Container,
    Input(InputKind),
    ChoiceList(ChoiceMode),
    MultiLineText,
    Form,
    Embed,
}

impl NodeKind {
    /// Classify a node from its tag name and attributes.
    ///
    /// - `input` uses its `type` attribute (checkbox, radio, everything else)
    /// - `select` is multi-choice when it carries a `multiple` attribute
    /// - `img`, `embed` and `iframe` are embeds
    pub fn classify(tag: &str, attributes: &BTreeMap<String, String>) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "input" => {
                let input_type = attributes
                    .get("type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_default();
                match input_type.as_str() {
                    "checkbox" => NodeKind::Input(InputKind::Checkbox),
                    "radio" => NodeKind::Input(InputKind::Radio),
                    _ => NodeKind::Input(InputKind::Other),
                }
            }
            "select" => {
                if attributes.contains_key("multiple") {
                    NodeKind::ChoiceList(ChoiceMode::Multi)
                } else {
                    NodeKind::ChoiceList(ChoiceMode::Single)
                }
            }
            "textarea" => NodeKind::MultiLineText,
            "form" => NodeKind::Form,
            "img" | "embed" | "iframe" => NodeKind::Embed,
            _ => NodeKind::Container,
        }
    }

    /// Checkboxes and radio buttons.
    pub fn is_checkable(&self) -> bool {
        matches!(
            self,
            NodeKind::Input(InputKind::Checkbox) | NodeKind::Input(InputKind::Radio)
        )
    }

    /// Kinds that keep a live `value` separate from their attributes.
    pub fn has_live_value(&self) -> bool {
        matches!(self, NodeKind::Input(_) | NodeKind::MultiLineText)
    }

    /// Elements rendered without a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, NodeKind::Input(_) | NodeKind::Embed)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Container => write!(f, "container"),
            NodeKind::Input(InputKind::Checkbox) => write!(f, "checkbox"),
            NodeKind::Input(InputKind::Radio) => write!(f, "radio"),
            NodeKind::Input(InputKind::Other) => write!(f, "input"),
            NodeKind::ChoiceList(ChoiceMode::Single) => write!(f, "select"),
            NodeKind::ChoiceList(ChoiceMode::Multi) => write!(f, "select-multiple"),
            NodeKind::MultiLineText => write!(f, "textarea"),
            NodeKind::Form => write!(f, "form"),
            NodeKind::Embed => write!(f, "embed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[rstest]
    #[case("div", &[], NodeKind::Container)]
    #[case("span", &[("name", "x")], NodeKind::Container)]
    #[case("input", &[], NodeKind::Input(InputKind::Other))]
    #[case("INPUT", &[("type", "CheckBox")], NodeKind::Input(InputKind::Checkbox))]
    #[case("input", &[("type", "radio")], NodeKind::Input(InputKind::Radio))]
    #[case("select", &[], NodeKind::ChoiceList(ChoiceMode::Single))]
    #[case("select", &[("multiple", "")], NodeKind::ChoiceList(ChoiceMode::Multi))]
    #[case("textarea", &[], NodeKind::MultiLineText)]
    #[case("form", &[("action", "/go")], NodeKind::Form)]
    #[case("img", &[], NodeKind::Embed)]
    #[case("iframe", &[], NodeKind::Embed)]
    fn given_tag_and_attributes_when_classifying_then_returns_kind(
        #[case] tag: &str,
        #[case] pairs: &[(&str, &str)],
        #[case] expected: NodeKind,
    ) {
        assert_eq!(NodeKind::classify(tag, &attrs(pairs)), expected);
    }

    #[test]
    fn given_checkable_kinds_when_queried_then_only_checkbox_and_radio() {
        assert!(NodeKind::Input(InputKind::Checkbox).is_checkable());
        assert!(NodeKind::Input(InputKind::Radio).is_checkable());
        assert!(!NodeKind::Input(InputKind::Other).is_checkable());
        assert!(!NodeKind::Container.is_checkable());
    }
}
