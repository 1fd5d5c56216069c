//! Per-call options
//!
//! `Options` is immutable once built. Callers pass partial
//! `OptionOverrides`, which are merged over a base (the compiled
//! defaults or the loaded settings) to produce a fresh value per call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::application::events::SetObserver;
use crate::domain::NodeId;
use crate::infrastructure::traits::NodeTree;

/// Default attribute holding a node's key.
pub const DEFAULT_KEY_ATTRIBUTE: &str = "name";

/// Default limit for nested extraction/injection.
pub const DEFAULT_MAX_DEPTH: usize = 64;

const SKIP_WORD: &str = "skip";

/// What an unchecked checkbox or radio contributes when extracting.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UncheckedPolicy {
    /// Unchecked nodes are skipped
    #[default]
    Skip,
    /// The node's value is returned whether checked or not
    Always,
    /// This value is returned for unchecked nodes
    Sentinel(Value),
}

impl UncheckedPolicy {
    /// `true` means always, `"skip"` means skip, anything else (including
    /// `false`) is a sentinel.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Bool(true) => UncheckedPolicy::Always,
            Value::String(s) if s == SKIP_WORD => UncheckedPolicy::Skip,
            other => UncheckedPolicy::Sentinel(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            UncheckedPolicy::Skip => Value::String(SKIP_WORD.to_string()),
            UncheckedPolicy::Always => Value::Bool(true),
            UncheckedPolicy::Sentinel(v) => v.clone(),
        }
    }
}

impl Serialize for UncheckedPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UncheckedPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(UncheckedPolicy::from_value)
    }
}

/// Predicate restricting which nodes take part in a call.
#[derive(Clone)]
pub struct NodeFilter(Arc<dyn Fn(&dyn NodeTree, NodeId) -> bool + Send + Sync>);

impl NodeFilter {
    pub fn new(f: impl Fn(&dyn NodeTree, NodeId) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Keep only nodes whose tag is not one of `tags`.
    pub fn exclude_tags(tags: Vec<String>) -> Self {
        Self::new(move |tree, node| {
            tree.tag(node)
                .map(|tag| !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)))
                .unwrap_or(false)
        })
    }

    /// Keep only nodes carrying attribute `name`.
    pub fn has_attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |tree, node| tree.attribute(node, &name).is_some())
    }

    pub fn accepts(&self, tree: &dyn NodeTree, node: NodeId) -> bool {
        (self.0)(tree, node)
    }
}

impl fmt::Debug for NodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeFilter(..)")
    }
}

/// Effective options of one get/set call.
#[derive(Clone)]
pub struct Options {
    /// Attribute naming a node's key
    pub key_attribute: String,
    /// Drop flat copies of keys that appear inside nested mappings
    pub only_nest: bool,
    /// Never produce nested mappings; flatten nested values when setting
    pub only_flat: bool,
    pub node_filter: Option<NodeFilter>,
    /// Store set values in the root nodes' side-channel data
    pub mirror_to_data: bool,
    /// Store set values as attributes of the root nodes
    pub mirror_to_attribute: bool,
    pub emit_set_events: bool,
    pub emit_set_all_event: bool,
    /// Never clone nodes to make room for extra array entries
    pub no_clone: bool,
    pub unchecked_value: UncheckedPolicy,
    /// Read choice lists by option value instead of option text
    pub use_selection_value: bool,
    pub include_match_counts: bool,
    pub max_depth: usize,
    pub observer: Option<Arc<dyn SetObserver>>,
    single_value: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            only_nest: false,
            only_flat: false,
            node_filter: None,
            mirror_to_data: false,
            mirror_to_attribute: false,
            emit_set_events: false,
            emit_set_all_event: false,
            no_clone: false,
            unchecked_value: UncheckedPolicy::Skip,
            use_selection_value: false,
            include_match_counts: false,
            max_depth: DEFAULT_MAX_DEPTH,
            observer: None,
            single_value: false,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("key_attribute", &self.key_attribute)
            .field("only_nest", &self.only_nest)
            .field("only_flat", &self.only_flat)
            .field("node_filter", &self.node_filter)
            .field("mirror_to_data", &self.mirror_to_data)
            .field("mirror_to_attribute", &self.mirror_to_attribute)
            .field("emit_set_events", &self.emit_set_events)
            .field("emit_set_all_event", &self.emit_set_all_event)
            .field("no_clone", &self.no_clone)
            .field("unchecked_value", &self.unchecked_value)
            .field("use_selection_value", &self.use_selection_value)
            .field("include_match_counts", &self.include_match_counts)
            .field("max_depth", &self.max_depth)
            .field("observer", &self.observer.is_some())
            .field("single_value", &self.single_value)
            .finish()
    }
}

impl Options {
    /// Defaults with `overrides` applied.
    pub fn from_overrides(overrides: &OptionOverrides) -> Self {
        Self::default().merged(overrides)
    }

    /// A new value with every field set in `overrides` replacing ours.
    pub fn merged(&self, overrides: &OptionOverrides) -> Self {
        let mut next = self.clone();
        if let Some(v) = overrides.key_attribute.as_ref().filter(|s| !s.is_empty()) {
            next.key_attribute = v.clone();
        }
        if let Some(v) = overrides.only_nest {
            next.only_nest = v;
        }
        if let Some(v) = overrides.only_flat {
            next.only_flat = v;
        }
        if let Some(v) = overrides.mirror_to_data {
            next.mirror_to_data = v;
        }
        if let Some(v) = overrides.mirror_to_attribute {
            next.mirror_to_attribute = v;
        }
        if let Some(v) = overrides.emit_set_events {
            next.emit_set_events = v;
        }
        if let Some(v) = overrides.emit_set_all_event {
            next.emit_set_all_event = v;
        }
        if let Some(v) = overrides.no_clone {
            next.no_clone = v;
        }
        if let Some(v) = &overrides.unchecked_value {
            next.unchecked_value = v.clone();
        }
        if let Some(v) = overrides.use_selection_value {
            next.use_selection_value = v;
        }
        if let Some(v) = overrides.include_match_counts {
            next.include_match_counts = v;
        }
        if let Some(v) = overrides.max_depth.filter(|d| *d > 0) {
            next.max_depth = v;
        }
        next
    }

    pub fn with_node_filter(mut self, filter: NodeFilter) -> Self {
        self.node_filter = Some(filter);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SetObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Options for the single-key entry points: forms yield their own
    /// value instead of their children's.
    pub(crate) fn for_single_key(&self) -> Self {
        let mut next = self.clone();
        next.single_value = true;
        next
    }

    pub(crate) fn single_value(&self) -> bool {
        self.single_value
    }

    /// Whether `node` passes the node filter.
    pub fn accepts(&self, tree: &dyn NodeTree, node: NodeId) -> bool {
        self.node_filter
            .as_ref()
            .map(|f| f.accepts(tree, node))
            .unwrap_or(true)
    }
}

/// Partial options: every field is optional and falls back to the base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OptionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_nest: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_flat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_to_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_to_attribute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_set_events: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_set_all_event: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_clone: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unchecked_value: Option<UncheckedPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_selection_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_match_counts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl OptionOverrides {
    /// Overlay wins where it is set, otherwise keep ours.
    pub fn merge(&self, overlay: &OptionOverrides) -> Self {
        Self {
            key_attribute: overlay
                .key_attribute
                .clone()
                .or_else(|| self.key_attribute.clone()),
            only_nest: overlay.only_nest.or(self.only_nest),
            only_flat: overlay.only_flat.or(self.only_flat),
            mirror_to_data: overlay.mirror_to_data.or(self.mirror_to_data),
            mirror_to_attribute: overlay.mirror_to_attribute.or(self.mirror_to_attribute),
            emit_set_events: overlay.emit_set_events.or(self.emit_set_events),
            emit_set_all_event: overlay.emit_set_all_event.or(self.emit_set_all_event),
            no_clone: overlay.no_clone.or(self.no_clone),
            unchecked_value: overlay
                .unchecked_value
                .clone()
                .or_else(|| self.unchecked_value.clone()),
            use_selection_value: overlay.use_selection_value.or(self.use_selection_value),
            include_match_counts: overlay.include_match_counts.or(self.include_match_counts),
            max_depth: overlay.max_depth.or(self.max_depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_partial_overrides_when_merging_then_unset_fields_keep_defaults() {
        let overrides = OptionOverrides {
            only_nest: Some(true),
            key_attribute: Some("data-key".to_string()),
            ..OptionOverrides::default()
        };

        let opts = Options::from_overrides(&overrides);

        assert!(opts.only_nest);
        assert_eq!(opts.key_attribute, "data-key");
        assert!(!opts.only_flat);
        assert_eq!(opts.unchecked_value, UncheckedPolicy::Skip);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn given_empty_key_attribute_when_merging_then_keeps_base() {
        let overrides = OptionOverrides {
            key_attribute: Some(String::new()),
            max_depth: Some(0),
            ..OptionOverrides::default()
        };
        let opts = Options::from_overrides(&overrides);
        assert_eq!(opts.key_attribute, DEFAULT_KEY_ATTRIBUTE);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn given_json_overrides_when_deserializing_then_unknown_fields_are_ignored() {
        let overrides: OptionOverrides = serde_json::from_value(json!({
            "only_flat": true,
            "unchecked_value": "off",
            "bogus": 1
        }))
        .unwrap();

        assert_eq!(overrides.only_flat, Some(true));
        assert_eq!(
            overrides.unchecked_value,
            Some(UncheckedPolicy::Sentinel(json!("off")))
        );
    }

    #[test]
    fn given_unchecked_values_when_converting_then_maps_policies() {
        assert_eq!(UncheckedPolicy::from_value(json!(true)), UncheckedPolicy::Always);
        assert_eq!(UncheckedPolicy::from_value(json!("skip")), UncheckedPolicy::Skip);
        assert_eq!(
            UncheckedPolicy::from_value(json!(null)),
            UncheckedPolicy::Sentinel(json!(null))
        );
        assert_eq!(
            UncheckedPolicy::from_value(json!(false)),
            UncheckedPolicy::Sentinel(json!(false))
        );
        assert_eq!(UncheckedPolicy::Always.to_value(), json!(true));
        assert_eq!(UncheckedPolicy::Skip.to_value(), json!("skip"));
    }

    #[test]
    fn given_base_and_overlay_overrides_when_merging_then_overlay_wins() {
        let base = OptionOverrides {
            only_nest: Some(true),
            no_clone: Some(true),
            ..OptionOverrides::default()
        };
        let overlay = OptionOverrides {
            no_clone: Some(false),
            ..OptionOverrides::default()
        };

        let merged = base.merge(&overlay);

        assert_eq!(merged.only_nest, Some(true));
        assert_eq!(merged.no_clone, Some(false));
    }
}
