//! Values service
//!
//! Entry point for get/set calls. Holds the base options (compiled
//! defaults or loaded settings) that per-call overrides are merged over.

use serde_json::{Map, Value};
use tracing::debug;

use crate::application::options::{OptionOverrides, Options};
use crate::application::services::extract::{get_all, get_one};
use crate::application::services::inject::{set_all, set_one, set_rows};
use crate::domain::value::{as_rows, without_counts};
use crate::domain::NodeId;
use crate::infrastructure::traits::NodeTree;

/// Apply a mapping, or distribute an array of mappings over `roots`.
/// Anything else is ignored.
pub fn set_values(tree: &mut dyn NodeTree, roots: &[NodeId], values: &Value, opts: &Options) {
    match values {
        Value::Object(map) => set_all(tree, roots, map, opts),
        other => match as_rows(other) {
            Some(rows) => set_rows(tree, roots, rows, opts),
            None => debug!("set_values: ignoring non-mapping value"),
        },
    }
}

/// Copy every value under `source` onto `target` within one tree.
pub fn set_from(tree: &mut dyn NodeTree, source: &[NodeId], target: &[NodeId], opts: &Options) {
    let values = without_counts(&get_all(tree, source, opts));
    debug!("set_from: {} keys", values.len());
    set_all(tree, target, &values, opts);
}

/// Copy every value under `source_roots` of one tree onto `target_roots`
/// of another.
pub fn copy_between(
    source: &dyn NodeTree,
    source_roots: &[NodeId],
    target: &mut dyn NodeTree,
    target_roots: &[NodeId],
    opts: &Options,
) {
    let values = without_counts(&get_all(source, source_roots, opts));
    debug!("copy_between: {} keys", values.len());
    set_all(target, target_roots, &values, opts);
}

/// Get/set facade with fixed base options.
#[derive(Debug, Clone, Default)]
pub struct ValuesService {
    base: Options,
}

impl ValuesService {
    pub fn new(base: Options) -> Self {
        Self { base }
    }

    /// Base options with `overrides` applied.
    pub fn options(&self, overrides: Option<&OptionOverrides>) -> Options {
        match overrides {
            Some(overrides) => self.base.merged(overrides),
            None => self.base.clone(),
        }
    }

    pub fn base(&self) -> &Options {
        &self.base
    }

    /// All keys under `roots`.
    pub fn get_all(
        &self,
        tree: &dyn NodeTree,
        roots: &[NodeId],
        overrides: Option<&OptionOverrides>,
    ) -> Map<String, Value> {
        get_all(tree, roots, &self.options(overrides))
    }

    /// One key under `roots`.
    pub fn get_one(
        &self,
        tree: &dyn NodeTree,
        roots: &[NodeId],
        key: &str,
        overrides: Option<&OptionOverrides>,
    ) -> Value {
        get_one(tree, roots, key, &self.options(overrides))
    }

    /// Apply a mapping, or distribute an array of mappings over `roots`.
    pub fn set(
        &self,
        tree: &mut dyn NodeTree,
        roots: &[NodeId],
        values: &Value,
        overrides: Option<&OptionOverrides>,
    ) {
        set_values(tree, roots, values, &self.options(overrides))
    }

    pub fn set_all(
        &self,
        tree: &mut dyn NodeTree,
        roots: &[NodeId],
        values: &Map<String, Value>,
        overrides: Option<&OptionOverrides>,
    ) {
        set_all(tree, roots, values, &self.options(overrides))
    }

    pub fn set_one(
        &self,
        tree: &mut dyn NodeTree,
        roots: &[NodeId],
        key: &str,
        value: &Value,
        overrides: Option<&OptionOverrides>,
    ) {
        set_one(tree, roots, key, value, &self.options(overrides))
    }

    pub fn set_from(
        &self,
        tree: &mut dyn NodeTree,
        source: &[NodeId],
        target: &[NodeId],
        overrides: Option<&OptionOverrides>,
    ) {
        set_from(tree, source, target, &self.options(overrides))
    }

    pub fn copy_between(
        &self,
        source: &dyn NodeTree,
        source_roots: &[NodeId],
        target: &mut dyn NodeTree,
        target_roots: &[NodeId],
        overrides: Option<&OptionOverrides>,
    ) {
        copy_between(
            source,
            source_roots,
            target,
            target_roots,
            &self.options(overrides),
        )
    }
}
