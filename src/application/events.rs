//! Set notifications
//!
//! Observers receive the tree mutably so they can run further get/set
//! calls from inside a notification.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::NodeId;
use crate::infrastructure::traits::NodeTree;

/// State of the distribution workspace when a field was set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceSnapshot {
    pub key: String,
    /// Number of target nodes resolved for the key
    pub field_count: usize,
    /// Cursor position when the node was set
    pub index: usize,
    /// Whether the value was a delimiter-split string
    pub split: bool,
    /// Membership values in effect (split parts or array entries)
    pub values: Vec<Value>,
}

/// One field received a value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSetEvent {
    pub node: NodeId,
    pub key: String,
    pub value: Value,
    pub workspace: WorkspaceSnapshot,
}

/// A full-mapping set finished.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAllEvent {
    pub roots: Vec<NodeId>,
    pub values: Map<String, Value>,
}

/// Receives set notifications.
pub trait SetObserver: Send + Sync {
    fn field_set(&self, _tree: &mut dyn NodeTree, _event: &FieldSetEvent) {}

    fn set_all(&self, _tree: &mut dyn NodeTree, _event: &SetAllEvent) {}
}
