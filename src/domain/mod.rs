//! Domain layer: node model, document arena and value helpers
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod kind;
pub mod value;

pub use arena::{Document, NodeData, NodeId, TreeNode};
pub use builder::DocumentBuilder;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use kind::{ChoiceMode, InputKind, NodeKind};
pub use value::{COUNTS_KEY, SPLIT_DELIMITER};
