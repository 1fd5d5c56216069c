//! Bidirectional values binding between named node trees and nested
//! key-value data.
//!
//! `get` walks a tree and collects the values of its named nodes into a
//! mapping; `set` pushes a mapping back into the tree, cloning nodes when
//! an array holds more rows than there are nodes to receive them.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::services::ValuesService;
pub use application::{OptionOverrides, Options};
pub use domain::{Document, DocumentBuilder, NodeId, NodeSpec};
pub use infrastructure::NodeTree;
