//! Infrastructure layer: node tree binding, JSON I/O and DI container
//!
//! This layer implements the `NodeTree` boundary for the bundled arena and wires up services.

pub mod di;
pub mod document_io;
pub mod error;
pub mod traits;

pub use di::ServiceContainer;
pub use error::{InfraError, InfraResult};
pub use traits::NodeTree;
