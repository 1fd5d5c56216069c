//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent invalid document structures.
/// The values engine itself never fails; these come from building
/// and exporting documents.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid node at {path}: {reason}")]
    InvalidNode { path: String, reason: String },

    #[error("node not found in document: {0}")]
    StaleNode(String),

    #[error("document has no root node")]
    EmptyDocument,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
