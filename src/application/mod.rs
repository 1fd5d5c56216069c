//! Application layer: options, notifications and the values engine
//!
//! This layer orchestrates domain logic and depends on the `NodeTree` boundary trait.

pub mod error;
pub mod error_ext;
pub mod events;
pub mod options;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use events::{FieldSetEvent, SetAllEvent, SetObserver, WorkspaceSnapshot};
pub use options::{NodeFilter, OptionOverrides, Options, UncheckedPolicy};
