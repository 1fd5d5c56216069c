//! Application services
//!
//! The values engine: key collection, extraction, reconciliation,
//! injection and array distribution. All of it works against the
//! `NodeTree` capability and never touches I/O.

pub mod collect;
pub mod distribute;
pub mod extract;
pub mod inject;
pub mod reconcile;
mod values;

pub use collect::{collect_keys, resolve_fields};
pub use distribute::distribute;
pub use extract::{consolidate, get_all, get_one, Extracted};
pub use inject::{set_all, set_one, set_rows, MIRROR_DATA_KEY};
pub use reconcile::reconcile;
pub use values::{copy_between, set_from, set_values, ValuesService};
