//! Version-aware query planning
//!
//! Reads go through a `VersionedQuery`, which owns the history join for the
//! selected `JoinMode` and the soft delete scope.

mod mode;
mod versioned_query;

pub use mode::{JoinMode, TrashedScope};
pub(crate) use versioned_query::strip_version_key;
pub use versioned_query::VersionedQuery;
