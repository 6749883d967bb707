//! History store
//!
//! Owns the `<table>_version` table: one immutable snapshot per change of
//! a versioned attribute set.

mod snapshot;
mod store;

pub use snapshot::Snapshot;
pub use store::HistoryStore;
