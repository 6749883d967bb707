//! versionable - transparent record-level versioning
//!
//! Each versioned model owns two tables:
//! - the primary table, holding live attributes and `latest_version`
//! - the history table `<table>_version`, holding one immutable snapshot
//!   of the versioned attributes per change, keyed by `(ref_id, version)`
//!
//! Reads join the two according to a `JoinMode`: the current snapshot, a
//! fixed version number, every version, or the version in effect at a
//! moment. Writes keep both tables consistent inside one transaction.

pub mod attributes;
pub mod clock;
pub mod coordinator;
pub mod errors;
pub mod history;
pub mod model;
pub mod observability;
pub mod planner;
pub mod primary;
pub mod query;
pub mod repository;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{VersioningError, VersioningResult};
pub use history::Snapshot;
pub use model::{ModelDefinition, ModelRegistry};
pub use planner::{JoinMode, TrashedScope, VersionedQuery};
pub use query::{row_from_json, Row};
pub use repository::Versioned;
pub use storage::{MemoryStorage, Storage, TableSchema};
#[cfg(feature = "sqlite")]
pub use storage::SqliteStorage;
