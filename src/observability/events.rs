//! Observable events of the versioning engine
//!
//! Events are explicit and typed. Each maps to one stable name that appears
//! as the `event` field of the emitted log line.

use std::fmt;

/// Log level of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-row detail
    Debug,
    /// Normal operations
    Info,
    /// A mutation was abandoned
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        }
    }
}

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Writes
    /// Primary row and first snapshot written
    EntityCreated,
    /// Primary rows advanced and snapshots appended
    EntityUpdated,
    /// One history row written
    SnapshotAppended,
    /// History rows moved to a new primary key
    HistoryRepointed,

    // Deletes
    /// Soft delete marker set
    EntitySoftDeleted,
    /// Soft delete marker cleared
    EntityRestored,
    /// Primary rows and their history removed
    EntityForceDeleted,

    // Failures
    /// A mutation failed and its transaction was rolled back
    MutationRolledBack,

    // Configuration
    /// A model definition was registered
    ModelLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EntityCreated => "ENTITY_CREATED",
            Event::EntityUpdated => "ENTITY_UPDATED",
            Event::SnapshotAppended => "SNAPSHOT_APPENDED",
            Event::HistoryRepointed => "HISTORY_REPOINTED",
            Event::EntitySoftDeleted => "ENTITY_SOFT_DELETED",
            Event::EntityRestored => "ENTITY_RESTORED",
            Event::EntityForceDeleted => "ENTITY_FORCE_DELETED",
            Event::MutationRolledBack => "MUTATION_ROLLED_BACK",
            Event::ModelLoaded => "MODEL_LOADED",
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            Event::SnapshotAppended => LogLevel::Debug,
            Event::MutationRolledBack => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::EntityCreated.as_str(), "ENTITY_CREATED");
        assert_eq!(Event::HistoryRepointed.as_str(), "HISTORY_REPOINTED");
        assert_eq!(Event::MutationRolledBack.to_string(), "MUTATION_ROLLED_BACK");
    }

    #[test]
    fn test_event_levels() {
        assert_eq!(Event::MutationRolledBack.level(), LogLevel::Warn);
        assert_eq!(Event::SnapshotAppended.level(), LogLevel::Debug);
        assert_eq!(Event::EntityUpdated.level(), LogLevel::Info);
        assert!(LogLevel::Warn > LogLevel::Info);
    }
}
