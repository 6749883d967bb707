//! Read modes of a versioned query

use chrono::{DateTime, Utc};

/// Which snapshot(s) the history join selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Snapshot pointed to by `latest_version`
    Default,
    /// Snapshot with this exact number
    SpecificVersion(u64),
    /// Every snapshot, one result row each
    AllVersions,
    /// Snapshot in effect at the moment
    AsOfMoment(DateTime<Utc>),
}

impl JoinMode {
    pub fn name(&self) -> &'static str {
        match self {
            JoinMode::Default => "default",
            JoinMode::SpecificVersion(_) => "specific_version",
            JoinMode::AllVersions => "all_versions",
            JoinMode::AsOfMoment(_) => "as_of_moment",
        }
    }
}

/// Visibility of soft-deleted entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedScope {
    /// Soft-deleted entities are hidden
    #[default]
    Without,
    /// Soft-deleted entities are included
    With,
    /// Only soft-deleted entities are returned
    Only,
}
