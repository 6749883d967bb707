//! Versioning engine errors
//!
//! Error codes:
//! - VERSION_INVALID_KEY_FORMAT (REJECT)
//! - VERSION_INVALID_TIMESTAMP (REJECT)
//! - VERSION_DUPLICATE (FATAL) - a snapshot number was written twice
//! - VERSION_PRIMARY_WRITE_FAILED (ERROR)
//! - VERSION_HISTORY_WRITE_FAILED (ERROR)
//! - VERSION_READ_FAILED (ERROR)
//! - VERSION_MALFORMED_ROW (FATAL)
//! - VERSION_TIMESTAMP_NOT_VERSIONED (REJECT)
//!
//! Model and storage failures keep their own codes.

use thiserror::Error;

use crate::model::ModelError;
use crate::storage::{Severity, StorageError};

/// Result type for versioning operations
pub type VersioningResult<T> = Result<T, VersioningError>;

#[derive(Debug, Clone, Error)]
pub enum VersioningError {
    #[error("Invalid attribute key '{key}': {reason}")]
    InvalidKeyFormat { key: String, reason: String },

    #[error("Invalid timestamp for '{column}': {value}")]
    InvalidTimestamp { column: String, value: String },

    #[error("Snapshot {version} of entity {ref_id} already exists")]
    DuplicateVersion { ref_id: i64, version: u64 },

    #[error("Write to primary table '{table}' failed: {source}")]
    PrimaryWriteFailed {
        table: String,
        #[source]
        source: StorageError,
    },

    #[error("Write to history table '{table}' failed: {source}")]
    HistoryWriteFailed {
        table: String,
        #[source]
        source: StorageError,
    },

    #[error("Read from '{table}' failed: {source}")]
    ReadFailed {
        table: String,
        #[source]
        source: StorageError,
    },

    #[error("Malformed row in '{table}': {detail}")]
    MalformedRow { table: String, detail: String },

    #[error("Model '{table}' does not version '{column}'; as-of reads are unavailable")]
    TimestampNotVersioned { table: String, column: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VersioningError {
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        VersioningError::InvalidKeyFormat {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_timestamp(column: impl Into<String>, value: impl Into<String>) -> Self {
        VersioningError::InvalidTimestamp {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn primary_write(table: impl Into<String>, source: StorageError) -> Self {
        VersioningError::PrimaryWriteFailed {
            table: table.into(),
            source,
        }
    }

    pub fn history_write(table: impl Into<String>, source: StorageError) -> Self {
        VersioningError::HistoryWriteFailed {
            table: table.into(),
            source,
        }
    }

    pub fn read(table: impl Into<String>, source: StorageError) -> Self {
        VersioningError::ReadFailed {
            table: table.into(),
            source,
        }
    }

    pub fn malformed(table: impl Into<String>, detail: impl Into<String>) -> Self {
        VersioningError::MalformedRow {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            VersioningError::InvalidKeyFormat { .. } => "VERSION_INVALID_KEY_FORMAT",
            VersioningError::InvalidTimestamp { .. } => "VERSION_INVALID_TIMESTAMP",
            VersioningError::DuplicateVersion { .. } => "VERSION_DUPLICATE",
            VersioningError::PrimaryWriteFailed { .. } => "VERSION_PRIMARY_WRITE_FAILED",
            VersioningError::HistoryWriteFailed { .. } => "VERSION_HISTORY_WRITE_FAILED",
            VersioningError::ReadFailed { .. } => "VERSION_READ_FAILED",
            VersioningError::MalformedRow { .. } => "VERSION_MALFORMED_ROW",
            VersioningError::TimestampNotVersioned { .. } => "VERSION_TIMESTAMP_NOT_VERSIONED",
            VersioningError::Model(e) => e.code(),
            VersioningError::Storage(e) => e.code(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            VersioningError::InvalidKeyFormat { .. }
            | VersioningError::InvalidTimestamp { .. }
            | VersioningError::TimestampNotVersioned { .. } => Severity::Reject,
            VersioningError::DuplicateVersion { .. } | VersioningError::MalformedRow { .. } => {
                Severity::Fatal
            }
            VersioningError::PrimaryWriteFailed { .. }
            | VersioningError::HistoryWriteFailed { .. }
            | VersioningError::ReadFailed { .. } => Severity::Error,
            VersioningError::Model(e) => e.severity(),
            VersioningError::Storage(e) => e.severity(),
        }
    }

    /// Returns whether this error means a versioning invariant is broken
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
