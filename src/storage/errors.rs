//! # Storage Errors

use std::fmt;

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Severity levels shared by every error family in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected, nothing was written
    Reject,
    /// Operation fails, caller may retry or continue
    Error,
    /// A versioning invariant was broken
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage backend errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Constraint violation on '{table}': {detail}")]
    ConstraintViolation { table: String, detail: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Unknown column '{column}' on '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a constraint violation
    pub fn constraint(table: impl Into<String>, detail: impl Into<String>) -> Self {
        StorageError::ConstraintViolation {
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Creates an unknown column error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        StorageError::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::ConstraintViolation { .. } => "STORAGE_CONSTRAINT_VIOLATION",
            StorageError::UnknownTable(_) => "STORAGE_UNKNOWN_TABLE",
            StorageError::TableExists(_) => "STORAGE_TABLE_EXISTS",
            StorageError::UnknownColumn { .. } => "STORAGE_UNKNOWN_COLUMN",
            StorageError::Unsupported(_) => "STORAGE_UNSUPPORTED",
            StorageError::Backend(_) => "STORAGE_BACKEND_ERROR",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StorageError::ConstraintViolation { .. }
            | StorageError::UnknownTable(_)
            | StorageError::TableExists(_)
            | StorageError::UnknownColumn { .. }
            | StorageError::Unsupported(_) => Severity::Reject,
            StorageError::Backend(_) => Severity::Error,
        }
    }

    /// Returns true for uniqueness and other integrity violations
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StorageError::ConstraintViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            StorageError::constraint("users", "duplicate").code(),
            "STORAGE_CONSTRAINT_VIOLATION"
        );
        assert_eq!(
            StorageError::unknown_column("users", "x").code(),
            "STORAGE_UNKNOWN_COLUMN"
        );
        assert_eq!(StorageError::Backend("disk".into()).code(), "STORAGE_BACKEND_ERROR");
    }

    #[test]
    fn test_constraint_detection() {
        assert!(StorageError::constraint("t", "d").is_constraint_violation());
        assert!(!StorageError::UnknownTable("t".into()).is_constraint_violation());
    }

    #[test]
    fn test_display() {
        let err = StorageError::unknown_column("users", "age");
        assert_eq!(err.to_string(), "Unknown column 'age' on 'users'");
        assert_eq!(Severity::Fatal.to_string(), "FATAL");
    }
}
