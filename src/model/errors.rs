//! Model definition errors
//!
//! Error codes:
//! - MODEL_INVALID_DEFINITION (REJECT)
//! - MODEL_IO_ERROR (ERROR)
//! - MODEL_MALFORMED_JSON (REJECT)
//! - MODEL_DUPLICATE (REJECT)
//! - MODEL_UNKNOWN (REJECT)

use thiserror::Error;

use crate::storage::Severity;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Invalid model '{table}': {reason}")]
    InvalidDefinition { table: String, reason: String },

    #[error("Failed to read '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Malformed model file '{path}': {message}")]
    MalformedJson { path: String, message: String },

    #[error("Model already registered: {0}")]
    DuplicateModel(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

impl ModelError {
    pub fn invalid(table: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::InvalidDefinition {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ModelError::InvalidDefinition { .. } => "MODEL_INVALID_DEFINITION",
            ModelError::Io { .. } => "MODEL_IO_ERROR",
            ModelError::MalformedJson { .. } => "MODEL_MALFORMED_JSON",
            ModelError::DuplicateModel(_) => "MODEL_DUPLICATE",
            ModelError::UnknownModel(_) => "MODEL_UNKNOWN",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ModelError::Io { .. } => Severity::Error,
            _ => Severity::Reject,
        }
    }
}
