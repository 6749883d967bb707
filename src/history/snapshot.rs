//! Snapshot - one immutable history row
//!
//! - A snapshot holds the versioned attribute values of one entity
//! - `(ref_id, version)` identifies it; the pair is unique
//! - Once written, a snapshot never changes
//!
//! All fields are private to enforce immutability.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{VersioningError, VersioningResult};
use crate::model::ModelDefinition;
use crate::query::Row;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    /// Primary key of the entity this snapshot belongs to
    ref_id: i64,
    /// Snapshot number, starting at 1
    version: u64,
    /// Versioned attribute values
    values: Row,
}

impl Snapshot {
    pub fn new(ref_id: i64, version: u64, values: Row) -> Self {
        Self {
            ref_id,
            version,
            values,
        }
    }

    /// Decodes a history table row
    pub fn from_row(model: &ModelDefinition, mut row: Row) -> VersioningResult<Self> {
        let key = model.version_key_name();
        let table = model.history_table();

        let ref_id = row
            .remove(&key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| VersioningError::malformed(&table, format!("missing integer '{}'", key)))?;
        let version = row
            .remove(&model.version_column)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                VersioningError::malformed(
                    &table,
                    format!("missing integer '{}'", model.version_column),
                )
            })?;

        Ok(Self::new(ref_id, version, row))
    }

    /// Encodes the snapshot as a history table row
    pub fn to_row(&self, model: &ModelDefinition) -> Row {
        let mut row = self.values.clone();
        row.insert(model.version_key_name(), Value::from(self.ref_id));
        row.insert(model.version_column.clone(), Value::from(self.version));
        row
    }

    #[inline]
    pub fn ref_id(&self) -> i64 {
        self.ref_id
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn values(&self) -> &Row {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn into_values(self) -> Row {
        self.values
    }
}
