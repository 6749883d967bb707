//! Primary table access
//!
//! The primary row holds live columns and the `latest_version` pointer.
//! The pointer only ever moves forward by one, together with the append of
//! the matching snapshot.

use serde_json::Value;

use crate::errors::{VersioningError, VersioningResult};
use crate::model::ModelDefinition;
use crate::query::{Predicate, Query, Row};
use crate::storage::{Increment, Storage};

pub struct PrimaryStore<'m> {
    model: &'m ModelDefinition,
}

impl<'m> PrimaryStore<'m> {
    pub fn new(model: &'m ModelDefinition) -> Self {
        Self { model }
    }

    fn table(&self) -> &str {
        &self.model.table
    }

    fn keys_query(&self, ids: &[i64]) -> Query {
        Query::new(self.table()).with_predicate(Predicate::is_in(
            self.model.qualified_key_name(),
            ids.iter().copied(),
        ))
    }

    /// Inserts a new row with `latest_version = 1` and returns its key
    pub fn insert<S: Storage>(&self, storage: &mut S, mut live: Row) -> VersioningResult<i64> {
        live.insert(self.model.latest_version_column.clone(), Value::from(1));
        let explicit = live.get(&self.model.primary_key).and_then(Value::as_i64);

        let generated = storage
            .insert(self.table(), live)
            .map_err(|e| VersioningError::primary_write(self.table(), e))?;

        generated.or(explicit).ok_or_else(|| {
            VersioningError::malformed(self.table(), "insert produced no primary key")
        })
    }

    /// Sets `live` on every listed row and advances `latest_version` by one
    pub fn increment_and_set<S: Storage>(
        &self,
        storage: &mut S,
        ids: &[i64],
        live: &Row,
    ) -> VersioningResult<usize> {
        let increment = Increment::new(&self.model.latest_version_column, 1);
        storage
            .update(&self.keys_query(ids), live, Some(&increment))
            .map_err(|e| VersioningError::primary_write(self.table(), e))
    }

    /// Sets `values` on every listed row without touching the version pointer
    pub fn set_columns<S: Storage>(
        &self,
        storage: &mut S,
        ids: &[i64],
        values: &Row,
    ) -> VersioningResult<usize> {
        storage
            .update(&self.keys_query(ids), values, None)
            .map_err(|e| VersioningError::primary_write(self.table(), e))
    }

    /// Raw primary row, no history join
    pub fn find<S: Storage>(&self, storage: &S, id: i64) -> VersioningResult<Option<Row>> {
        let query = self.keys_query(&[id]).with_limit(1);
        Ok(storage
            .select(&query)
            .map_err(|e| VersioningError::read(self.table(), e))?
            .into_iter()
            .next())
    }

    /// Current `latest_version` of a row
    pub fn latest_version<S: Storage>(&self, storage: &S, id: i64) -> VersioningResult<Option<u64>> {
        let row = match self.find(storage, id)? {
            Some(row) => row,
            None => return Ok(None),
        };
        row.get(&self.model.latest_version_column)
            .and_then(Value::as_u64)
            .map(Some)
            .ok_or_else(|| {
                VersioningError::malformed(
                    self.table(),
                    format!("row {} has no '{}'", id, self.model.latest_version_column),
                )
            })
    }

    pub fn delete<S: Storage>(&self, storage: &mut S, ids: &[i64]) -> VersioningResult<usize> {
        storage
            .delete(&self.keys_query(ids))
            .map_err(|e| VersioningError::primary_write(self.table(), e))
    }
}
