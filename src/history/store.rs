//! History table access
//!
//! Snapshots are append-only: nothing here rewrites a snapshot's values.
//! Deleting and repointing act on whole entity histories.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::snapshot::Snapshot;
use crate::clock::format_timestamp;
use crate::errors::{VersioningError, VersioningResult};
use crate::model::ModelDefinition;
use crate::observability::{log_event, Event, EventFields};
use crate::query::{ColumnRef, Predicate, Query, Row, SortSpec};
use crate::storage::Storage;

pub struct HistoryStore<'m> {
    model: &'m ModelDefinition,
    table: String,
}

impl<'m> HistoryStore<'m> {
    pub fn new(model: &'m ModelDefinition) -> Self {
        Self {
            model,
            table: model.history_table(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn column(&self, name: &str) -> ColumnRef {
        ColumnRef::qualified(&self.table, name)
    }

    fn entity_query(&self, ref_id: i64) -> Query {
        Query::new(&self.table).filter_eq(self.model.qualified_version_key_name(), ref_id)
    }

    fn fetch<S: Storage>(&self, storage: &S, query: &Query) -> VersioningResult<Vec<Snapshot>> {
        storage
            .select(query)
            .map_err(|e| VersioningError::read(&self.table, e))?
            .into_iter()
            .map(|row| Snapshot::from_row(self.model, row))
            .collect()
    }

    fn fetch_one<S: Storage>(&self, storage: &S, query: Query) -> VersioningResult<Option<Snapshot>> {
        Ok(self.fetch(storage, &query.with_limit(1))?.into_iter().next())
    }

    /// Writes snapshot `version` of entity `ref_id`.
    ///
    /// An existing `(ref_id, version)` pair is reported as `DuplicateVersion`.
    pub fn append<S: Storage>(
        &self,
        storage: &mut S,
        ref_id: i64,
        version: u64,
        values: Row,
    ) -> VersioningResult<Snapshot> {
        let snapshot = Snapshot::new(ref_id, version, values);

        storage
            .insert(&self.table, snapshot.to_row(self.model))
            .map_err(|e| {
                if e.is_constraint_violation() {
                    VersioningError::DuplicateVersion { ref_id, version }
                } else {
                    VersioningError::history_write(&self.table, e)
                }
            })?;

        log_event(
            Event::SnapshotAppended,
            EventFields::table(&self.table).ref_id(ref_id).version(version),
        );
        Ok(snapshot)
    }

    pub fn find_by_version<S: Storage>(
        &self,
        storage: &S,
        ref_id: i64,
        version: u64,
    ) -> VersioningResult<Option<Snapshot>> {
        let query = self
            .entity_query(ref_id)
            .filter_eq(self.model.qualified_version_column(), version);
        self.fetch_one(storage, query)
    }

    /// The snapshot in effect at `moment`: latest `updated_at` not after it,
    /// ties broken by the higher version.
    pub fn find_by_moment<S: Storage>(
        &self,
        storage: &S,
        ref_id: i64,
        moment: &DateTime<Utc>,
    ) -> VersioningResult<Option<Snapshot>> {
        if !self.model.versions_timestamps() {
            return Err(VersioningError::TimestampNotVersioned {
                table: self.model.table.clone(),
                column: self.model.updated_at.clone(),
            });
        }

        let updated_at = self.column(&self.model.updated_at);
        let query = self
            .entity_query(ref_id)
            .with_predicate(Predicate::lte(updated_at.clone(), format_timestamp(moment)))
            .with_sort(SortSpec::desc(updated_at))
            .with_sort(SortSpec::desc(self.model.qualified_version_column()));
        self.fetch_one(storage, query)
    }

    /// Every snapshot of an entity, oldest first
    pub fn find_all<S: Storage>(&self, storage: &S, ref_id: i64) -> VersioningResult<Vec<Snapshot>> {
        let query = self
            .entity_query(ref_id)
            .with_sort(SortSpec::asc(self.model.qualified_version_column()));
        self.fetch(storage, &query)
    }

    /// Removes the whole history of every listed entity
    pub fn delete_all<S: Storage>(&self, storage: &mut S, ref_ids: &[i64]) -> VersioningResult<usize> {
        let query = Query::new(&self.table).with_predicate(Predicate::is_in(
            self.model.qualified_version_key_name(),
            ref_ids.iter().copied(),
        ));
        storage
            .delete(&query)
            .map_err(|e| VersioningError::history_write(&self.table, e))
    }

    /// Moves every snapshot of `from` to entity `to`
    pub fn repoint<S: Storage>(&self, storage: &mut S, from: i64, to: i64) -> VersioningResult<usize> {
        let mut assignments = Row::new();
        assignments.insert(self.model.version_key_name(), Value::from(to));

        let moved = storage
            .update(&self.entity_query(from), &assignments, None)
            .map_err(|e| VersioningError::history_write(&self.table, e))?;

        log_event(
            Event::HistoryRepointed,
            EventFields::table(&self.table).ref_id(to).count(moved),
        );
        Ok(moved)
    }
}
