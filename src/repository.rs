//! Versioned repository
//!
//! `Versioned` pairs a storage backend with one model and exposes the
//! public operations: query entry points for every read mode, record and
//! snapshot reads, and the mutations of the write path.
//!
//! ```ignore
//! let mut users = Versioned::new(MemoryStorage::new(), model)?;
//! users.install()?;
//! let user = users.create(attrs)?;
//! let first = users.get(&users.at_version(1))?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::coordinator::WriteCoordinator;
use crate::errors::{VersioningError, VersioningResult};
use crate::history::{HistoryStore, Snapshot};
use crate::model::ModelDefinition;
use crate::planner::VersionedQuery;
use crate::query::Row;
use crate::storage::Storage;

pub struct Versioned<S, C = SystemClock> {
    storage: S,
    clock: C,
    model: Arc<ModelDefinition>,
}

impl<S: Storage> Versioned<S, SystemClock> {
    /// Wraps `storage` for `model`, timestamps from the wall clock
    pub fn new(storage: S, model: impl Into<Arc<ModelDefinition>>) -> VersioningResult<Self> {
        Self::with_clock(storage, model, SystemClock)
    }
}

impl<S: Storage, C: Clock> Versioned<S, C> {
    pub fn with_clock(
        storage: S,
        model: impl Into<Arc<ModelDefinition>>,
        clock: C,
    ) -> VersioningResult<Self> {
        let model = model.into();
        model.validate()?;
        Ok(Self {
            storage,
            clock,
            model,
        })
    }

    /// Creates the primary and history tables if they are missing
    pub fn install(&mut self) -> VersioningResult<()> {
        let (primary, history) = self.model.table_schemas();
        for schema in [primary, history] {
            if !self.storage.has_table(&schema.name)? {
                self.storage.create_table(&schema)?;
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn history_store(&self) -> HistoryStore<'_> {
        HistoryStore::new(&self.model)
    }

    // ---- query entry points ----

    /// Current state of every entity
    pub fn query(&self) -> VersionedQuery {
        VersionedQuery::new(Arc::clone(&self.model))
    }

    pub fn at_version(&self, version: u64) -> VersionedQuery {
        self.query().at_version(version)
    }

    pub fn all_versions(&self) -> VersionedQuery {
        self.query().all_versions()
    }

    pub fn as_of(&self, moment: DateTime<Utc>) -> VersionedQuery {
        self.query().as_of(moment)
    }

    /// Query bound to one entity
    pub fn entity(&self, id: i64) -> VersionedQuery {
        self.query().for_key(id)
    }

    // ---- reads ----

    /// Executes `query` and returns its records
    pub fn get(&self, query: &VersionedQuery) -> VersioningResult<Vec<Row>> {
        query.check()?;
        let rows = self
            .storage
            .select(&query.build())
            .map_err(|e| VersioningError::read(&self.model.table, e))?;
        Ok(rows.into_iter().map(|row| query.into_record(row)).collect())
    }

    pub fn first(&self, query: &VersionedQuery) -> VersioningResult<Option<Row>> {
        let limited = query.clone().limit(1);
        Ok(self.get(&limited)?.into_iter().next())
    }

    pub fn count(&self, query: &VersionedQuery) -> VersioningResult<usize> {
        Ok(self.get(query)?.len())
    }

    /// Current state of one entity
    pub fn find(&self, id: i64) -> VersioningResult<Option<Row>> {
        self.first(&self.entity(id))
    }

    /// Every snapshot of an entity, oldest first
    pub fn history(&self, id: i64) -> VersioningResult<Vec<Snapshot>> {
        self.history_store().find_all(&self.storage, id)
    }

    pub fn snapshot(&self, id: i64, version: u64) -> VersioningResult<Option<Snapshot>> {
        self.history_store().find_by_version(&self.storage, id, version)
    }

    /// Snapshot of an entity in effect at `moment`
    pub fn snapshot_as_of(
        &self,
        id: i64,
        moment: DateTime<Utc>,
    ) -> VersioningResult<Option<Snapshot>> {
        self.history_store().find_by_moment(&self.storage, id, &moment)
    }

    // ---- writes ----

    pub fn create(&mut self, attributes: Row) -> VersioningResult<Row> {
        let writer = WriteCoordinator::new(&self.model, &self.clock);
        writer.create(&mut self.storage, attributes)
    }

    pub fn create_many<I>(&mut self, batch: I) -> VersioningResult<Vec<Row>>
    where
        I: IntoIterator<Item = Row>,
    {
        let writer = WriteCoordinator::new(&self.model, &self.clock);
        writer.create_many(&mut self.storage, batch)
    }

    /// Updates every entity `query` targets; returns how many changed
    pub fn update(&mut self, query: &VersionedQuery, attributes: Row) -> VersioningResult<usize> {
        let writer = WriteCoordinator::new(&self.model, &self.clock);
        writer.update(&mut self.storage, query, attributes)
    }

    /// Updates one entity and returns its new current state
    pub fn update_entity(&mut self, id: i64, attributes: Row) -> VersioningResult<Option<Row>> {
        let query = self.entity(id);
        let writer = WriteCoordinator::new(&self.model, &self.clock);
        match writer.update_one(&mut self.storage, &query, id, attributes)? {
            Some(key) => self.first(&self.query().with_trashed().for_key(key)),
            None => Ok(None),
        }
    }

    /// Soft deletes if the model has a marker column, otherwise force deletes
    pub fn delete(&mut self, query: &VersionedQuery) -> VersioningResult<usize> {
        let writer = WriteCoordinator::new(&self.model, &self.clock);
        writer.delete(&mut self.storage, query)
    }

    pub fn delete_entity(&mut self, id: i64) -> VersioningResult<bool> {
        let query = self.entity(id);
        Ok(self.delete(&query)? > 0)
    }

    /// Removes entities with their whole history
    pub fn force_delete(&mut self, query: &VersionedQuery) -> VersioningResult<usize> {
        let writer = WriteCoordinator::new(&self.model, &self.clock);
        writer.force_delete(&mut self.storage, query)
    }

    pub fn restore(&mut self, query: &VersionedQuery) -> VersioningResult<usize> {
        let writer = WriteCoordinator::new(&self.model, &self.clock);
        writer.restore(&mut self.storage, query)
    }
}
