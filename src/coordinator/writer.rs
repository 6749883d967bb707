//! Write path
//!
//! Every mutation runs inside one storage transaction: the primary write
//! and the history appends commit together or not at all.
//!
//! Version numbering per entity:
//! - create writes snapshot 1 and sets `latest_version = 1`
//! - each update advances `latest_version` by one and appends the snapshot
//!   with that number, carrying forward omitted versioned fields
//! - a versioned soft delete marker is written as an update
//! - force delete removes the primary row and the whole history

use std::sync::Arc;

use serde_json::Value;

use super::affected::resolve_affected;
use crate::attributes::{AttributePartitioner, Partitioned};
use crate::clock::{parse_timestamp, timestamp_value, Clock};
use crate::errors::{VersioningError, VersioningResult};
use crate::history::HistoryStore;
use crate::model::ModelDefinition;
use crate::observability::{log_event, Event, EventFields};
use crate::planner::VersionedQuery;
use crate::primary::PrimaryStore;
use crate::query::Row;
use crate::storage::Storage;

/// Previous state of an entity about to be updated
struct Pending {
    id: i64,
    latest: u64,
    carried: Row,
}

pub struct WriteCoordinator<'a, C: Clock> {
    model: &'a Arc<ModelDefinition>,
    clock: &'a C,
    partitioner: AttributePartitioner,
}

impl<'a, C: Clock> WriteCoordinator<'a, C> {
    pub fn new(model: &'a Arc<ModelDefinition>, clock: &'a C) -> Self {
        Self {
            model,
            clock,
            partitioner: AttributePartitioner::new(model),
        }
    }

    fn primary(&self) -> PrimaryStore<'_> {
        PrimaryStore::new(self.model)
    }

    fn history(&self) -> HistoryStore<'_> {
        HistoryStore::new(self.model)
    }

    /// Partitions `attributes` and fills engine-owned timestamps
    pub fn prepare(&self, attributes: Row, creating: bool) -> VersioningResult<Partitioned> {
        let mut parts = self.partitioner.partition(attributes)?;

        // Engine-managed columns are never taken from callers
        parts.live.retain(|column, _| !self.model.is_reserved(column));
        parts.versioned.retain(|column, _| !self.model.is_reserved(column));
        self.normalize_timestamps(&mut parts)?;

        if self.model.timestamps {
            let now = timestamp_value(&self.clock.now());
            let mut stamped = vec![&self.model.updated_at];
            if creating {
                stamped.push(&self.model.created_at);
            }
            for column in stamped {
                if parts.live.contains_key(column) || parts.versioned.contains_key(column) {
                    continue;
                }
                let target = if self.partitioner.is_versioned(column) {
                    &mut parts.versioned
                } else {
                    &mut parts.live
                };
                target.insert(column.clone(), now.clone());
            }
        }

        Ok(parts)
    }

    /// Rewrites caller-supplied timestamps into the storage format.
    ///
    /// Only the soft delete marker may be null.
    fn normalize_timestamps(&self, parts: &mut Partitioned) -> VersioningResult<()> {
        let mut columns = Vec::new();
        if self.model.timestamps {
            columns.push((self.model.created_at.as_str(), false));
            columns.push((self.model.updated_at.as_str(), false));
        }
        if let Some(column) = &self.model.soft_delete {
            columns.push((column.as_str(), true));
        }

        for (column, nullable) in columns {
            for part in [&mut parts.live, &mut parts.versioned] {
                let value = match part.get_mut(column) {
                    Some(value) => value,
                    None => continue,
                };
                if value.is_null() && nullable {
                    continue;
                }
                let moment = parse_timestamp(value).ok_or_else(|| {
                    VersioningError::invalid_timestamp(column, value.to_string())
                })?;
                *value = timestamp_value(&moment);
            }
        }
        Ok(())
    }

    /// Inserts one entity with its first snapshot and returns the record
    pub fn create<S: Storage>(&self, storage: &mut S, attributes: Row) -> VersioningResult<Row> {
        let parts = self.prepare(attributes, true)?;
        let result: VersioningResult<_> = storage.transaction(|tx| self.insert_entity(tx, parts));
        self.finish(result)
    }

    /// Inserts every attribute set in a single transaction
    pub fn create_many<S, I>(&self, storage: &mut S, batch: I) -> VersioningResult<Vec<Row>>
    where
        S: Storage,
        I: IntoIterator<Item = Row>,
    {
        let prepared = batch
            .into_iter()
            .map(|attributes| self.prepare(attributes, true))
            .collect::<VersioningResult<Vec<_>>>()?;

        let result: VersioningResult<_> = storage.transaction(|tx| {
            prepared
                .into_iter()
                .map(|parts| self.insert_entity(tx, parts))
                .collect::<VersioningResult<Vec<_>>>()
        });
        self.finish(result)
    }

    fn insert_entity<S: Storage>(&self, storage: &mut S, parts: Partitioned) -> VersioningResult<Row> {
        let id = self.primary().insert(storage, parts.live)?;
        self.history().append(storage, id, 1, parts.versioned)?;

        let record = self.reload(storage, id)?;
        log_event(
            Event::EntityCreated,
            EventFields::table(&self.model.table).ref_id(id).version(1),
        );
        Ok(record)
    }

    fn reload<S: Storage>(&self, storage: &S, id: i64) -> VersioningResult<Row> {
        let query = VersionedQuery::new(Arc::clone(self.model))
            .with_trashed()
            .for_key(id);
        let row = storage
            .select(&query.build())
            .map_err(|e| VersioningError::read(&self.model.table, e))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                VersioningError::malformed(
                    &self.model.table,
                    format!("entity {} has no current snapshot", id),
                )
            })?;
        Ok(query.into_record(row))
    }

    /// Applies `attributes` to every entity `query` targets.
    ///
    /// Returns the number of entities that received a new snapshot.
    pub fn update<S: Storage>(
        &self,
        storage: &mut S,
        query: &VersionedQuery,
        attributes: Row,
    ) -> VersioningResult<usize> {
        let parts = self.prepare(attributes, false)?;
        self.apply(storage, query, &parts)
    }

    /// Updates the single entity stored under `id`.
    ///
    /// Returns the key the entity is stored under afterwards, or `None`
    /// when nothing was updated.
    pub fn update_one<S: Storage>(
        &self,
        storage: &mut S,
        query: &VersionedQuery,
        id: i64,
        attributes: Row,
    ) -> VersioningResult<Option<i64>> {
        let parts = self.prepare(attributes, false)?;
        let key = self.new_key(&parts)?.unwrap_or(id);
        let updated = self.apply(storage, query, &parts)?;
        Ok((updated > 0).then_some(key))
    }

    fn apply<S: Storage>(
        &self,
        storage: &mut S,
        query: &VersionedQuery,
        parts: &Partitioned,
    ) -> VersioningResult<usize> {
        let result: VersioningResult<_> = storage.transaction(|tx| {
            let ids = resolve_affected(tx, query)?;
            self.update_ids(tx, &ids, parts)
        });
        let updated = self.finish(result)?;

        log_event(
            Event::EntityUpdated,
            EventFields::table(&self.model.table)
                .ref_id_opt(query.bound_key())
                .count(updated),
        );
        Ok(updated)
    }

    /// The primary key an update moves entities to, if it sets one
    fn new_key(&self, parts: &Partitioned) -> VersioningResult<Option<i64>> {
        match parts.live.get(&self.model.primary_key) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                VersioningError::invalid_key(
                    self.model.primary_key.as_str(),
                    "primary key must be an integer",
                )
            }),
        }
    }

    fn update_ids<S: Storage>(
        &self,
        storage: &mut S,
        ids: &[i64],
        parts: &Partitioned,
    ) -> VersioningResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let primary = self.primary();
        let history = self.history();

        let new_key = self.new_key(parts)?;

        let mut pending = Vec::with_capacity(ids.len());
        for &id in ids {
            let latest = match primary.latest_version(storage, id)? {
                Some(latest) => latest,
                None => continue,
            };
            let carried = history
                .find_by_version(storage, id, latest)?
                .ok_or_else(|| {
                    VersioningError::malformed(
                        history.table(),
                        format!("snapshot {} of entity {} is missing", latest, id),
                    )
                })?
                .into_values();
            pending.push(Pending { id, latest, carried });
        }

        let live_ids: Vec<i64> = pending.iter().map(|p| p.id).collect();
        primary.increment_and_set(storage, &live_ids, &parts.live)?;

        for entity in pending {
            let target = new_key.unwrap_or(entity.id);
            if target != entity.id {
                history.repoint(storage, entity.id, target)?;
            }

            let mut values = entity.carried;
            for (column, value) in &parts.versioned {
                values.insert(column.clone(), value.clone());
            }
            history.append(storage, target, entity.latest + 1, values)?;
        }

        Ok(live_ids.len())
    }

    /// Soft deletes when the model has a marker column, otherwise force deletes
    pub fn delete<S: Storage>(&self, storage: &mut S, query: &VersionedQuery) -> VersioningResult<usize> {
        let column = match &self.model.soft_delete {
            Some(column) => column,
            None => return self.force_delete(storage, query),
        };

        let marker = timestamp_value(&self.clock.now());
        let deleted = self.mark(storage, query, column, marker)?;
        log_event(
            Event::EntitySoftDeleted,
            EventFields::table(&self.model.table)
                .ref_id_opt(query.bound_key())
                .count(deleted),
        );
        Ok(deleted)
    }

    /// Clears the soft delete marker of every trashed entity `query` targets
    pub fn restore<S: Storage>(&self, storage: &mut S, query: &VersionedQuery) -> VersioningResult<usize> {
        let column = match &self.model.soft_delete {
            Some(column) => column,
            None => return Ok(0),
        };

        let trashed = query.clone().only_trashed();
        let restored = self.mark(storage, &trashed, column, Value::Null)?;
        log_event(
            Event::EntityRestored,
            EventFields::table(&self.model.table)
                .ref_id_opt(query.bound_key())
                .count(restored),
        );
        Ok(restored)
    }

    fn mark<S: Storage>(
        &self,
        storage: &mut S,
        query: &VersionedQuery,
        column: &str,
        marker: Value,
    ) -> VersioningResult<usize> {
        let mut attributes = Row::new();
        attributes.insert(column.to_string(), marker);

        if self.model.soft_delete_is_versioned() {
            let parts = self.prepare(attributes, false)?;
            let result: VersioningResult<_> = storage.transaction(|tx| {
                let ids = resolve_affected(tx, query)?;
                self.update_ids(tx, &ids, &parts)
            });
            return self.finish(result);
        }

        // A live marker changes the primary row only
        let result: VersioningResult<_> = storage.transaction(|tx| {
            let ids = resolve_affected(tx, query)?;
            if ids.is_empty() {
                return Ok(0);
            }
            self.primary().set_columns(tx, &ids, &attributes)
        });
        self.finish(result)
    }

    /// Removes the primary rows and every snapshot of the targeted entities
    pub fn force_delete<S: Storage>(
        &self,
        storage: &mut S,
        query: &VersionedQuery,
    ) -> VersioningResult<usize> {
        let result: VersioningResult<_> = storage.transaction(|tx| {
            let ids = resolve_affected(tx, query)?;
            if ids.is_empty() {
                return Ok((0, 0));
            }
            let snapshots = self.history().delete_all(tx, &ids)?;
            let rows = self.primary().delete(tx, &ids)?;
            Ok((rows, snapshots))
        });
        let (rows, snapshots) = self.finish(result)?;

        log_event(
            Event::EntityForceDeleted,
            EventFields::table(&self.model.table)
                .ref_id_opt(query.bound_key())
                .count(rows + snapshots),
        );
        Ok(rows)
    }

    fn finish<T>(&self, result: VersioningResult<T>) -> VersioningResult<T> {
        if let Err(e) = &result {
            log_event(
                Event::MutationRolledBack,
                EventFields::table(&self.model.table).detail(e.code()),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::query::row_from_json;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn model() -> Arc<ModelDefinition> {
        Arc::new(
            ModelDefinition::new("users")
                .versioned(["email", "city", "updated_at", "deleted_at"])
                .live_columns(["username"])
                .soft_deletes("deleted_at"),
        )
    }

    fn setup(model: &ModelDefinition) -> MemoryStorage {
        let (primary, history) = model.table_schemas();
        let mut storage = MemoryStorage::new();
        storage.create_table(&primary).unwrap();
        storage.create_table(&history).unwrap();
        storage
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn attrs(value: serde_json::Value) -> Row {
        row_from_json(value).unwrap()
    }

    #[test]
    fn test_prepare_fills_timestamps_by_partition() {
        let model = model();
        let clock = clock();
        let writer = WriteCoordinator::new(&model, &clock);

        let parts = writer
            .prepare(attrs(json!({"username": "u", "city": "A"})), true)
            .unwrap();
        assert_eq!(parts.live["created_at"], json!("2024-01-01T00:00:00.000000Z"));
        assert_eq!(parts.versioned["updated_at"], json!("2024-01-01T00:00:00.000000Z"));
        assert!(!parts.live.contains_key("updated_at"));

        let parts = writer
            .prepare(attrs(json!({"updated_at": "2000-01-01T00:00:00.000000Z"})), false)
            .unwrap();
        assert_eq!(parts.versioned["updated_at"], json!("2000-01-01T00:00:00.000000Z"));
        assert!(!parts.live.contains_key("created_at"));
    }

    #[test]
    fn test_prepare_normalizes_caller_timestamps() {
        let model = model();
        let clock = clock();
        let writer = WriteCoordinator::new(&model, &clock);

        let parts = writer
            .prepare(
                attrs(json!({
                    "created_at": "2023-05-01T10:00:00+02:00",
                    "updated_at": "2023-05-02T08:00:00Z",
                    "deleted_at": null
                })),
                true,
            )
            .unwrap();
        assert_eq!(parts.live["created_at"], json!("2023-05-01T08:00:00.000000Z"));
        assert_eq!(parts.versioned["updated_at"], json!("2023-05-02T08:00:00.000000Z"));
        assert_eq!(parts.versioned["deleted_at"], Value::Null);
    }

    #[test]
    fn test_prepare_rejects_unparsable_timestamps() {
        let model = model();
        let clock = clock();
        let writer = WriteCoordinator::new(&model, &clock);

        for value in [json!("next tuesday"), json!(1700000000), Value::Null] {
            let err = writer
                .prepare(attrs(json!({"updated_at": value})), false)
                .unwrap_err();
            assert!(matches!(err, VersioningError::InvalidTimestamp { .. }));
        }
        let err = writer
            .prepare(attrs(json!({"deleted_at": "soon"})), false)
            .unwrap_err();
        assert_eq!(err.code(), "VERSION_INVALID_TIMESTAMP");
    }

    #[test]
    fn test_prepare_drops_engine_columns() {
        let model = model();
        let clock = clock();
        let writer = WriteCoordinator::new(&model, &clock);

        let parts = writer
            .prepare(
                attrs(json!({"latest_version": 9, "version": 4, "ref_id": 3, "city": "A"})),
                false,
            )
            .unwrap();
        assert!(!parts.live.contains_key("latest_version"));
        assert!(!parts.live.contains_key("version"));
        assert!(!parts.live.contains_key("ref_id"));
        assert_eq!(parts.versioned["city"], json!("A"));
    }

    #[test]
    fn test_create_writes_first_snapshot() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        let record = writer
            .create(&mut storage, attrs(json!({"username": "u", "city": "A"})))
            .unwrap();
        assert_eq!(record["id"], json!(1));
        assert_eq!(record["latest_version"], json!(1));
        assert_eq!(record["version"], json!(1));
        assert_eq!(record["city"], json!("A"));
        assert!(!record.contains_key("ref_id"));

        let snapshots = HistoryStore::new(&model).find_all(&storage, 1).unwrap();
        assert_eq!(snapshots.len(), 1);
    }

    #[test]
    fn test_create_rolls_back_on_history_failure() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        // Leftover snapshot 1 for the id the next insert will get
        HistoryStore::new(&model)
            .append(&mut storage, 1, 1, Row::new())
            .unwrap();

        let err = writer
            .create(&mut storage, attrs(json!({"username": "u"})))
            .unwrap_err();
        assert!(matches!(err, VersioningError::DuplicateVersion { ref_id: 1, version: 1 }));
        assert!(PrimaryStore::new(&model).find(&storage, 1).unwrap().is_none());
    }

    #[test]
    fn test_update_carries_forward_versioned_fields() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer
            .create(&mut storage, attrs(json!({"email": "a@x", "city": "A"})))
            .unwrap();
        clock.advance(Duration::hours(1));

        let query = VersionedQuery::new(Arc::clone(&model)).for_key(1);
        let updated = writer
            .update(&mut storage, &query, attrs(json!({"city": "B"})))
            .unwrap();
        assert_eq!(updated, 1);

        let second = HistoryStore::new(&model)
            .find_by_version(&storage, 1, 2)
            .unwrap()
            .unwrap();
        assert_eq!(second.get("email"), Some(&json!("a@x")));
        assert_eq!(second.get("city"), Some(&json!("B")));
        assert_eq!(second.get("updated_at"), Some(&json!("2024-01-01T01:00:00.000000Z")));
        assert_eq!(PrimaryStore::new(&model).latest_version(&storage, 1).unwrap(), Some(2));
    }

    #[test]
    fn test_mass_update_appends_per_entity() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        for city in ["A", "A", "B"] {
            writer.create(&mut storage, attrs(json!({"city": city}))).unwrap();
        }

        let query = VersionedQuery::new(Arc::clone(&model)).where_eq("city", "A");
        let updated = writer
            .update(&mut storage, &query, attrs(json!({"city": "C"})))
            .unwrap();
        assert_eq!(updated, 2);

        let primary = PrimaryStore::new(&model);
        assert_eq!(primary.latest_version(&storage, 1).unwrap(), Some(2));
        assert_eq!(primary.latest_version(&storage, 2).unwrap(), Some(2));
        assert_eq!(primary.latest_version(&storage, 3).unwrap(), Some(1));
    }

    #[test]
    fn test_update_with_new_key_repoints_history() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer.create(&mut storage, attrs(json!({"city": "A"}))).unwrap();
        let query = VersionedQuery::new(Arc::clone(&model)).for_key(1);
        writer
            .update(&mut storage, &query, attrs(json!({"id": 50, "city": "B"})))
            .unwrap();

        let history = HistoryStore::new(&model);
        assert!(history.find_all(&storage, 1).unwrap().is_empty());
        let versions: Vec<u64> = history
            .find_all(&storage, 50)
            .unwrap()
            .iter()
            .map(|s| s.version())
            .collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(PrimaryStore::new(&model).latest_version(&storage, 50).unwrap(), Some(2));
    }

    #[test]
    fn test_update_one_reports_resolved_key() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer.create(&mut storage, attrs(json!({"city": "A"}))).unwrap();
        let query = VersionedQuery::new(Arc::clone(&model)).for_key(1);
        let key = writer
            .update_one(&mut storage, &query, 1, attrs(json!({"users.id": 8})))
            .unwrap();
        assert_eq!(key, Some(8));

        let query = VersionedQuery::new(Arc::clone(&model)).for_key(1);
        let key = writer
            .update_one(&mut storage, &query, 1, attrs(json!({"city": "B"})))
            .unwrap();
        assert_eq!(key, None);
    }

    #[test]
    fn test_update_rejects_non_integer_key() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer.create(&mut storage, attrs(json!({"city": "A"}))).unwrap();
        let query = VersionedQuery::new(Arc::clone(&model)).for_key(1);
        let err = writer
            .update(&mut storage, &query, attrs(json!({"id": "x"})))
            .unwrap_err();
        assert_eq!(err.code(), "VERSION_INVALID_KEY_FORMAT");
        assert_eq!(PrimaryStore::new(&model).latest_version(&storage, 1).unwrap(), Some(1));
    }

    #[test]
    fn test_soft_delete_and_restore_append_snapshots() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer.create(&mut storage, attrs(json!({"city": "A"}))).unwrap();
        let query = VersionedQuery::new(Arc::clone(&model)).for_key(1);

        assert_eq!(writer.delete(&mut storage, &query).unwrap(), 1);
        let history = HistoryStore::new(&model);
        let deleted = history.find_by_version(&storage, 1, 2).unwrap().unwrap();
        assert_eq!(deleted.get("deleted_at"), Some(&json!("2024-01-01T00:00:00.000000Z")));
        assert_eq!(deleted.get("city"), Some(&json!("A")));
        assert!(PrimaryStore::new(&model).find(&storage, 1).unwrap().is_some());

        assert_eq!(writer.restore(&mut storage, &query).unwrap(), 1);
        let restored = history.find_by_version(&storage, 1, 3).unwrap().unwrap();
        assert_eq!(restored.get("deleted_at"), Some(&Value::Null));
    }

    #[test]
    fn test_live_soft_delete_marks_primary_only() {
        let model = Arc::new(
            ModelDefinition::new("posts")
                .versioned(["content", "updated_at"])
                .live_columns(["title"])
                .soft_deletes("deleted_at"),
        );
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer.create(&mut storage, attrs(json!({"content": "c"}))).unwrap();
        let all = VersionedQuery::new(Arc::clone(&model));
        assert_eq!(writer.delete(&mut storage, &all).unwrap(), 1);

        let primary = PrimaryStore::new(&model);
        let row = primary.find(&storage, 1).unwrap().unwrap();
        assert_eq!(row["deleted_at"], json!("2024-01-01T00:00:00.000000Z"));
        assert_eq!(primary.latest_version(&storage, 1).unwrap(), Some(1));

        // Already trashed, so the default scope no longer sees it
        assert_eq!(writer.delete(&mut storage, &all).unwrap(), 0);
        assert_eq!(writer.restore(&mut storage, &all).unwrap(), 1);
        let row = primary.find(&storage, 1).unwrap().unwrap();
        assert_eq!(row["deleted_at"], Value::Null);
    }

    #[test]
    fn test_force_delete_removes_everything() {
        let model = model();
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer.create(&mut storage, attrs(json!({"city": "A"}))).unwrap();
        writer.create(&mut storage, attrs(json!({"city": "B"}))).unwrap();
        let first = VersionedQuery::new(Arc::clone(&model)).for_key(1);
        writer
            .update(&mut storage, &first, attrs(json!({"city": "C"})))
            .unwrap();

        assert_eq!(writer.force_delete(&mut storage, &first).unwrap(), 1);
        let history = HistoryStore::new(&model);
        assert!(history.find_all(&storage, 1).unwrap().is_empty());
        assert!(PrimaryStore::new(&model).find(&storage, 1).unwrap().is_none());
        assert_eq!(history.find_all(&storage, 2).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_without_soft_deletes_is_force_delete() {
        let model = Arc::new(ModelDefinition::new("tags").versioned(["label"]));
        let clock = clock();
        let mut storage = setup(&model);
        let writer = WriteCoordinator::new(&model, &clock);

        writer.create(&mut storage, attrs(json!({"label": "x"}))).unwrap();
        let query = VersionedQuery::new(Arc::clone(&model)).for_key(1);
        assert_eq!(writer.delete(&mut storage, &query).unwrap(), 1);
        assert!(HistoryStore::new(&model).find_all(&storage, 1).unwrap().is_empty());
        assert_eq!(writer.restore(&mut storage, &query).unwrap(), 0);
    }
}
