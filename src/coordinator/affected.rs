//! Resolution of the entities a mutation applies to

use std::collections::HashSet;

use serde_json::Value;

use crate::errors::{VersioningError, VersioningResult};
use crate::planner::VersionedQuery;
use crate::primary::PrimaryStore;
use crate::storage::Storage;

/// Primary keys targeted by `query`, in result order without duplicates.
///
/// A bound query targets its entity alone, whatever its other filters or
/// soft delete scope say. Unbound queries are executed with their history
/// join intact, so filters on versioned columns narrow the set.
pub(crate) fn resolve_affected<S: Storage>(
    storage: &S,
    query: &VersionedQuery,
) -> VersioningResult<Vec<i64>> {
    let model = query.model();

    if let Some(id) = query.bound_key() {
        let exists = PrimaryStore::new(model).find(storage, id)?.is_some();
        return Ok(if exists { vec![id] } else { Vec::new() });
    }

    query.check()?;
    let rows = storage
        .select(&query.build())
        .map_err(|e| VersioningError::read(&model.table, e))?;

    // The version key comes from the history join and equals the primary key
    let key = model.version_key_name();
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for row in rows {
        let id = row
            .get(&key)
            .or_else(|| row.get(&model.primary_key))
            .and_then(Value::as_i64)
            .ok_or_else(|| VersioningError::malformed(&model.table, "result row has no key"))?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelDefinition;
    use crate::query::row_from_json;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<ModelDefinition>, MemoryStorage) {
        let model = Arc::new(
            ModelDefinition::new("users")
                .versioned(["city"])
                .without_timestamps(),
        );
        let (primary, history) = model.table_schemas();
        let mut storage = MemoryStorage::new();
        storage.create_table(&primary).unwrap();
        storage.create_table(&history).unwrap();

        let rows = [
            json!({"id": 1, "latest_version": 2}),
            json!({"id": 2, "latest_version": 1}),
        ];
        for row in rows {
            storage.insert("users", row_from_json(row).unwrap()).unwrap();
        }
        let snapshots = [
            json!({"ref_id": 1, "version": 1, "city": "A"}),
            json!({"ref_id": 1, "version": 2, "city": "B"}),
            json!({"ref_id": 2, "version": 1, "city": "A"}),
        ];
        for row in snapshots {
            storage.insert("users_version", row_from_json(row).unwrap()).unwrap();
        }
        (model, storage)
    }

    #[test]
    fn test_filters_on_versioned_columns_use_mode() {
        let (model, storage) = setup();

        let current = VersionedQuery::new(Arc::clone(&model)).where_eq("city", "A");
        assert_eq!(resolve_affected(&storage, &current).unwrap(), vec![2]);

        let historical = VersionedQuery::new(model).at_version(1).where_eq("city", "A");
        assert_eq!(resolve_affected(&storage, &historical).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_all_versions_deduplicates() {
        let (model, storage) = setup();
        let query = VersionedQuery::new(model).all_versions();
        assert_eq!(resolve_affected(&storage, &query).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_bound_query_targets_one_entity() {
        let (model, storage) = setup();
        let bound = VersionedQuery::new(Arc::clone(&model)).for_key(2).where_eq("city", "Z");
        assert_eq!(resolve_affected(&storage, &bound).unwrap(), vec![2]);

        let missing = VersionedQuery::new(model).for_key(42);
        assert!(resolve_affected(&storage, &missing).unwrap().is_empty());
    }
}
