//! In-process storage backend
//!
//! Tables are vectors of rows. Joins are evaluated as nested loops,
//! transactions snapshot the whole table set and restore it on failure.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::{Increment, Storage, StorageError, StorageResult, TableSchema};
use crate::query::{
    ColumnLookup, ColumnRef, FirstMatch, Join, JoinConstraint, JoinKind, PredicateFilter, Query,
    ResultSorter, Row, SortSpec,
};

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: TableSchema,
    rows: Vec<Row>,
    next_id: i64,
}

impl MemoryTable {
    fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn key_of(&self, row: &Row) -> String {
        let key: Vec<Value> = self
            .schema
            .primary_key
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
            .collect();
        Value::Array(key).to_string()
    }

    fn check_column(&self, column: &str) -> StorageResult<()> {
        if self.schema.has_column(column) {
            Ok(())
        } else {
            Err(StorageError::unknown_column(&self.schema.name, column))
        }
    }

    /// Returns the first duplicated primary key among `rows`
    fn duplicate_key(&self, rows: &[Row]) -> Option<String> {
        if self.schema.primary_key.is_empty() {
            return None;
        }
        let mut seen = HashSet::new();
        rows.iter()
            .map(|row| self.key_of(row))
            .find(|key| !seen.insert(key.clone()))
    }
}

/// One row of a join in progress. Left-join misses carry `None`.
#[derive(Clone)]
struct JoinedRow<'a> {
    parts: Vec<(&'a MemoryTable, Option<&'a Row>)>,
}

impl<'a> ColumnLookup for JoinedRow<'a> {
    fn lookup(&self, column: &ColumnRef) -> Option<&Value> {
        match &column.table {
            Some(table) => self
                .parts
                .iter()
                .find(|(t, _)| t.schema.name == *table)?
                .1?
                .get(&column.name),
            None => self
                .parts
                .iter()
                .filter_map(|(_, row)| *row)
                .find_map(|row| row.get(&column.name)),
        }
    }
}

impl<'a> JoinedRow<'a> {
    fn flatten(&self) -> Row {
        let mut out = Row::new();
        for (table, part) in &self.parts {
            match part {
                Some(row) => out.extend(row.iter().map(|(k, v)| (k.clone(), v.clone()))),
                None => {
                    for column in &table.schema.columns {
                        out.insert(column.clone(), Value::Null);
                    }
                }
            }
        }
        out
    }
}

/// Storage held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: BTreeMap<String, MemoryTable>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> StorageResult<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| StorageError::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> StorageResult<&mut MemoryTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StorageError::UnknownTable(name.to_string()))
    }

    /// Rejects references to tables or columns outside the query's scope
    fn validate(&self, query: &Query) -> StorageResult<()> {
        let mut scope = vec![self.table(&query.table)?];
        for join in &query.joins {
            scope.push(self.table(&join.table)?);
        }

        let check = |column: &ColumnRef| -> StorageResult<()> {
            match &column.table {
                Some(name) => scope
                    .iter()
                    .find(|t| t.schema.name == *name)
                    .ok_or_else(|| StorageError::UnknownTable(name.clone()))?
                    .check_column(&column.name),
                None if scope.iter().any(|t| t.schema.has_column(&column.name)) => Ok(()),
                None => Err(StorageError::unknown_column(&query.table, &column.name)),
            }
        };

        for predicate in &query.predicates {
            check(&predicate.column)?;
        }
        for sort in &query.order {
            check(&sort.column)?;
        }
        for join in &query.joins {
            let target = self.table(&join.table)?;
            for constraint in &join.constraints {
                match constraint {
                    JoinConstraint::Columns { left, right } => {
                        check(left)?;
                        check(right)?;
                    }
                    JoinConstraint::Filter(predicate) => check(&predicate.column)?,
                    JoinConstraint::FirstMatch(first) => {
                        target.check_column(&first.key)?;
                        for (inner, outer) in &first.correlate {
                            target.check_column(inner)?;
                            check(outer)?;
                        }
                        for (column, _) in &first.filter {
                            target.check_column(column)?;
                        }
                        for (column, _) in &first.order {
                            target.check_column(column)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_join<'a>(
        rows: Vec<JoinedRow<'a>>,
        join: &Join,
        target: &'a MemoryTable,
    ) -> Vec<JoinedRow<'a>> {
        let mut out = Vec::new();

        for row in rows {
            let first_keys: Vec<Option<Value>> = join
                .constraints
                .iter()
                .map(|constraint| match constraint {
                    JoinConstraint::FirstMatch(first) => Self::first_match_key(&row, first, target),
                    _ => None,
                })
                .collect();

            let mut matched = false;
            for candidate in &target.rows {
                let mut extended = row.clone();
                extended.parts.push((target, Some(candidate)));

                let accepted = join.constraints.iter().zip(&first_keys).all(|(constraint, key)| {
                    match constraint {
                        JoinConstraint::Columns { left, right } => PredicateFilter::values_equal(
                            extended.lookup(left),
                            extended.lookup(right),
                        ),
                        JoinConstraint::Filter(predicate) => {
                            PredicateFilter::matches_predicate(&extended, predicate)
                        }
                        JoinConstraint::FirstMatch(first) => {
                            PredicateFilter::values_equal(candidate.get(&first.key), key.as_ref())
                        }
                    }
                });

                if accepted {
                    matched = true;
                    out.push(extended);
                }
            }

            if !matched && join.kind == JoinKind::Left {
                let mut missed = row;
                missed.parts.push((target, None));
                out.push(missed);
            }
        }

        out
    }

    /// Key of the top joined-table row for the outer row's group
    fn first_match_key(
        outer: &JoinedRow<'_>,
        first: &FirstMatch,
        target: &MemoryTable,
    ) -> Option<Value> {
        let mut group: Vec<&Row> = target
            .rows
            .iter()
            .filter(|candidate| {
                first.correlate.iter().all(|(inner, outer_column)| {
                    PredicateFilter::values_equal(candidate.get(inner), outer.lookup(outer_column))
                }) && first
                    .filter
                    .iter()
                    .all(|(column, op)| PredicateFilter::matches_op(candidate.get(column), op))
            })
            .collect();

        let order: Vec<SortSpec> = first
            .order
            .iter()
            .map(|(column, direction)| SortSpec {
                column: ColumnRef::new(column.clone()),
                direction: *direction,
            })
            .collect();
        ResultSorter::sort(&mut group, &order);

        group.first().and_then(|row| row.get(&first.key)).cloned()
    }
}

impl Storage for MemoryStorage {
    fn create_table(&mut self, schema: &TableSchema) -> StorageResult<()> {
        if self.tables.contains_key(&schema.name) {
            return Err(StorageError::TableExists(schema.name.clone()));
        }
        for column in schema.primary_key.iter().chain(schema.indexes.iter().flatten()) {
            if !schema.has_column(column) {
                return Err(StorageError::unknown_column(&schema.name, column));
            }
        }
        self.tables
            .insert(schema.name.clone(), MemoryTable::new(schema.clone()));
        Ok(())
    }

    fn has_table(&self, table: &str) -> StorageResult<bool> {
        Ok(self.tables.contains_key(table))
    }

    fn select(&self, query: &Query) -> StorageResult<Vec<Row>> {
        self.validate(query)?;

        let base = self.table(&query.table)?;
        let mut joined: Vec<JoinedRow<'_>> = base
            .rows
            .iter()
            .map(|row| JoinedRow {
                parts: vec![(base, Some(row))],
            })
            .collect();

        for join in &query.joins {
            let target = self.table(&join.table)?;
            joined = Self::apply_join(joined, join, target);
        }

        joined.retain(|row| PredicateFilter::matches(row, &query.predicates));
        ResultSorter::sort(&mut joined, &query.order);

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        Ok(joined
            .iter()
            .skip(offset)
            .take(limit)
            .map(JoinedRow::flatten)
            .collect())
    }

    fn insert(&mut self, table: &str, mut row: Row) -> StorageResult<Option<i64>> {
        let target = self.table_mut(table)?;
        for column in row.keys() {
            target.check_column(column)?;
        }

        let generated = match target.schema.auto_increment.clone() {
            Some(column) => {
                let id = match row.get(&column) {
                    Some(value) if !value.is_null() => value.as_i64().ok_or_else(|| {
                        StorageError::constraint(table, format!("'{}' must be an integer", column))
                    })?,
                    _ => target.next_id,
                };
                row.insert(column, Value::from(id));
                Some(id)
            }
            None => None,
        };

        for column in &target.schema.columns {
            row.entry(column.clone()).or_insert(Value::Null);
        }

        if !target.schema.primary_key.is_empty() {
            let key = target.key_of(&row);
            if target.rows.iter().any(|existing| target.key_of(existing) == key) {
                return Err(StorageError::constraint(
                    table,
                    format!("duplicate primary key {}", key),
                ));
            }
        }

        if let Some(id) = generated {
            target.next_id = target.next_id.max(id.saturating_add(1));
        }
        target.rows.push(row);
        Ok(generated)
    }

    fn update(
        &mut self,
        query: &Query,
        assignments: &Row,
        increment: Option<&Increment>,
    ) -> StorageResult<usize> {
        if !query.joins.is_empty() {
            return Err(StorageError::Unsupported("update with joins".to_string()));
        }
        self.validate(query)?;

        let target = self.table_mut(&query.table)?;
        for column in assignments.keys().chain(increment.map(|i| &i.column)) {
            target.check_column(column)?;
        }

        let mut rows = target.rows.clone();
        let mut matched = 0;
        for row in rows.iter_mut() {
            if !PredicateFilter::matches(&*row, &query.predicates) {
                continue;
            }
            matched += 1;
            for (column, value) in assignments {
                row.insert(column.clone(), value.clone());
            }
            if let Some(increment) = increment {
                let current = row
                    .get(&increment.column)
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let next = current.saturating_add(increment.amount);
                row.insert(increment.column.clone(), Value::from(next));
            }
        }

        if let Some(key) = target.duplicate_key(&rows) {
            return Err(StorageError::constraint(
                &query.table,
                format!("duplicate primary key {}", key),
            ));
        }

        if let Some(column) = target.schema.auto_increment.clone() {
            let highest = rows
                .iter()
                .filter_map(|row| row.get(&column).and_then(Value::as_i64))
                .max()
                .unwrap_or(0);
            target.next_id = target.next_id.max(highest.saturating_add(1));
        }
        target.rows = rows;
        Ok(matched)
    }

    fn delete(&mut self, query: &Query) -> StorageResult<usize> {
        if !query.joins.is_empty() {
            return Err(StorageError::Unsupported("delete with joins".to_string()));
        }
        self.validate(query)?;

        let target = self.table_mut(&query.table)?;
        let before = target.rows.len();
        target
            .rows
            .retain(|row| !PredicateFilter::matches(row, &query.predicates));
        Ok(before - target.rows.len())
    }

    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StorageError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let checkpoint = self.tables.clone();
        let result = f(self);
        if result.is_err() {
            self.tables = checkpoint;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{row_from_json, FilterOp, Predicate, SortDirection};
    use serde_json::json;

    fn row(value: Value) -> Row {
        row_from_json(value).unwrap()
    }

    fn storage() -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage
            .create_table(
                &TableSchema::new("users")
                    .auto_increment("id")
                    .columns(["latest_version", "username"]),
            )
            .unwrap();
        storage
            .create_table(
                &TableSchema::new("users_version")
                    .columns(["ref_id", "version", "city", "updated_at"])
                    .primary_key(["ref_id", "version"]),
            )
            .unwrap();
        storage
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut storage = storage();
        let first = storage.insert("users", row(json!({"username": "a"}))).unwrap();
        let second = storage.insert("users", row(json!({"username": "b"}))).unwrap();
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));

        let rows = storage.select(&Query::new("users")).unwrap();
        assert_eq!(rows.len(), 2);
        // Missing columns are stored as null
        assert_eq!(rows[0]["latest_version"], Value::Null);
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let mut storage = storage();
        let snapshot = row(json!({"ref_id": 1, "version": 1, "city": "A"}));
        storage.insert("users_version", snapshot.clone()).unwrap();

        let err = storage.insert("users_version", snapshot).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut storage = storage();
        let err = storage
            .insert("users", row(json!({"nickname": "x"})))
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_UNKNOWN_COLUMN");

        let query = Query::new("users").filter_eq(ColumnRef::new("nickname"), "x");
        assert!(storage.select(&query).is_err());
    }

    #[test]
    fn test_inner_and_left_joins() {
        let mut storage = storage();
        storage.insert("users", row(json!({"username": "a"}))).unwrap();
        storage.insert("users", row(json!({"username": "b"}))).unwrap();
        storage
            .insert("users_version", row(json!({"ref_id": 1, "version": 1, "city": "A"})))
            .unwrap();

        let on = |join: Join| {
            join.on(
                ColumnRef::qualified("users", "id"),
                ColumnRef::qualified("users_version", "ref_id"),
            )
        };

        let inner = Query::new("users").with_join(on(Join::inner("users_version")));
        let rows = storage.select(&inner).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["city"], json!("A"));

        let left = Query::new("users")
            .with_join(on(Join::left("users_version")))
            .with_sort(SortSpec::asc(ColumnRef::qualified("users", "id")));
        let rows = storage.select(&left).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["username"], json!("b"));
        assert_eq!(rows[1]["city"], Value::Null);
    }

    #[test]
    fn test_first_match_selects_top_row_per_group() {
        let mut storage = storage();
        storage.insert("users", row(json!({"username": "a"}))).unwrap();
        for (version, city, at) in [(1, "A", "t1"), (2, "B", "t2"), (3, "C", "t3")] {
            storage
                .insert(
                    "users_version",
                    row(json!({"ref_id": 1, "version": version, "city": city, "updated_at": at})),
                )
                .unwrap();
        }

        let join = Join::inner("users_version")
            .on(
                ColumnRef::qualified("users", "id"),
                ColumnRef::qualified("users_version", "ref_id"),
            )
            .first_match(FirstMatch {
                key: "version".to_string(),
                correlate: vec![("ref_id".to_string(), ColumnRef::qualified("users", "id"))],
                filter: vec![("updated_at".to_string(), FilterOp::Lte(json!("t2")))],
                order: vec![
                    ("updated_at".to_string(), SortDirection::Desc),
                    ("version".to_string(), SortDirection::Desc),
                ],
            });

        let rows = storage.select(&Query::new("users").with_join(join)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["city"], json!("B"));
    }

    #[test]
    fn test_update_rejects_joins() {
        let mut storage = storage();
        let query = Query::new("users").with_join(Join::inner("users_version"));
        let err = storage.update(&query, &Row::new(), None).unwrap_err();
        assert_eq!(err.code(), "STORAGE_UNSUPPORTED");
    }

    #[test]
    fn test_update_with_increment() {
        let mut storage = storage();
        storage
            .insert("users", row(json!({"username": "a", "latest_version": 1})))
            .unwrap();

        let query = Query::new("users").with_predicate(Predicate::is_in(
            ColumnRef::qualified("users", "id"),
            [1],
        ));
        let count = storage
            .update(
                &query,
                &row(json!({"username": "z"})),
                Some(&Increment::new("latest_version", 1)),
            )
            .unwrap();
        assert_eq!(count, 1);

        let rows = storage.select(&Query::new("users")).unwrap();
        assert_eq!(rows[0]["latest_version"], json!(2));
        assert_eq!(rows[0]["username"], json!("z"));
    }

    #[test]
    fn test_update_key_collision_leaves_rows_untouched() {
        let mut storage = storage();
        storage.insert("users", row(json!({"username": "a"}))).unwrap();
        storage.insert("users", row(json!({"username": "b"}))).unwrap();

        let query = Query::new("users").filter_eq(ColumnRef::new("id"), 2);
        let err = storage
            .update(&query, &row(json!({"id": 1})), None)
            .unwrap_err();
        assert!(err.is_constraint_violation());

        let rows = storage.select(&Query::new("users")).unwrap();
        assert_eq!(rows[1]["id"], json!(2));
    }

    #[test]
    fn test_delete_counts_removed_rows() {
        let mut storage = storage();
        storage.insert("users", row(json!({"username": "a"}))).unwrap();
        storage.insert("users", row(json!({"username": "b"}))).unwrap();

        let query = Query::new("users").filter_eq(ColumnRef::new("username"), "a");
        assert_eq!(storage.delete(&query).unwrap(), 1);
        assert_eq!(storage.select(&Query::new("users")).unwrap().len(), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut storage = storage();
        let result: Result<(), StorageError> = storage.transaction(|s| {
            s.insert("users", row(json!({"username": "a"})))?;
            Err(StorageError::Backend("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(storage.select(&Query::new("users")).unwrap().is_empty());
    }

    #[test]
    fn test_nested_transaction_rolls_back_inner_only() {
        let mut storage = storage();
        let result: Result<(), StorageError> = storage.transaction(|s| {
            s.insert("users", row(json!({"username": "outer"})))?;
            let inner: Result<(), StorageError> = s.transaction(|s| {
                s.insert("users", row(json!({"username": "inner"})))?;
                Err(StorageError::Backend("inner".to_string()))
            });
            assert!(inner.is_err());
            Ok(())
        });
        assert!(result.is_ok());

        let rows = storage.select(&Query::new("users")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], json!("outer"));
    }

    #[test]
    fn test_explicit_max_id_exhausts_generator() {
        let mut storage = storage();
        let id = storage
            .insert("users", row(json!({"id": i64::MAX, "username": "last"})))
            .unwrap();
        assert_eq!(id, Some(i64::MAX));

        let err = storage
            .insert("users", row(json!({"username": "next"})))
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_CONSTRAINT_VIOLATION");
        assert_eq!(storage.select(&Query::new("users")).unwrap().len(), 1);
    }

    #[test]
    fn test_create_table_twice_fails() {
        let mut storage = storage();
        let err = storage
            .create_table(&TableSchema::new("users").auto_increment("id"))
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_TABLE_EXISTS");
        assert!(storage.has_table("users").unwrap());
        assert!(!storage.has_table("teams").unwrap());
    }
}
