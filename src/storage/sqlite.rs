//! SQLite storage backend
//!
//! Queries are rendered by `sql` and executed on a single connection.
//! Transactions map to savepoints, so they nest.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode};
use serde_json::Value;

use super::{sql, Increment, Storage, StorageError, StorageResult, TableSchema};
use crate::query::{Query, Row};

pub struct SqliteStorage {
    conn: Connection,
    /// Rowid-alias column per table, discovered lazily
    rowid_columns: HashMap<String, Option<String>>,
    depth: usize,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| map_error("", e))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| map_error("", e))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            rowid_columns: HashMap::new(),
            depth: 0,
        }
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn execute(&self, table: &str, statement: &sql::Statement) -> StorageResult<usize> {
        self.conn
            .execute(
                &statement.sql,
                params_from_iter(statement.params.iter().map(to_sql)),
            )
            .map_err(|e| map_error(table, e))
    }

    /// Returns the INTEGER PRIMARY KEY column of `table`, if it has one
    fn rowid_column(&mut self, table: &str) -> StorageResult<Option<String>> {
        if let Some(column) = self.rowid_columns.get(table) {
            return Ok(column.clone());
        }

        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", sql::quote(table)))
            .map_err(|e| map_error(table, e))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get(2)?;
                let key_position: i64 = row.get(5)?;
                Ok((name, declared, key_position))
            })
            .map_err(|e| map_error(table, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_error(table, e))?;
        drop(stmt);

        if columns.is_empty() {
            return Err(StorageError::UnknownTable(table.to_string()));
        }

        let keys: Vec<_> = columns.iter().filter(|(_, _, pk)| *pk > 0).collect();
        let rowid = match keys.as_slice() {
            [(name, declared, _)] if declared.eq_ignore_ascii_case("INTEGER") => Some(name.clone()),
            _ => None,
        };
        self.rowid_columns.insert(table.to_string(), rowid.clone());
        Ok(rowid)
    }
}

impl Storage for SqliteStorage {
    fn create_table(&mut self, schema: &TableSchema) -> StorageResult<()> {
        if self.has_table(&schema.name)? {
            return Err(StorageError::TableExists(schema.name.clone()));
        }
        for statement in sql::create_table(schema) {
            self.conn
                .execute_batch(&statement)
                .map_err(|e| map_error(&schema.name, e))?;
        }
        self.rowid_columns
            .insert(schema.name.clone(), schema.auto_increment.clone());
        Ok(())
    }

    fn has_table(&self, table: &str) -> StorageResult<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| map_error(table, e))?;
        Ok(count > 0)
    }

    fn select(&self, query: &Query) -> StorageResult<Vec<Row>> {
        let statement = sql::select(query);
        let mut stmt = self
            .conn
            .prepare(&statement.sql)
            .map_err(|e| map_error(&query.table, e))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(statement.params.iter().map(to_sql)))
            .map_err(|e| map_error(&query.table, e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| map_error(&query.table, e))? {
            let mut record = Row::new();
            for (index, name) in names.iter().enumerate() {
                let value = row.get_ref(index).map_err(|e| map_error(&query.table, e))?;
                record.insert(name.clone(), from_sql(value));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn insert(&mut self, table: &str, row: Row) -> StorageResult<Option<i64>> {
        let rowid = self.rowid_column(table)?;
        self.execute(table, &sql::insert(table, &row))?;
        Ok(rowid.map(|_| self.conn.last_insert_rowid()))
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
        match sql::update(query, assignments, increment) {
            Some(statement) => self.execute(&query.table, &statement),
            None => Ok(self.select(query)?.len()),
        }
    }

    fn delete(&mut self, query: &Query) -> StorageResult<usize> {
        if !query.joins.is_empty() {
            return Err(StorageError::Unsupported("delete with joins".to_string()));
        }
        self.execute(&query.table, &sql::delete(query))
    }

    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StorageError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let savepoint = format!("versionable_{}", self.depth);
        self.conn
            .execute_batch(&format!("SAVEPOINT {}", savepoint))
            .map_err(|e| E::from(map_error("", e)))?;

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;

        let finish = match &result {
            Ok(_) => format!("RELEASE SAVEPOINT {}", savepoint),
            Err(_) => format!(
                "ROLLBACK TO SAVEPOINT {0}; RELEASE SAVEPOINT {0}",
                savepoint
            ),
        };
        if result.is_err() {
            // Cached key columns may describe tables created in the rolled back scope
            self.rowid_columns.clear();
        }

        match (result, self.conn.execute_batch(&finish)) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(E::from(map_error("", e))),
            (Err(e), _) => Err(e),
        }
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        // Never written by `to_sql`; only rows written by other clients carry blobs
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

fn map_error(table: &str, err: rusqlite::Error) -> StorageError {
    if let rusqlite::Error::SqliteFailure(inner, detail) = &err {
        if inner.code == ErrorCode::ConstraintViolation {
            let detail = detail.clone().unwrap_or_else(|| inner.to_string());
            return StorageError::constraint(table, detail);
        }
    }

    let message = err.to_string();
    if let Some(rest) = message.strip_prefix("no such table: ") {
        return StorageError::UnknownTable(rest.to_string());
    }
    if let Some(rest) = message.strip_prefix("no such column: ") {
        let column = rest.rsplit('.').next().unwrap_or(rest);
        return StorageError::unknown_column(table, column);
    }
    if let Some((_, column)) = message.split_once(" has no column named ") {
        return StorageError::unknown_column(table, column);
    }
    StorageError::Backend(message)
}
