//! Storage backends
//!
//! The versioning engine never talks to a database directly. It issues
//! `Query` values and row maps through the `Storage` trait:
//! - `MemoryStorage` evaluates queries in process
//! - `SqliteStorage` (feature `sqlite`) renders them to SQL
//!
//! Every backend must provide:
//! - primary key uniqueness, reported as `ConstraintViolation`
//! - all-or-nothing transactions that nest

mod errors;
mod memory;
#[cfg(feature = "sqlite")]
mod sql;
#[cfg(feature = "sqlite")]
mod sqlite;
mod table;

pub use errors::{Severity, StorageError, StorageResult};
pub use memory::MemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
pub use table::TableSchema;

use crate::query::{Query, Row};

/// Column arithmetic applied alongside an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    pub column: String,
    pub amount: i64,
}

impl Increment {
    pub fn new(column: impl Into<String>, amount: i64) -> Self {
        Self {
            column: column.into(),
            amount,
        }
    }
}

/// Query-capable relational storage
pub trait Storage {
    /// Creates a table; fails with `TableExists` if it is already present
    fn create_table(&mut self, schema: &TableSchema) -> StorageResult<()>;

    /// Returns true if the table exists
    fn has_table(&self, table: &str) -> StorageResult<bool>;

    /// Executes a query.
    ///
    /// Joined rows are flattened into one map, later tables overwriting
    /// earlier ones on name collisions. Columns of a left join without a
    /// match are present with null values.
    fn select(&self, query: &Query) -> StorageResult<Vec<Row>>;

    /// Inserts one row and returns the generated key, if the table has one
    fn insert(&mut self, table: &str, row: Row) -> StorageResult<Option<i64>>;

    /// Updates every base-table row matching the query's predicates.
    ///
    /// Queries with joins are rejected. Returns the number of rows matched.
    fn update(
        &mut self,
        query: &Query,
        assignments: &Row,
        increment: Option<&Increment>,
    ) -> StorageResult<usize>;

    /// Deletes every base-table row matching the query's predicates.
    ///
    /// Queries with joins are rejected. Returns the number of rows removed.
    fn delete(&mut self, query: &Query) -> StorageResult<usize>;

    /// Runs `f` atomically: an `Err` undoes every write made inside it.
    ///
    /// Nested calls roll back only their own writes.
    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StorageError>,
        F: FnOnce(&mut Self) -> Result<T, E>;
}
