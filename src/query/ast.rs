//! Query AST shared by the versioning engine and the storage backends
//!
//! A query targets one base table and carries:
//! - predicates (all combined with AND)
//! - joins, each with its own ON constraints
//! - ordering, limit and offset
//!
//! Joins are plain data so the planner can introspect and remove the
//! joins it added earlier.

use std::collections::BTreeMap;

use serde_json::Value;

/// A row as exchanged with storage: column name -> value
pub type Row = BTreeMap<String, Value>;

/// Column reference, optionally qualified by a table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Owning table, if qualified
    pub table: Option<String>,
    /// Column name
    pub name: String,
}

impl ColumnRef {
    /// Creates an unqualified column reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// Creates a table-qualified column reference
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Returns `table.name` or just `name` when unqualified
    pub fn qualified_name(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.name),
            None => self.name.clone(),
        }
    }

    /// Returns true if this column belongs to `table` (or is unqualified)
    pub fn may_belong_to(&self, table: &str) -> bool {
        self.table.as_deref().map_or(true, |t| t == table)
    }
}

/// Filter operation types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Equality: column = value
    Eq(Value),
    /// Greater than or equal: column >= value
    Gte(Value),
    /// Greater than: column > value
    Gt(Value),
    /// Less than or equal: column <= value
    Lte(Value),
    /// Less than: column < value
    Lt(Value),
    /// Membership: column IN (values)
    In(Vec<Value>),
    /// column IS NULL
    IsNull,
    /// column IS NOT NULL
    IsNotNull,
}

/// A single predicate (column + operation)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Column the predicate applies to
    pub column: ColumnRef,
    /// Filter operation
    pub op: FilterOp,
}

impl Predicate {
    /// Creates a predicate from parts
    pub fn new(column: ColumnRef, op: FilterOp) -> Self {
        Self { column, op }
    }

    /// Create an equality predicate
    pub fn eq(column: ColumnRef, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq(value.into()))
    }

    /// Create a range predicate (gte)
    pub fn gte(column: ColumnRef, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gte(value.into()))
    }

    /// Create a range predicate (gt)
    pub fn gt(column: ColumnRef, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gt(value.into()))
    }

    /// Create a range predicate (lte)
    pub fn lte(column: ColumnRef, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lte(value.into()))
    }

    /// Create a range predicate (lt)
    pub fn lt(column: ColumnRef, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lt(value.into()))
    }

    /// Create a membership predicate
    pub fn is_in(column: ColumnRef, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::new(column, FilterOp::In(values.into_iter().map(Into::into).collect()))
    }

    /// Create an IS NULL predicate
    pub fn is_null(column: ColumnRef) -> Self {
        Self::new(column, FilterOp::IsNull)
    }

    /// Create an IS NOT NULL predicate
    pub fn is_not_null(column: ColumnRef) -> Self {
        Self::new(column, FilterOp::IsNotNull)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Column to sort by
    pub column: ColumnRef,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(column: ColumnRef) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: ColumnRef) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// Join kinds supported by the storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
        }
    }
}

/// Per-group top-1 selection against the joined table.
///
/// A joined row qualifies only if its `key` column equals the `key` of the
/// first joined-table row that matches every `correlate` pair and `filter`,
/// taken in `order`. Correlation pairs are (joined-table column, outer column).
#[derive(Debug, Clone, PartialEq)]
pub struct FirstMatch {
    /// Column that identifies the selected row within its group
    pub key: String,
    /// (joined-table column, outer column) equalities
    pub correlate: Vec<(String, ColumnRef)>,
    /// Filters on joined-table columns
    pub filter: Vec<(String, FilterOp)>,
    /// Ordering on joined-table columns
    pub order: Vec<(String, SortDirection)>,
}

/// A single ON constraint of a join
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    /// left = right
    Columns { left: ColumnRef, right: ColumnRef },
    /// Predicate evaluated while joining
    Filter(Predicate),
    /// Per-group top-1 selection
    FirstMatch(FirstMatch),
}

/// A join against another table
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join kind
    pub kind: JoinKind,
    /// Joined table
    pub table: String,
    /// ON constraints (all combined with AND)
    pub constraints: Vec<JoinConstraint>,
}

impl Join {
    /// Creates an inner join with no constraints
    pub fn inner(table: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Inner,
            table: table.into(),
            constraints: Vec::new(),
        }
    }

    /// Creates a left join with no constraints
    pub fn left(table: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Left,
            table: table.into(),
            constraints: Vec::new(),
        }
    }

    /// Adds a column equality constraint
    pub fn on(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.constraints.push(JoinConstraint::Columns { left, right });
        self
    }

    /// Adds a predicate constraint
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.constraints.push(JoinConstraint::Filter(predicate));
        self
    }

    /// Adds a per-group top-1 constraint
    pub fn first_match(mut self, first: FirstMatch) -> Self {
        self.constraints.push(JoinConstraint::FirstMatch(first));
        self
    }

    /// Returns true if this join has the given kind and target table
    pub fn targets(&self, kind: JoinKind, table: &str) -> bool {
        self.kind == kind && self.table == table
    }
}

/// Filtered query against a base table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Base table
    pub table: String,
    /// Filter predicates (all combined with AND)
    pub predicates: Vec<Predicate>,
    /// Joins in application order
    pub joins: Vec<Join>,
    /// Ordering, applied left to right
    pub order: Vec<SortSpec>,
    /// Maximum number of rows
    pub limit: Option<u64>,
    /// Rows to skip before the limit applies
    pub offset: Option<u64>,
}

impl Query {
    /// Creates a new query against `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            joins: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Adds a predicate
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds an equality filter
    pub fn filter_eq(self, column: ColumnRef, value: impl Into<Value>) -> Self {
        self.with_predicate(Predicate::eq(column, value))
    }

    /// Adds a join
    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Adds a sort specification
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.order.push(sort);
        self
    }

    /// Sets the limit
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the joins added so far
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Counts joins of the given kind against `table`
    pub fn count_joins(&self, kind: JoinKind, table: &str) -> usize {
        self.joins.iter().filter(|j| j.targets(kind, table)).count()
    }

    /// Removes every join of the given kind against `table`.
    ///
    /// Returns the number of joins removed.
    pub fn remove_joins(&mut self, kind: JoinKind, table: &str) -> usize {
        let before = self.joins.len();
        self.joins.retain(|j| !j.targets(kind, table));
        before - self.joins.len()
    }

    /// Returns every table this query reads from, base table first
    pub fn tables(&self) -> Vec<&str> {
        std::iter::once(self.table.as_str())
            .chain(self.joins.iter().map(|j| j.table.as_str()))
            .collect()
    }
}

/// Converts a JSON object into a row. Returns `None` for non-objects.
pub fn row_from_json(value: Value) -> Option<Row> {
    match value {
        Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    }
}
