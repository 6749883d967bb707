//! SQL rendering for the SQLite backend
//!
//! Every value is bound as a positional `?` parameter, identifiers are
//! always double-quoted.

use serde_json::Value;

use super::{Increment, TableSchema};
use crate::query::{
    ColumnRef, FilterOp, FirstMatch, Join, JoinConstraint, Predicate, Query, Row, SortDirection,
};

/// Alias of the joined table inside a top-1 subquery
const FIRST_ALIAS: &str = "__first";

/// Rendered statement with its parameters in binding order
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_sql(column: &ColumnRef) -> String {
    match &column.table {
        Some(table) => format!("{}.{}", quote(table), quote(&column.name)),
        None => quote(&column.name),
    }
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

#[derive(Default)]
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: Value) {
        self.sql.push('?');
        self.params.push(value);
    }

    fn condition(&mut self, lhs: &str, op: &FilterOp) {
        let binary = |w: &mut Self, symbol: &str, value: &Value| {
            w.push(&format!("{} {} ", lhs, symbol));
            w.bind(value.clone());
        };

        match op {
            FilterOp::Eq(value) => binary(self, "=", value),
            FilterOp::Gte(value) => binary(self, ">=", value),
            FilterOp::Gt(value) => binary(self, ">", value),
            FilterOp::Lte(value) => binary(self, "<=", value),
            FilterOp::Lt(value) => binary(self, "<", value),
            FilterOp::In(values) if values.is_empty() => self.push("0 = 1"),
            FilterOp::In(values) => {
                self.push(&format!("{} IN (", lhs));
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.bind(value.clone());
                }
                self.push(")");
            }
            FilterOp::IsNull => self.push(&format!("{} IS NULL", lhs)),
            FilterOp::IsNotNull => self.push(&format!("{} IS NOT NULL", lhs)),
        }
    }

    fn predicate(&mut self, predicate: &Predicate) {
        self.condition(&column_sql(&predicate.column), &predicate.op);
    }

    fn where_clause(&mut self, predicates: &[Predicate]) {
        for (index, predicate) in predicates.iter().enumerate() {
            self.push(if index == 0 { " WHERE " } else { " AND " });
            self.predicate(predicate);
        }
    }

    fn first_match(&mut self, table: &str, first: &FirstMatch) {
        let inner = |column: &str| format!("{}.{}", quote(FIRST_ALIAS), quote(column));

        self.push(&format!(
            "{}.{} = (SELECT {} FROM {} AS {}",
            quote(table),
            quote(&first.key),
            inner(&first.key),
            quote(table),
            quote(FIRST_ALIAS)
        ));

        let mut first_condition = true;
        let mut separator = |w: &mut Self| {
            w.push(if first_condition { " WHERE " } else { " AND " });
            first_condition = false;
        };
        for (column, outer) in &first.correlate {
            separator(self);
            self.push(&format!("{} = {}", inner(column), column_sql(outer)));
        }
        for (column, op) in &first.filter {
            separator(self);
            self.condition(&inner(column), op);
        }

        for (index, (column, direction)) in first.order.iter().enumerate() {
            self.push(if index == 0 { " ORDER BY " } else { ", " });
            self.push(&format!("{} {}", inner(column), direction_sql(*direction)));
        }
        self.push(" LIMIT 1)");
    }

    fn join(&mut self, join: &Join) {
        self.push(&format!(" {} JOIN {} ON ", join.kind.as_str(), quote(&join.table)));
        if join.constraints.is_empty() {
            self.push("1 = 1");
            return;
        }
        for (index, constraint) in join.constraints.iter().enumerate() {
            if index > 0 {
                self.push(" AND ");
            }
            match constraint {
                JoinConstraint::Columns { left, right } => {
                    self.push(&format!("{} = {}", column_sql(left), column_sql(right)));
                }
                JoinConstraint::Filter(predicate) => self.predicate(predicate),
                JoinConstraint::FirstMatch(first) => self.first_match(&join.table, first),
            }
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Renders a SELECT over the base table and every join
pub(crate) fn select(query: &Query) -> Statement {
    let mut writer = SqlWriter::default();

    let projection: Vec<String> = query
        .tables()
        .iter()
        .map(|table| format!("{}.*", quote(table)))
        .collect();
    writer.push(&format!(
        "SELECT {} FROM {}",
        projection.join(", "),
        quote(&query.table)
    ));

    for join in &query.joins {
        writer.join(join);
    }
    writer.where_clause(&query.predicates);

    for (index, sort) in query.order.iter().enumerate() {
        writer.push(if index == 0 { " ORDER BY " } else { ", " });
        writer.push(&format!(
            "{} {}",
            column_sql(&sort.column),
            direction_sql(sort.direction)
        ));
    }

    match (query.limit, query.offset) {
        (Some(limit), offset) => {
            writer.push(" LIMIT ");
            writer.bind(Value::from(limit));
            if let Some(offset) = offset {
                writer.push(" OFFSET ");
                writer.bind(Value::from(offset));
            }
        }
        (None, Some(offset)) => {
            writer.push(" LIMIT -1 OFFSET ");
            writer.bind(Value::from(offset));
        }
        (None, None) => {}
    }

    writer.finish()
}

/// Renders an UPDATE; returns `None` when there is nothing to set
pub(crate) fn update(
    query: &Query,
    assignments: &Row,
    increment: Option<&Increment>,
) -> Option<Statement> {
    if assignments.is_empty() && increment.is_none() {
        return None;
    }

    let mut writer = SqlWriter::default();
    writer.push(&format!("UPDATE {} SET ", quote(&query.table)));

    let mut first = true;
    for (column, value) in assignments {
        if !first {
            writer.push(", ");
        }
        first = false;
        writer.push(&format!("{} = ", quote(column)));
        writer.bind(value.clone());
    }
    if let Some(increment) = increment {
        if !first {
            writer.push(", ");
        }
        let column = quote(&increment.column);
        writer.push(&format!("{} = COALESCE({}, 0) + ", column, column));
        writer.bind(Value::from(increment.amount));
    }

    writer.where_clause(&query.predicates);
    Some(writer.finish())
}

pub(crate) fn delete(query: &Query) -> Statement {
    let mut writer = SqlWriter::default();
    writer.push(&format!("DELETE FROM {}", quote(&query.table)));
    writer.where_clause(&query.predicates);
    writer.finish()
}

pub(crate) fn insert(table: &str, row: &Row) -> Statement {
    let mut writer = SqlWriter::default();
    if row.is_empty() {
        writer.push(&format!("INSERT INTO {} DEFAULT VALUES", quote(table)));
        return writer.finish();
    }

    let columns: Vec<String> = row.keys().map(|c| quote(c)).collect();
    writer.push(&format!(
        "INSERT INTO {} ({}) VALUES (",
        quote(table),
        columns.join(", ")
    ));
    for (index, value) in row.values().enumerate() {
        if index > 0 {
            writer.push(", ");
        }
        writer.bind(value.clone());
    }
    writer.push(")");
    writer.finish()
}

/// Renders the DDL for a table and its indexes.
///
/// Columns are declared without a type so values keep the storage class
/// they were bound with.
pub(crate) fn create_table(schema: &TableSchema) -> Vec<String> {
    let mut definitions: Vec<String> = schema
        .columns
        .iter()
        .map(|column| {
            if schema.auto_increment.as_deref() == Some(column.as_str()) {
                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote(column))
            } else {
                quote(column)
            }
        })
        .collect();

    if schema.auto_increment.is_none() && !schema.primary_key.is_empty() {
        let key: Vec<String> = schema.primary_key.iter().map(|c| quote(c)).collect();
        definitions.push(format!("PRIMARY KEY ({})", key.join(", ")));
    }

    let mut statements = vec![format!(
        "CREATE TABLE {} ({})",
        quote(&schema.name),
        definitions.join(", ")
    )];

    for columns in &schema.indexes {
        let name = format!("{}_{}_index", schema.name, columns.join("_"));
        let quoted: Vec<String> = columns.iter().map(|c| quote(c)).collect();
        statements.push(format!(
            "CREATE INDEX {} ON {} ({})",
            quote(&name),
            quote(&schema.name),
            quoted.join(", ")
        ));
    }

    statements
}
