//! Version-aware query
//!
//! A `VersionedQuery` always carries exactly one history join, the one for
//! its current `JoinMode`. Switching modes removes every inner join against
//! the history table before adding the new one, so switching is idempotent.
//!
//! Join shapes per mode (`p` primary, `h` history):
//! - Default: `p.id = h.ref_id AND h.version = p.latest_version`
//! - SpecificVersion(v): `p.id = h.ref_id AND h.version = v`
//! - AllVersions: `p.id = h.ref_id`
//! - AsOfMoment(t): `p.id = h.ref_id` and `h.version` is the top row of
//!   `h` for that entity with `updated_at <= t`, latest first

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::mode::{JoinMode, TrashedScope};
use crate::attributes::AttributeKey;
use crate::clock::format_timestamp;
use crate::errors::{VersioningError, VersioningResult};
use crate::model::ModelDefinition;
use crate::query::{
    ColumnRef, FilterOp, FirstMatch, Join, JoinKind, Predicate, Query, Row, SortDirection,
    SortSpec,
};

#[derive(Debug, Clone)]
pub struct VersionedQuery {
    model: Arc<ModelDefinition>,
    query: Query,
    mode: JoinMode,
    trashed: TrashedScope,
    bound: Option<i64>,
}

impl VersionedQuery {
    /// Creates a query in default mode
    pub fn new(model: Arc<ModelDefinition>) -> Self {
        let query = Query::new(&model.table);
        let mut versioned = Self {
            model,
            query,
            mode: JoinMode::Default,
            trashed: TrashedScope::default(),
            bound: None,
        };
        versioned.switch_mode(JoinMode::Default);
        versioned
    }

    /// Replaces the history join with the one for `mode`
    pub fn switch_mode(&mut self, mode: JoinMode) {
        let history = self.model.history_table();
        self.query.remove_joins(JoinKind::Inner, &history);
        // First in line so later joins may reference history columns
        self.query.joins.insert(0, history_join(&self.model, &mode));
        self.mode = mode;
    }

    pub fn current(mut self) -> Self {
        self.switch_mode(JoinMode::Default);
        self
    }

    pub fn at_version(mut self, version: u64) -> Self {
        self.switch_mode(JoinMode::SpecificVersion(version));
        self
    }

    pub fn all_versions(mut self) -> Self {
        self.switch_mode(JoinMode::AllVersions);
        self
    }

    pub fn as_of(mut self, moment: DateTime<Utc>) -> Self {
        self.switch_mode(JoinMode::AsOfMoment(moment));
        self
    }

    pub fn with_trashed(mut self) -> Self {
        self.trashed = TrashedScope::With;
        self
    }

    pub fn only_trashed(mut self) -> Self {
        self.trashed = TrashedScope::Only;
        self
    }

    pub fn without_trashed(mut self) -> Self {
        self.trashed = TrashedScope::Without;
        self
    }

    /// Binds the query to one entity
    pub fn for_key(mut self, id: i64) -> Self {
        self.bound = Some(id);
        self.query
            .predicates
            .push(Predicate::eq(self.model.qualified_key_name(), id));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.query.predicates.push(predicate);
        self
    }

    /// Adds a filter on `column`, qualified by the table that stores it
    pub fn where_op(self, column: &str, op: FilterOp) -> Self {
        let column = self.resolve_column(column);
        self.filter(Predicate::new(column, op))
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_op(column, FilterOp::Eq(value.into()))
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        let column = self.resolve_column(column);
        self.query.order.push(SortSpec { column, direction });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Adds an application join
    pub fn join(mut self, join: Join) -> Self {
        self.query.joins.push(join);
        self
    }

    /// Qualifies a bare column by the table that stores it
    pub fn resolve_column(&self, column: &str) -> ColumnRef {
        match AttributeKey::parse(column) {
            AttributeKey::Unqualified(name) => self.model.qualify(name),
            AttributeKey::Qualified { table, column } => ColumnRef::qualified(table, column),
            // Left for storage to reject
            AttributeKey::Invalid { .. } => ColumnRef::new(column),
        }
    }

    pub fn model(&self) -> &Arc<ModelDefinition> {
        &self.model
    }

    pub fn mode(&self) -> JoinMode {
        self.mode
    }

    pub fn trashed(&self) -> TrashedScope {
        self.trashed
    }

    /// Entity this query is bound to, if any
    pub fn bound_key(&self) -> Option<i64> {
        self.bound
    }

    /// The underlying query without the soft delete scope
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn joins(&self) -> &[Join] {
        self.query.joins()
    }

    /// Number of inner joins against the history table
    pub fn history_join_count(&self) -> usize {
        self.query
            .count_joins(JoinKind::Inner, &self.model.history_table())
    }

    /// Rejects modes the model cannot serve
    pub fn check(&self) -> VersioningResult<()> {
        if matches!(self.mode, JoinMode::AsOfMoment(_)) && !self.model.versions_timestamps() {
            return Err(VersioningError::TimestampNotVersioned {
                table: self.model.table.clone(),
                column: self.model.updated_at.clone(),
            });
        }
        Ok(())
    }

    /// The executable query, soft delete scope applied
    pub fn build(&self) -> Query {
        let mut query = self.query.clone();
        if let Some(deleted_at) = self.model.qualified_deleted_at_column() {
            match self.trashed {
                TrashedScope::Without => query.predicates.push(Predicate::is_null(deleted_at)),
                TrashedScope::Only => query.predicates.push(Predicate::is_not_null(deleted_at)),
                TrashedScope::With => {}
            }
        }
        query
    }

    /// Turns a result row into a record; `ref_id` always equals the key
    pub fn into_record(&self, row: Row) -> Row {
        strip_version_key(&self.model, row)
    }
}

pub(crate) fn strip_version_key(model: &ModelDefinition, mut row: Row) -> Row {
    row.remove(&model.version_key_name());
    row
}

fn history_join(model: &ModelDefinition, mode: &JoinMode) -> Join {
    let join = Join::inner(model.history_table())
        .on(model.qualified_key_name(), model.qualified_version_key_name());

    match mode {
        JoinMode::Default => join.on(
            model.qualified_version_column(),
            model.qualified_latest_version_column(),
        ),
        JoinMode::SpecificVersion(version) => {
            join.filter(Predicate::eq(model.qualified_version_column(), *version))
        }
        JoinMode::AllVersions => join,
        JoinMode::AsOfMoment(moment) => join.first_match(FirstMatch {
            key: model.version_column.clone(),
            correlate: vec![(model.version_key_name(), model.qualified_key_name())],
            filter: vec![(
                model.updated_at.clone(),
                FilterOp::Lte(Value::String(format_timestamp(moment))),
            )],
            order: vec![
                (model.updated_at.clone(), SortDirection::Desc),
                (model.version_column.clone(), SortDirection::Desc),
            ],
        }),
    }
}
