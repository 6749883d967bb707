//! Generic query building layer
//!
//! The versioning engine composes its joins and filters with these types;
//! storage backends either evaluate them in process (`PredicateFilter`,
//! `ResultSorter`) or render them to SQL.

mod ast;
mod filters;
mod sorter;

pub use ast::{
    row_from_json, ColumnRef, FilterOp, FirstMatch, Join, JoinConstraint, JoinKind, Predicate,
    Query, Row, SortDirection, SortSpec,
};
pub use filters::{ColumnLookup, PredicateFilter};
pub use sorter::ResultSorter;
