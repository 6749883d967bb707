//! Predicate evaluation for in-process query execution
//!
//! Filters rows strictly according to predicates.
//! No type coercion, exact match only. Null never satisfies a comparison.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{ColumnRef, FilterOp, Predicate, Row};

/// Resolves column references against a (possibly joined) row
pub trait ColumnLookup {
    /// Returns the value of `column`, or `None` if the column is absent
    fn lookup(&self, column: &ColumnRef) -> Option<&Value>;
}

impl ColumnLookup for Row {
    fn lookup(&self, column: &ColumnRef) -> Option<&Value> {
        self.get(&column.name)
    }
}

impl<T: ColumnLookup + ?Sized> ColumnLookup for &T {
    fn lookup(&self, column: &ColumnRef) -> Option<&Value> {
        (**self).lookup(column)
    }
}

/// Evaluates predicates against rows
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a row matches all predicates
    pub fn matches<R: ColumnLookup + ?Sized>(row: &R, predicates: &[Predicate]) -> bool {
        // All predicates must match (AND semantics)
        predicates
            .iter()
            .all(|pred| Self::matches_predicate(row, pred))
    }

    /// Checks if a row matches a single predicate
    pub fn matches_predicate<R: ColumnLookup + ?Sized>(row: &R, predicate: &Predicate) -> bool {
        Self::matches_op(row.lookup(&predicate.column), &predicate.op)
    }

    /// Checks a single value against an operation
    pub fn matches_op(value: Option<&Value>, op: &FilterOp) -> bool {
        match op {
            FilterOp::IsNull => value.map_or(true, Value::is_null),
            FilterOp::IsNotNull => value.map_or(false, |v| !v.is_null()),
            _ => {
                let actual = match value {
                    Some(v) if !v.is_null() => v,
                    // Missing field or null = no match
                    _ => return false,
                };

                match op {
                    FilterOp::Eq(expected) => actual == expected,
                    FilterOp::In(candidates) => candidates.iter().any(|c| actual == c),
                    FilterOp::Gte(bound) => {
                        matches!(Self::compare(actual, bound), Some(Ordering::Greater | Ordering::Equal))
                    }
                    FilterOp::Gt(bound) => {
                        matches!(Self::compare(actual, bound), Some(Ordering::Greater))
                    }
                    FilterOp::Lte(bound) => {
                        matches!(Self::compare(actual, bound), Some(Ordering::Less | Ordering::Equal))
                    }
                    FilterOp::Lt(bound) => {
                        matches!(Self::compare(actual, bound), Some(Ordering::Less))
                    }
                    FilterOp::IsNull | FilterOp::IsNotNull => false,
                }
            }
        }
    }

    /// Join equality: both sides present, non-null and exactly equal
    pub fn values_equal(left: Option<&Value>, right: Option<&Value>) -> bool {
        match (left, right) {
            (Some(l), Some(r)) => !l.is_null() && l == r,
            _ => false,
        }
    }

    /// Orders two comparable values (numbers with numbers, strings with strings)
    fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
        match (actual, bound) {
            (Value::Number(a), Value::Number(b)) => {
                if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                    return Some(ai.cmp(&bi));
                }
                match (a.as_f64(), b.as_f64()) {
                    (Some(af), Some(bf)) => af.partial_cmp(&bf),
                    _ => None,
                }
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::row_from_json;
    use serde_json::json;

    fn col(name: &str) -> ColumnRef {
        ColumnRef::new(name)
    }

    #[test]
    fn test_equality_match() {
        let row = row_from_json(json!({"name": "Alice", "age": 30})).unwrap();

        let pred = Predicate::eq(col("name"), "Alice");
        assert!(PredicateFilter::matches(&row, &[pred]));

        let pred = Predicate::eq(col("name"), "Bob");
        assert!(!PredicateFilter::matches(&row, &[pred]));
    }

    #[test]
    fn test_no_type_coercion() {
        let row = row_from_json(json!({"value": 123})).unwrap();

        // String "123" should NOT match integer 123
        let pred = Predicate::eq(col("value"), "123");
        assert!(!PredicateFilter::matches(&row, &[pred]));

        let pred = Predicate::eq(col("value"), 123);
        assert!(PredicateFilter::matches(&row, &[pred]));
    }

    #[test]
    fn test_range_predicates() {
        let row = row_from_json(json!({"age": 25})).unwrap();

        assert!(PredicateFilter::matches(&row, &[Predicate::gte(col("age"), 18)]));
        assert!(PredicateFilter::matches(&row, &[Predicate::lte(col("age"), 30)]));
        assert!(!PredicateFilter::matches(&row, &[Predicate::gt(col("age"), 25)]));
        assert!(!PredicateFilter::matches(&row, &[Predicate::lt(col("age"), 25)]));
    }

    #[test]
    fn test_string_range_orders_timestamps() {
        let row = row_from_json(json!({"updated_at": "2024-01-02T00:00:00.000000Z"})).unwrap();

        let pred = Predicate::lte(col("updated_at"), "2024-01-02T00:00:00.000000Z");
        assert!(PredicateFilter::matches(&row, &[pred]));

        let pred = Predicate::lte(col("updated_at"), "2024-01-01T23:59:59.999999Z");
        assert!(!PredicateFilter::matches(&row, &[pred]));
    }

    #[test]
    fn test_in_predicate() {
        let row = row_from_json(json!({"id": 2})).unwrap();

        assert!(PredicateFilter::matches(&row, &[Predicate::is_in(col("id"), [1, 2, 3])]));
        assert!(!PredicateFilter::matches(&row, &[Predicate::is_in(col("id"), [4, 5])]));
        let empty: Vec<i64> = Vec::new();
        assert!(!PredicateFilter::matches(&row, &[Predicate::is_in(col("id"), empty)]));
    }

    #[test]
    fn test_null_checks() {
        let row = row_from_json(json!({"deleted_at": null})).unwrap();

        assert!(PredicateFilter::matches(&row, &[Predicate::is_null(col("deleted_at"))]));
        assert!(PredicateFilter::matches(&row, &[Predicate::is_null(col("missing"))]));
        assert!(!PredicateFilter::matches(&row, &[Predicate::is_not_null(col("deleted_at"))]));
        assert!(!PredicateFilter::matches(&row, &[Predicate::eq(col("deleted_at"), "x")]));
    }

    #[test]
    fn test_values_equal_rejects_nulls() {
        assert!(PredicateFilter::values_equal(Some(&json!(1)), Some(&json!(1))));
        assert!(!PredicateFilter::values_equal(Some(&json!(null)), Some(&json!(null))));
        assert!(!PredicateFilter::values_equal(None, Some(&json!(1))));
    }
}
