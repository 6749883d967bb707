//! Row sorting for in-process query execution
//!
//! Sorting is stable and deterministic.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{SortDirection, SortSpec};
use super::filters::ColumnLookup;

/// Sorts rows by one or more sort specifications
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts rows according to `specs`, left to right.
    pub fn sort<R: ColumnLookup>(rows: &mut [R], specs: &[SortSpec]) {
        if specs.is_empty() {
            return;
        }

        rows.sort_by(|a, b| {
            for spec in specs {
                let ordering = Self::directed(
                    Self::compare_values(a.lookup(&spec.column), b.lookup(&spec.column)),
                    spec.direction,
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Applies a direction to an ascending ordering
    pub fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string
    /// - For same types, natural ordering
    pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);

                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                    (Value::Number(a_n), Value::Number(b_n)) => {
                        if let (Some(a_i), Some(b_i)) = (a_n.as_i64(), b_n.as_i64()) {
                            return a_i.cmp(&b_i);
                        }
                        let a_f = a_n.as_f64().unwrap_or(0.0);
                        let b_f = b_n.as_f64().unwrap_or(0.0);
                        a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                    // Nulls are equal; arrays and objects are not compared
                    _ => Ordering::Equal,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{row_from_json, ColumnRef, Row};
    use serde_json::json;

    fn make_row(id: i64, age: i64) -> Row {
        row_from_json(json!({"id": id, "age": age})).unwrap()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_sort_ascending() {
        let mut rows = vec![make_row(3, 30), make_row(1, 20), make_row(2, 25)];
        ResultSorter::sort(&mut rows, &[SortSpec::asc(ColumnRef::new("age"))]);
        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_descending() {
        let mut rows = vec![make_row(3, 30), make_row(1, 20), make_row(2, 25)];
        ResultSorter::sort(&mut rows, &[SortSpec::desc(ColumnRef::new("age"))]);
        assert_eq!(ids(&rows), vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_stable() {
        let mut rows = vec![make_row(1, 25), make_row(2, 25), make_row(3, 25)];
        ResultSorter::sort(&mut rows, &[SortSpec::asc(ColumnRef::new("age"))]);
        assert_eq!(ids(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_multiple_keys() {
        let mut rows = vec![make_row(1, 25), make_row(3, 20), make_row(2, 25)];
        ResultSorter::sort(
            &mut rows,
            &[
                SortSpec::desc(ColumnRef::new("age")),
                SortSpec::desc(ColumnRef::new("id")),
            ],
        );
        assert_eq!(ids(&rows), vec![2, 1, 3]);
    }

    #[test]
    fn test_null_sorts_before_values() {
        assert_eq!(
            ResultSorter::compare_values(Some(&json!(null)), Some(&json!(1))),
            Ordering::Less
        );
        assert_eq!(
            ResultSorter::compare_values(None, Some(&json!(null))),
            Ordering::Less
        );
    }
}
