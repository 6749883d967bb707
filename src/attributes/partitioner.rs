//! Splits an attribute map into primary-table and history-table parts
//!
//! - keys name versioned fields or live columns, optionally qualified
//! - a qualifier must be the model's own table or its history table
//! - a versioned field always goes to the history part, whatever the
//!   qualifier says
//! - two keys that resolve to the same column are rejected

use std::collections::HashSet;

use super::key::AttributeKey;
use crate::errors::{VersioningError, VersioningResult};
use crate::model::ModelDefinition;
use crate::query::Row;

/// Attributes split by destination table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitioned {
    /// Columns of the primary table
    pub live: Row,
    /// Columns of the history snapshot
    pub versioned: Row,
}

impl Partitioned {
    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.versioned.is_empty()
    }
}

pub struct AttributePartitioner {
    table: String,
    history_table: String,
    versioned: HashSet<String>,
}

impl AttributePartitioner {
    pub fn new(model: &ModelDefinition) -> Self {
        Self {
            table: model.table.clone(),
            history_table: model.history_table(),
            versioned: model.versioned.iter().cloned().collect(),
        }
    }

    pub fn is_versioned(&self, column: &str) -> bool {
        self.versioned.contains(column)
    }

    /// Resolves a key to its bare column name
    pub fn resolve<'k>(&self, key: &'k str) -> VersioningResult<&'k str> {
        match AttributeKey::parse(key) {
            AttributeKey::Unqualified(column) => Ok(column),
            AttributeKey::Qualified { table, column }
                if table == self.table || table == self.history_table =>
            {
                Ok(column)
            }
            AttributeKey::Qualified { table, .. } => Err(VersioningError::invalid_key(
                key,
                format!("qualifier '{}' is not a table of this model", table),
            )),
            AttributeKey::Invalid { reason } => Err(VersioningError::invalid_key(key, reason)),
        }
    }

    /// Splits `attributes` into live and versioned parts
    pub fn partition(&self, attributes: Row) -> VersioningResult<Partitioned> {
        let mut parts = Partitioned::default();

        for (key, value) in attributes {
            let column = self.resolve(&key)?.to_string();

            let target = if self.is_versioned(&column) {
                &mut parts.versioned
            } else {
                &mut parts.live
            };
            if target.insert(column, value).is_some() {
                return Err(VersioningError::invalid_key(
                    key.as_str(),
                    "resolves to a column that is already set",
                ));
            }
        }

        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::row_from_json;
    use serde_json::json;

    fn partitioner() -> AttributePartitioner {
        AttributePartitioner::new(
            &ModelDefinition::new("users").versioned(["email", "city", "updated_at"]),
        )
    }

    fn attrs(value: serde_json::Value) -> Row {
        row_from_json(value).unwrap()
    }

    #[test]
    fn test_splits_by_versioned_set() {
        let parts = partitioner()
            .partition(attrs(json!({"username": "u", "email": "e", "city": "A"})))
            .unwrap();

        assert_eq!(parts.live, attrs(json!({"username": "u"})));
        assert_eq!(parts.versioned, attrs(json!({"email": "e", "city": "A"})));
    }

    #[test]
    fn test_strips_own_and_history_qualifiers() {
        let parts = partitioner()
            .partition(attrs(json!({"users.username": "u", "users_version.city": "B"})))
            .unwrap();

        assert_eq!(parts.live, attrs(json!({"username": "u"})));
        assert_eq!(parts.versioned, attrs(json!({"city": "B"})));
    }

    #[test]
    fn test_versioned_field_wins_over_qualifier() {
        let parts = partitioner()
            .partition(attrs(json!({"users.city": "C"})))
            .unwrap();
        assert!(parts.live.is_empty());
        assert_eq!(parts.versioned, attrs(json!({"city": "C"})));
    }

    #[test]
    fn test_rejects_foreign_and_malformed_keys() {
        let err = partitioner()
            .partition(attrs(json!({"teams.city": "A"})))
            .unwrap_err();
        assert_eq!(err.code(), "VERSION_INVALID_KEY_FORMAT");

        let err = partitioner()
            .partition(attrs(json!({"a.b.c": 1})))
            .unwrap_err();
        assert_eq!(err.code(), "VERSION_INVALID_KEY_FORMAT");
    }

    #[test]
    fn test_rejects_collisions_after_stripping() {
        let err = partitioner()
            .partition(attrs(json!({"city": "A", "users_version.city": "B"})))
            .unwrap_err();
        assert!(matches!(err, VersioningError::InvalidKeyFormat { .. }));
    }

    #[test]
    fn test_empty_input() {
        assert!(partitioner().partition(Row::new()).unwrap().is_empty());
    }
}
