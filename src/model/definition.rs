//! Versionable model definitions
//!
//! A model names its primary table and the attributes that are versioned.
//! Everything else about the two-table layout is derived from naming
//! conventions, each overridable:
//! - history table: `<table><history_suffix>` (`users_version`)
//! - version key: `<version_key_prefix><primary_key>` (`ref_id`)
//! - primary row pointer: `latest_version`
//! - snapshot number: `version`

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{ModelError, ModelResult};
use crate::query::ColumnRef;
use crate::storage::TableSchema;

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_latest_version_column() -> String {
    "latest_version".to_string()
}

fn default_version_column() -> String {
    "version".to_string()
}

fn default_history_suffix() -> String {
    "_version".to_string()
}

fn default_version_key_prefix() -> String {
    "ref_".to_string()
}

fn default_created_at() -> String {
    "created_at".to_string()
}

fn default_updated_at() -> String {
    "updated_at".to_string()
}

fn default_true() -> bool {
    true
}

/// Returns true for plain SQL identifiers
pub(crate) fn is_identifier(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(name))
}

/// Versioning configuration of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDefinition {
    /// Primary table name
    pub table: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Attributes stored in history snapshots
    #[serde(default)]
    pub versioned: Vec<String>,

    /// Non-versioned attribute columns of the primary table
    #[serde(default)]
    pub live_columns: Vec<String>,

    #[serde(default = "default_true")]
    pub timestamps: bool,

    #[serde(default = "default_created_at")]
    pub created_at: String,

    #[serde(default = "default_updated_at")]
    pub updated_at: String,

    /// Soft delete marker column
    #[serde(default)]
    pub soft_delete: Option<String>,

    #[serde(default = "default_latest_version_column")]
    pub latest_version_column: String,

    #[serde(default = "default_version_column")]
    pub version_column: String,

    #[serde(default = "default_history_suffix")]
    pub history_suffix: String,

    #[serde(default = "default_version_key_prefix")]
    pub version_key_prefix: String,
}

impl ModelDefinition {
    /// Creates a model with default conventions and timestamps enabled
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: default_primary_key(),
            versioned: Vec::new(),
            live_columns: Vec::new(),
            timestamps: true,
            created_at: default_created_at(),
            updated_at: default_updated_at(),
            soft_delete: None,
            latest_version_column: default_latest_version_column(),
            version_column: default_version_column(),
            history_suffix: default_history_suffix(),
            version_key_prefix: default_version_key_prefix(),
        }
    }

    pub fn versioned<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versioned.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn live_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.live_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Enables soft deletes using `column` as the marker
    pub fn soft_deletes(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    pub fn with_history_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.history_suffix = suffix.into();
        self
    }

    pub fn with_latest_version_column(mut self, column: impl Into<String>) -> Self {
        self.latest_version_column = column.into();
        self
    }

    pub fn with_version_column(mut self, column: impl Into<String>) -> Self {
        self.version_column = column.into();
        self
    }

    pub fn history_table(&self) -> String {
        format!("{}{}", self.table, self.history_suffix)
    }

    /// Name of the history column holding the primary key (`ref_id`)
    pub fn version_key_name(&self) -> String {
        format!("{}{}", self.version_key_prefix, self.primary_key)
    }

    pub fn qualified_key_name(&self) -> ColumnRef {
        ColumnRef::qualified(&self.table, &self.primary_key)
    }

    pub fn qualified_version_key_name(&self) -> ColumnRef {
        ColumnRef::qualified(self.history_table(), self.version_key_name())
    }

    pub fn qualified_latest_version_column(&self) -> ColumnRef {
        ColumnRef::qualified(&self.table, &self.latest_version_column)
    }

    pub fn qualified_version_column(&self) -> ColumnRef {
        ColumnRef::qualified(self.history_table(), &self.version_column)
    }

    pub fn is_versioned(&self, field: &str) -> bool {
        self.versioned.iter().any(|f| f == field)
    }

    /// True if `updated_at` is part of every snapshot, enabling as-of reads
    pub fn versions_timestamps(&self) -> bool {
        self.timestamps && self.is_versioned(&self.updated_at)
    }

    pub fn soft_delete_is_versioned(&self) -> bool {
        self.soft_delete
            .as_deref()
            .map_or(false, |column| self.is_versioned(column))
    }

    /// The soft delete marker, qualified by the table that stores it
    pub fn qualified_deleted_at_column(&self) -> Option<ColumnRef> {
        let column = self.soft_delete.as_ref()?;
        let table = if self.is_versioned(column) {
            self.history_table()
        } else {
            self.table.clone()
        };
        Some(ColumnRef::qualified(table, column))
    }

    /// Qualifies a column by the table that stores it
    pub fn qualify(&self, column: &str) -> ColumnRef {
        let in_history = self.is_versioned(column)
            || column == self.version_column
            || column == self.version_key_name();
        if in_history {
            ColumnRef::qualified(self.history_table(), column)
        } else {
            ColumnRef::qualified(&self.table, column)
        }
    }

    /// Columns the engine writes itself and callers may not set
    pub fn reserved_columns(&self) -> [String; 3] {
        [
            self.latest_version_column.clone(),
            self.version_column.clone(),
            self.version_key_name(),
        ]
    }

    pub fn is_reserved(&self, column: &str) -> bool {
        self.reserved_columns().iter().any(|c| c == column)
    }

    /// Checks naming and partition consistency
    pub fn validate(&self) -> ModelResult<()> {
        let invalid = |reason: String| Err(ModelError::invalid(&self.table, reason));

        if self.table.is_empty() {
            return invalid("table name is empty".to_string());
        }
        if self.history_suffix.is_empty() {
            return invalid("history suffix is empty".to_string());
        }

        let mut names: Vec<(&str, &str)> = vec![
            ("table", self.table.as_str()),
            ("primary key", self.primary_key.as_str()),
            ("latest version column", self.latest_version_column.as_str()),
            ("version column", self.version_column.as_str()),
            ("created_at column", self.created_at.as_str()),
            ("updated_at column", self.updated_at.as_str()),
        ];
        names.extend(self.versioned.iter().map(|f| ("versioned field", f.as_str())));
        names.extend(self.live_columns.iter().map(|c| ("live column", c.as_str())));
        if let Some(column) = &self.soft_delete {
            names.push(("soft delete column", column.as_str()));
        }
        for (what, name) in &names {
            if !is_identifier(name) {
                return invalid(format!("{} '{}' is not a valid identifier", what, name));
            }
        }
        if !is_identifier(&self.history_table()) || !is_identifier(&self.version_key_name()) {
            return invalid("history naming produces an invalid identifier".to_string());
        }

        let mut seen = HashSet::new();
        for field in &self.versioned {
            if !seen.insert(field.as_str()) {
                return invalid(format!("versioned field '{}' is listed twice", field));
            }
            if *field == self.primary_key || self.is_reserved(field) {
                return invalid(format!("versioned field '{}' is managed by the engine", field));
            }
        }
        for column in &self.live_columns {
            if self.is_versioned(column) {
                return invalid(format!("'{}' is both live and versioned", column));
            }
            if self.is_reserved(column) {
                return invalid(format!("live column '{}' is managed by the engine", column));
            }
        }
        if self.primary_key == self.latest_version_column {
            return invalid("primary key collides with the latest version column".to_string());
        }
        if self.version_column == self.version_key_name() {
            return invalid("version column collides with the version key".to_string());
        }

        Ok(())
    }

    /// Table layouts for the primary and history tables
    pub fn table_schemas(&self) -> (TableSchema, TableSchema) {
        let mut primary = TableSchema::new(&self.table)
            .auto_increment(&self.primary_key)
            .column(&self.latest_version_column)
            .columns(&self.live_columns);

        let mut managed: Vec<&String> = Vec::new();
        if self.timestamps {
            managed.push(&self.created_at);
            managed.push(&self.updated_at);
        }
        if let Some(column) = &self.soft_delete {
            managed.push(column);
        }
        for column in managed {
            if !self.is_versioned(column) {
                primary = primary.column(column);
            }
        }

        let key = self.version_key_name();
        let history = TableSchema::new(self.history_table())
            .columns([&key, &self.version_column])
            .columns(&self.versioned)
            .primary_key([key.clone(), self.version_column.clone()])
            .index([key]);

        (primary, history)
    }
}
