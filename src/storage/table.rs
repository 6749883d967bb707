//! Table schemas understood by every backend

/// Physical layout of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<String>,
    /// Primary key columns (unique together)
    pub primary_key: Vec<String>,
    /// Column filled from a per-table sequence when absent on insert
    pub auto_increment: Option<String>,
    /// Secondary indexes, one column list each
    pub indexes: Vec<Vec<String>>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            auto_increment: None,
            indexes: Vec::new(),
        }
    }

    /// Adds a column; duplicates are ignored
    pub fn column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name);
        }
        self
    }

    /// Adds several columns
    pub fn columns<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |schema, name| schema.column(name))
    }

    /// Sets the primary key
    pub fn primary_key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Marks a column as auto increment; it also becomes the primary key
    pub fn auto_increment(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.primary_key = vec![name.clone()];
        self.auto_increment = Some(name.clone());
        self.column(name)
    }

    /// Adds a secondary index
    pub fn index<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.push(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}
