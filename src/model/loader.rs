//! Model loader for reading model definitions from disk
//!
//! - A model file holds one definition or an array of definitions
//! - A directory is scanned for `*.json` files in name order
//! - Every definition is validated before it is registered
//! - Registering the same table twice is rejected

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::definition::ModelDefinition;
use super::errors::{ModelError, ModelResult};
use crate::observability::{log_event, Event, EventFields};

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelFile {
    Many(Vec<ModelDefinition>),
    One(ModelDefinition),
}

/// Registry of validated model definitions, indexed by table name.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<ModelDefinition>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` file in `dir`.
    pub fn load_dir(&mut self, dir: &Path) -> ModelResult<usize> {
        let io_error = |e: std::io::Error| ModelError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();

            // Skip non-JSON files
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            loaded += self.load_file(&path)?;
        }
        Ok(loaded)
    }

    /// Loads a single model file.
    pub fn load_file(&mut self, path: &Path) -> ModelResult<usize> {
        let content = fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let file: ModelFile =
            serde_json::from_str(&content).map_err(|e| ModelError::MalformedJson {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let models = match file {
            ModelFile::Many(models) => models,
            ModelFile::One(model) => vec![model],
        };

        let count = models.len();
        for model in models {
            self.register(model)?;
        }
        Ok(count)
    }

    /// Registers a model directly.
    pub fn register(&mut self, model: ModelDefinition) -> ModelResult<Arc<ModelDefinition>> {
        model.validate()?;
        if self.models.contains_key(&model.table) {
            return Err(ModelError::DuplicateModel(model.table));
        }

        log_event(
            Event::ModelLoaded,
            EventFields::table(&model.table).count(model.versioned.len()),
        );

        let model = Arc::new(model);
        self.models.insert(model.table.clone(), Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self, table: &str) -> ModelResult<Arc<ModelDefinition>> {
        self.models
            .get(table)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel(table.to_string()))
    }

    pub fn contains(&self, table: &str) -> bool {
        self.models.contains_key(table)
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelDefinition>> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
