//! Model definitions and their loader
//!
//! A `ModelDefinition` is the configuration surface of the engine: which
//! table, which attributes are versioned, timestamps and soft deletes.

mod definition;
mod errors;
mod loader;

pub(crate) use definition::is_identifier;
pub use definition::ModelDefinition;
pub use errors::{ModelError, ModelResult};
pub use loader::ModelRegistry;
