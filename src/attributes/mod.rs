//! Attribute handling on the write path
//!
//! Callers pass one flat attribute map per write. The partitioner decides
//! which keys belong to the primary row and which to the history snapshot.

mod key;
mod partitioner;

pub use key::AttributeKey;
pub use partitioner::{AttributePartitioner, Partitioned};
