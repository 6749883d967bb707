//! Primary record store

mod store;

pub use store::PrimaryStore;
