//! Write-path coordination
//!
//! Keeps the primary and history tables consistent on every mutation.

mod affected;
mod writer;

pub use writer::WriteCoordinator;
