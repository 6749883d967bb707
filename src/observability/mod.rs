//! Observability for the versioning engine
//!
//! Structured log lines are emitted through `tracing`; the crate never
//! installs a subscriber.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. One log line = one event
//!
//! # Usage
//!
//! ```ignore
//! use versionable::observability::{log_event, Event, EventFields};
//!
//! log_event(Event::SnapshotAppended, EventFields::table("users").ref_id(7).version(3));
//! ```

mod events;

pub use events::{Event, LogLevel};

/// Fields attached to an event. Unset fields are logged as `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFields<'a> {
    pub table: &'a str,
    pub ref_id: Option<i64>,
    pub version: Option<u64>,
    pub count: Option<usize>,
    pub detail: Option<&'a str>,
}

impl<'a> EventFields<'a> {
    pub fn table(table: &'a str) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    pub fn ref_id(mut self, ref_id: i64) -> Self {
        self.ref_id = Some(ref_id);
        self
    }

    /// Sets `ref_id` when the event concerns one entity
    pub fn ref_id_opt(mut self, ref_id: Option<i64>) -> Self {
        self.ref_id = ref_id;
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn detail(mut self, detail: &'a str) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Emits one structured log line for `event`
pub fn log_event(event: Event, fields: EventFields<'_>) {
    let name = event.as_str();
    match event.level() {
        LogLevel::Debug => tracing::debug!(
            event = name,
            table = fields.table,
            ref_id = ?fields.ref_id,
            version = ?fields.version,
            count = ?fields.count,
            detail = ?fields.detail
        ),
        LogLevel::Info => tracing::info!(
            event = name,
            table = fields.table,
            ref_id = ?fields.ref_id,
            version = ?fields.version,
            count = ?fields.count,
            detail = ?fields.detail
        ),
        LogLevel::Warn => tracing::warn!(
            event = name,
            table = fields.table,
            ref_id = ?fields.ref_id,
            version = ?fields.version,
            count = ?fields.count,
            detail = ?fields.detail
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_builder() {
        let fields = EventFields::table("users").ref_id(7).version(3).count(1);
        assert_eq!(fields.table, "users");
        assert_eq!(fields.ref_id, Some(7));
        assert_eq!(fields.version, Some(3));
        assert_eq!(fields.count, Some(1));
        assert!(fields.detail.is_none());
    }

    #[test]
    fn test_log_event_without_subscriber() {
        // Must be a no-op when nothing listens
        log_event(Event::EntityCreated, EventFields::table("users").ref_id(1));
        log_event(
            Event::MutationRolledBack,
            EventFields::table("users").detail("VERSION_DUPLICATE"),
        );
    }
}
