use async_trait::async_trait;

use crate::{AggregateId, AggregateRecord, EventEnvelope, EventId, Result, StoreError, Version};

/// Options for saving an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// The version the caller loaded. The save fails with
    /// `ConcurrencyConflict` if the stored version has moved on.
    pub expected_version: Version,
}

impl SaveOptions {
    /// Expects the aggregate to be stored at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: version,
        }
    }

    /// Expects the aggregate to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Version::initial(),
        }
    }
}

/// Persistence for versioned aggregates and their outgoing events.
///
/// All implementations must be thread-safe (Send + Sync). `save` is the only
/// write path and commits the record and its events atomically.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Loads the record for an aggregate.
    ///
    /// Returns None if the aggregate has never been saved.
    async fn load(&self, aggregate_id: AggregateId) -> Result<Option<AggregateRecord>>;

    /// Finds an aggregate by its unique business key.
    async fn find_by_key(
        &self,
        aggregate_type: &str,
        key: &str,
    ) -> Result<Option<AggregateRecord>>;

    /// Lists all records of one aggregate type.
    async fn list(&self, aggregate_type: &str) -> Result<Vec<AggregateRecord>>;

    /// Saves a record and appends its events to the outbox.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version differs from
    /// `options.expected_version`, and with `DuplicateKey` if another
    /// aggregate of the same type holds the record's unique key. Nothing is
    /// written on failure.
    ///
    /// Returns the new version of the aggregate.
    async fn save(
        &self,
        record: AggregateRecord,
        events: Vec<EventEnvelope>,
        options: SaveOptions,
    ) -> Result<Version>;

    /// Returns committed events not yet marked dispatched, oldest first.
    async fn undispatched(&self, limit: usize) -> Result<Vec<EventEnvelope>>;

    /// Marks outbox events as dispatched. Unknown ids are ignored.
    async fn mark_dispatched(&self, event_ids: &[EventId]) -> Result<()>;

    /// Returns every committed event of one aggregate, oldest first.
    async fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>>;
}

/// Checks that a batch of events belongs to the record being saved.
pub fn validate_commit(record: &AggregateRecord, events: &[EventEnvelope]) -> Result<()> {
    for event in events {
        if event.aggregate_id != record.aggregate_id {
            return Err(StoreError::InvalidCommit(format!(
                "event {} belongs to aggregate {}, not {}",
                event.event_id, event.aggregate_id, record.aggregate_id
            )));
        }
        if event.aggregate_type != record.aggregate_type {
            return Err(StoreError::InvalidCommit(format!(
                "event {} has aggregate type {}, not {}",
                event.event_id, event.aggregate_type, record.aggregate_type
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: AggregateId) -> AggregateRecord {
        AggregateRecord::from_state(id, "HousingSearch", &serde_json::json!({})).unwrap()
    }

    fn event(id: AggregateId, aggregate_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .event_type("StageChanged")
            .aggregate_id(id)
            .aggregate_type(aggregate_type)
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn commit_accepts_matching_events() {
        let id = AggregateId::new();
        assert!(validate_commit(&record(id), &[event(id, "HousingSearch")]).is_ok());
        assert!(validate_commit(&record(id), &[]).is_ok());
    }

    #[test]
    fn commit_rejects_foreign_events() {
        let id = AggregateId::new();
        let foreign = event(AggregateId::new(), "HousingSearch");
        assert!(matches!(
            validate_commit(&record(id), &[foreign]),
            Err(StoreError::InvalidCommit(_))
        ));

        let wrong_type = event(id, "Applicant");
        assert!(matches!(
            validate_commit(&record(id), &[wrong_type]),
            Err(StoreError::InvalidCommit(_))
        ));
    }

    #[test]
    fn save_options_constructors() {
        assert_eq!(SaveOptions::expect_new().expected_version, Version::initial());
        assert_eq!(
            SaveOptions::expect_version(Version::new(4)).expected_version,
            Version::new(4)
        );
    }
}
