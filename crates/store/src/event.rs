use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AggregateId, StoreError};

/// Unique identifier for an outbox event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of a stored aggregate record.
///
/// A record that has never been saved is at [`Version::initial`] (0); every
/// successful save bumps it by exactly one, regardless of how many events the
/// save carried.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Version of an aggregate that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version produced by the first save.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A drained domain event wrapped with the metadata the outbox and its
/// consumers need.
///
/// `version` and `sequence` are assigned by the store at commit time:
/// `version` is the aggregate version the event was committed with, and
/// `sequence` is the event's global position in the outbox (FIFO order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,

    /// The type of the event (e.g., "StageChanged").
    pub event_type: String,

    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "HousingSearch").
    pub aggregate_type: String,

    pub version: Version,

    /// Position in the outbox. Zero until committed.
    pub sequence: u64,

    /// When the event was raised by the aggregate.
    pub timestamp: DateTime<Utc>,

    pub payload: serde_json::Value,

    /// Additional metadata, e.g. the acting user under `"actor"`.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EventEnvelope {
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::default()
    }

    /// Deserializes the payload into a concrete event type.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// Returns the acting user recorded in metadata, if any.
    pub fn actor(&self) -> Option<&str> {
        self.metadata.get("actor").and_then(|v| v.as_str())
    }
}

/// Builder for event envelopes.
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_id: Option<AggregateId>,
    aggregate_type: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl EventEnvelopeBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn aggregate_id(mut self, id: AggregateId) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the envelope, failing if a required field was never set.
    pub fn build(self) -> Result<EventEnvelope, StoreError> {
        Ok(EventEnvelope {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self
                .event_type
                .ok_or(StoreError::IncompleteEnvelope("event_type"))?,
            aggregate_id: self
                .aggregate_id
                .ok_or(StoreError::IncompleteEnvelope("aggregate_id"))?,
            aggregate_type: self
                .aggregate_type
                .ok_or(StoreError::IncompleteEnvelope("aggregate_type"))?,
            version: Version::initial(),
            sequence: 0,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: self
                .payload
                .ok_or(StoreError::IncompleteEnvelope("payload"))?,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_starts_at_zero_and_increments() {
        assert_eq!(Version::initial().as_u64(), 0);
        assert_eq!(Version::initial().next(), Version::first());
        assert!(Version::first() < Version::new(2));
    }

    #[test]
    fn builder_sets_fields_and_leaves_commit_positions_unassigned() {
        let aggregate_id = AggregateId::new();
        let envelope = EventEnvelope::builder()
            .event_type("StageChanged")
            .aggregate_id(aggregate_id)
            .aggregate_type("HousingSearch")
            .payload_raw(serde_json::json!({"to": "HouseHunting"}))
            .metadata("actor", serde_json::json!("coordinator"))
            .build()
            .unwrap();

        assert_eq!(envelope.event_type, "StageChanged");
        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.version, Version::initial());
        assert_eq!(envelope.sequence, 0);
        assert_eq!(envelope.actor(), Some("coordinator"));
    }

    #[test]
    fn builder_reports_the_missing_field() {
        let result = EventEnvelope::builder()
            .event_type("StageChanged")
            .aggregate_type("HousingSearch")
            .payload_raw(serde_json::json!({}))
            .build();

        assert!(matches!(
            result,
            Err(StoreError::IncompleteEnvelope("aggregate_id"))
        ));
    }

    #[test]
    fn decode_reads_the_payload() {
        #[derive(Deserialize)]
        struct Payload {
            reason: String,
        }

        let envelope = EventEnvelope::builder()
            .event_type("Paused")
            .aggregate_id(AggregateId::new())
            .aggregate_type("HousingSearch")
            .payload_raw(serde_json::json!({"reason": "family emergency"}))
            .build()
            .unwrap();

        let payload: Payload = envelope.decode().unwrap();
        assert_eq!(payload.reason, "family emergency");
    }
}
