use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{AggregateId, Version};

/// The persisted form of one aggregate.
///
/// The store has no opinion on the shape of `state`; nested value objects and
/// append-only lists are kept as embedded JSON documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "HousingSearch").
    pub aggregate_type: String,

    /// Optional business key that must be unique per aggregate type.
    pub unique_key: Option<String>,

    /// Version assigned by the store on the last successful save.
    pub version: Version,

    pub updated_at: DateTime<Utc>,

    pub state: serde_json::Value,
}

impl AggregateRecord {
    /// Serializes an aggregate into an unsaved record.
    pub fn from_state<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            unique_key: None,
            version: Version::initial(),
            updated_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    pub fn with_unique_key(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    /// Deserializes the stored state.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.state)
    }
}
