use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors raised by an aggregate store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version did not match the version the caller loaded.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// Another aggregate of the same type already owns this unique key.
    #[error("Duplicate key for {aggregate_type}: {key} is already taken by {existing}")]
    DuplicateKey {
        aggregate_type: String,
        key: String,
        existing: AggregateId,
    },

    /// The events handed to `save` do not belong to the record being saved.
    #[error("Invalid commit: {0}")]
    InvalidCommit(String),

    /// An envelope was built without one of its required fields.
    #[error("Incomplete event envelope: missing {0}")]
    IncompleteEnvelope(&'static str),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if reloading the aggregate and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
