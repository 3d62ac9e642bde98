//! Projection error types.

use thiserror::Error;

/// Errors raised while relaying outbox events into read models.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Reading or acknowledging the outbox failed.
    #[error("outbox error: {0}")]
    Store(#[from] store::StoreError),

    /// An envelope payload did not decode into a housing search event.
    #[error("undecodable event payload: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A read model refused an event.
    #[error("{projection} rejected event: {reason}")]
    Rejected {
        projection: &'static str,
        reason: String,
    },
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
