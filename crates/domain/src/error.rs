//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::housing_search::{ErrorKind, HousingSearchError};

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the aggregate store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The housing search refused the operation.
    #[error("Housing search error: {0}")]
    HousingSearch(#[from] HousingSearchError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// The applicant already has a search.
    #[error("Applicant {applicant_id} already has housing search {existing}")]
    SearchAlreadyExists {
        applicant_id: String,
        existing: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the operation lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Store(err) if err.is_conflict())
    }

    /// Returns the rule category when the aggregate itself refused.
    pub fn rule_kind(&self) -> Option<ErrorKind> {
        match self {
            DomainError::HousingSearch(err) => Some(err.kind()),
            _ => None,
        }
    }
}
