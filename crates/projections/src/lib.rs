//! Read models and the outbox relay for the housing search query side.
//!
//! This crate provides:
//! - [`Projection`] trait for processing events into read models
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`OutboxRelay`] for draining the store's outbox into projections
//! - Two read model views: the search pipeline and contract history

pub mod error;
pub mod projection;
pub mod read_model;
pub mod relay;
pub mod views;

pub use error::{ProjectionError, Result};
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use relay::{DEFAULT_BATCH_SIZE, OutboxRelay};
pub use views::{
    ClosedContractRecord, ContractHistoryView, FailedContractRecord, SearchPipelineView,
    SearchSummary,
};
