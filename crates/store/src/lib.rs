//! Persistence collaborator for the housing search workspace.
//!
//! Aggregates are stored as versioned JSON records. Every save commits the new
//! record together with the events drained from the aggregate into an outbox,
//! and the version check on save is the optimistic-concurrency guard between
//! two commands racing on the same aggregate.

pub mod error;
pub mod event;
pub mod memory;
pub mod record;
pub mod store;

pub use common::AggregateId;
pub use error::{Result, StoreError};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryAggregateStore;
pub use record::AggregateRecord;
pub use store::{AggregateStore, SaveOptions};
