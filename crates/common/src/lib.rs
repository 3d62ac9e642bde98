//! Shared identifier and audit types.

mod types;

pub use types::{Actor, AggregateId};
