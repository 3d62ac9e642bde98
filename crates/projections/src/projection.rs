//! Core projection trait and position tracking.

use async_trait::async_trait;
use store::EventEnvelope;

use crate::Result;

/// The outbox sequence of the last event a projection has applied.
///
/// Outbox delivery is at-least-once, so a projection may see an event twice;
/// anything at or below the position has already been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition {
    pub last_sequence: u64,
}

impl ProjectionPosition {
    /// Creates a new position at zero.
    pub fn zero() -> Self {
        Self { last_sequence: 0 }
    }

    /// Returns true if the event at `sequence` was already applied.
    pub fn has_seen(&self, sequence: u64) -> bool {
        sequence <= self.last_sequence
    }

    /// Moves the position forward. Never moves backwards.
    pub fn advance_to(&self, sequence: u64) -> Self {
        Self {
            last_sequence: self.last_sequence.max(sequence),
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.last_sequence)
    }
}

/// A projection that processes events and updates a read model.
///
/// Projections are the mechanism by which events are transformed into
/// denormalized read models optimized for queries.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Handles a single event, updating the projection's read model and
    /// advancing its position to the event's sequence.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// Returns the current position of this projection.
    async fn position(&self) -> ProjectionPosition;

    /// Resets the projection to its initial state.
    async fn reset(&self) -> Result<()>;
}
