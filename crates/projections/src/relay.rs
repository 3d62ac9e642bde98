//! Outbox relay feeding committed events to projections.

use store::{AggregateStore, EventEnvelope};

use crate::Result;
use crate::projection::Projection;

/// Default number of outbox events fetched per pass.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Drains the store's outbox and delivers each event to the registered
/// projections.
///
/// An event is marked dispatched only after every projection accepted it, so
/// a failed pass leaves it in the outbox for the next one. Projections skip
/// sequences they have already applied, which makes redelivery harmless.
pub struct OutboxRelay<S: AggregateStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    batch_size: usize,
}

impl<S: AggregateStore> OutboxRelay<S> {
    /// Creates a relay reading from the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets how many events one pass fetches. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Registers a projection with this relay.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs a single pass over the oldest undispatched events.
    ///
    /// Returns how many events were dispatched. Stops at the first event a
    /// projection fails on; events before it stay dispatched.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> Result<usize> {
        let batch = self.store.undispatched(self.batch_size).await?;
        let mut dispatched = 0;

        for event in &batch {
            self.deliver(event).await?;
            self.store.mark_dispatched(&[event.event_id]).await?;
            metrics::counter!("outbox_events_dispatched_total", "event_type" => event.event_type.clone())
                .increment(1);
            dispatched += 1;
        }

        if dispatched > 0 {
            tracing::debug!(dispatched, "outbox pass complete");
        }

        Ok(dispatched)
    }

    /// Runs passes until the outbox is empty.
    ///
    /// Returns the total number of events dispatched.
    #[tracing::instrument(skip(self))]
    pub async fn run_until_idle(&self) -> Result<usize> {
        let mut total = 0;
        loop {
            let dispatched = self.run_once().await?;
            if dispatched == 0 {
                break;
            }
            total += dispatched;
        }
        if total > 0 {
            tracing::info!(events_dispatched = total, "outbox drained");
        }
        Ok(total)
    }

    #[tracing::instrument(
        skip(self, event),
        fields(event_type = %event.event_type, sequence = event.sequence)
    )]
    async fn deliver(&self, event: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            if projection.position().await.has_seen(event.sequence) {
                continue;
            }
            if let Err(error) = projection.handle(event).await {
                tracing::error!(projection = projection.name(), %error, "projection failed");
                metrics::counter!("projection_failures_total", "projection" => projection.name())
                    .increment(1);
                return Err(error);
            }
        }
        Ok(())
    }
}
