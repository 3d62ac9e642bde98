//! Periodic outbox relay loop.

use std::future::Future;
use std::time::Duration;

use projections::OutboxRelay;
use store::AggregateStore;
use tokio::time::MissedTickBehavior;

/// Drives an [`OutboxRelay`] on a fixed interval until shutdown.
pub struct RelayWorker<S: AggregateStore> {
    relay: OutboxRelay<S>,
    interval: Duration,
}

impl<S: AggregateStore> RelayWorker<S> {
    pub fn new(relay: OutboxRelay<S>, interval: Duration) -> Self {
        Self { relay, interval }
    }

    pub fn relay(&self) -> &OutboxRelay<S> {
        &self.relay
    }

    /// Runs outbox passes until `shutdown` resolves, then drains once more.
    ///
    /// A failed pass is logged and retried on the next tick; the events it
    /// could not deliver stay in the outbox. Returns the number of events
    /// dispatched over the worker's lifetime.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            projections = self.relay.projection_count(),
            "relay worker started"
        );

        let mut total = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => total += self.pass().await,
            }
        }

        total += self.pass().await;
        tracing::info!(events_dispatched = total, "relay worker stopped");
        total
    }

    async fn pass(&self) -> usize {
        match self.relay.run_until_idle().await {
            Ok(dispatched) => dispatched,
            Err(error) => {
                tracing::error!(%error, "outbox pass failed");
                metrics::counter!("outbox_relay_failures_total").increment(1);
                0
            }
        }
    }
}
