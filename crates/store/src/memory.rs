use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, AggregateRecord, EventEnvelope, EventId, Result, StoreError, Version,
    store::{AggregateStore, SaveOptions, validate_commit},
};

#[derive(Debug)]
struct OutboxEntry {
    envelope: EventEnvelope,
    dispatched: bool,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<AggregateId, AggregateRecord>,
    keys: HashMap<(String, String), AggregateId>,
    outbox: Vec<OutboxEntry>,
    /// Outbox index of every event, keyed by id.
    positions: HashMap<EventId, usize>,
    /// Everything before this index has been dispatched.
    first_pending: usize,
}

/// In-memory aggregate store.
///
/// Records, the unique-key index and the outbox share one lock, so a save is
/// all-or-nothing just like a single database transaction would be.
///
/// Dispatched outbox entries are kept as the event history, so memory grows
/// with every committed event for the life of the store.
#[derive(Clone, Default)]
pub struct InMemoryAggregateStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events in the outbox.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.outbox.len()
    }

    /// Returns the number of events still waiting for dispatch.
    pub async fn pending_count(&self) -> usize {
        self.inner
            .read()
            .await
            .outbox
            .iter()
            .filter(|e| !e.dispatched)
            .count()
    }
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn load(&self, aggregate_id: AggregateId) -> Result<Option<AggregateRecord>> {
        Ok(self.inner.read().await.records.get(&aggregate_id).cloned())
    }

    async fn find_by_key(
        &self,
        aggregate_type: &str,
        key: &str,
    ) -> Result<Option<AggregateRecord>> {
        let inner = self.inner.read().await;
        let found = inner
            .keys
            .get(&(aggregate_type.to_string(), key.to_string()))
            .and_then(|id| inner.records.get(id))
            .cloned();
        Ok(found)
    }

    async fn list(&self, aggregate_type: &str) -> Result<Vec<AggregateRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<_> = inner
            .records
            .values()
            .filter(|r| r.aggregate_type == aggregate_type)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.aggregate_id);
        Ok(records)
    }

    #[tracing::instrument(skip(self, record, events), fields(aggregate_id = %record.aggregate_id, events = events.len()))]
    async fn save(
        &self,
        mut record: AggregateRecord,
        events: Vec<EventEnvelope>,
        options: SaveOptions,
    ) -> Result<Version> {
        validate_commit(&record, &events)?;

        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let aggregate_id = record.aggregate_id;

        let current = inner
            .records
            .get(&aggregate_id)
            .map(|r| r.version)
            .unwrap_or(Version::initial());

        if current != options.expected_version {
            metrics::counter!("store_conflicts_total").increment(1);
            tracing::warn!(%current, expected = %options.expected_version, "version conflict");
            return Err(StoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version,
                actual: current,
            });
        }

        let key_slot = record
            .unique_key
            .clone()
            .map(|key| (record.aggregate_type.clone(), key));
        if let Some(slot) = &key_slot
            && let Some(existing) = inner.keys.get(slot)
            && *existing != aggregate_id
        {
            return Err(StoreError::DuplicateKey {
                aggregate_type: slot.0.clone(),
                key: slot.1.clone(),
                existing: *existing,
            });
        }

        let new_version = current.next();
        record.version = new_version;
        record.updated_at = Utc::now();

        // Only a record's own previous key can be replaced.
        let stale_key = inner.records.get(&aggregate_id).and_then(|previous| {
            previous
                .unique_key
                .clone()
                .filter(|key| Some(key) != record.unique_key.as_ref())
                .map(|key| (previous.aggregate_type.clone(), key))
        });
        if let Some(stale) = stale_key {
            inner.keys.remove(&stale);
        }
        if let Some(slot) = key_slot {
            inner.keys.insert(slot, aggregate_id);
        }
        inner.records.insert(aggregate_id, record);

        let mut sequence = inner.outbox.len() as u64;
        for mut envelope in events {
            sequence += 1;
            envelope.version = new_version;
            envelope.sequence = sequence;
            inner
                .positions
                .insert(envelope.event_id, inner.outbox.len());
            inner.outbox.push(OutboxEntry {
                envelope,
                dispatched: false,
            });
        }

        metrics::counter!("store_commits_total").increment(1);
        tracing::debug!(%new_version, "aggregate saved");

        Ok(new_version)
    }

    async fn undispatched(&self, limit: usize) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner.outbox[inner.first_pending..]
            .iter()
            .filter(|e| !e.dispatched)
            .take(limit)
            .map(|e| e.envelope.clone())
            .collect())
    }

    async fn mark_dispatched(&self, event_ids: &[EventId]) -> Result<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        for id in event_ids {
            if let Some(&index) = inner.positions.get(id) {
                inner.outbox[index].dispatched = true;
            }
        }
        while inner
            .outbox
            .get(inner.first_pending)
            .is_some_and(|e| e.dispatched)
        {
            inner.first_pending += 1;
        }
        Ok(())
    }

    async fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outbox
            .iter()
            .filter(|e| e.envelope.aggregate_id == aggregate_id)
            .map(|e| e.envelope.clone())
            .collect())
    }
}
