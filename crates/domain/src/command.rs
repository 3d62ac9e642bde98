//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use store::{AggregateRecord, AggregateStore, EventEnvelope, SaveOptions, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Default number of reload-and-retry rounds after a concurrency conflict.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after the command, at `new_version`.
    pub aggregate: A,

    /// The events that were raised and committed, oldest first.
    pub events: Vec<A::Event>,

    /// The stored version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;

    /// Short name used for metrics labels and spans.
    fn name(&self) -> &'static str;
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate record from the store
/// 2. Running the command against the aggregate
/// 3. Saving the new state and the raised events in one commit
/// 4. Draining the events only once the commit succeeded
///
/// A commit that loses a version race is retried from a fresh load, up to
/// `max_conflict_retries` times.
pub struct CommandHandler<S, A>
where
    S: AggregateStore,
    A: Aggregate,
{
    store: S,
    max_conflict_retries: u32,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: AggregateStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            _phantom: PhantomData,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_conflict_retries(&self) -> u32 {
        self.max_conflict_retries
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        match self.store.load(aggregate_id).await? {
            Some(record) => Ok(Some(Self::restore(&record)?)),
            None => Ok(None),
        }
    }

    /// Loads an aggregate that must exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.load(aggregate_id)
            .await?
            .ok_or_else(|| DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: aggregate_id.to_string(),
            })
    }

    /// Finds an aggregate by its unique business key.
    pub async fn find_by_key(&self, key: &str) -> Result<Option<A>, DomainError> {
        match self.store.find_by_key(A::aggregate_type(), key).await? {
            Some(record) => Ok(Some(Self::restore(&record)?)),
            None => Ok(None),
        }
    }

    /// Saves a freshly created aggregate together with its creation events.
    pub async fn create(&self, aggregate: A) -> Result<CommandResult<A>, DomainError> {
        self.commit(aggregate, Version::initial()).await
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function mutates the loaded aggregate and may be called
    /// more than once when a concurrent writer wins the race. If it raises no
    /// events nothing is saved.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&mut A) -> Result<(), A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 0;
        loop {
            let mut aggregate = self.load_existing(aggregate_id).await?;
            let loaded_version = aggregate.version();

            command_fn(&mut aggregate)?;

            if aggregate.pending_events().is_empty() {
                return Ok(CommandResult {
                    aggregate,
                    events: vec![],
                    new_version: loaded_version,
                });
            }

            match self.commit(aggregate, loaded_version).await {
                Err(err) if err.is_conflict() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    metrics::counter!("housing_search_conflicts_total").increment(1);
                    tracing::warn!(%aggregate_id, attempt, "concurrency conflict, retrying");
                }
                result => return result,
            }
        }
    }

    async fn commit(
        &self,
        mut aggregate: A,
        expected_version: Version,
    ) -> Result<CommandResult<A>, DomainError> {
        let aggregate_id = aggregate.id();
        let envelopes = Self::build_envelopes(aggregate_id, aggregate.pending_events())?;

        let mut record = AggregateRecord::from_state(aggregate_id, A::aggregate_type(), &aggregate)?;
        if let Some(key) = aggregate.unique_key() {
            record = record.with_unique_key(key);
        }

        let new_version = self
            .store
            .save(record, envelopes, SaveOptions::expect_version(expected_version))
            .await?;

        let events = aggregate.take_events();
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Builds event envelopes from pending domain events.
    fn build_envelopes(
        aggregate_id: AggregateId,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        for event in events {
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .timestamp(event.occurred_at())
                .metadata("actor", serde_json::json!(event.actor().as_str()))
                .payload(event)?
                .build()?;
            envelopes.push(envelope);
        }
        Ok(envelopes)
    }

    fn restore(record: &AggregateRecord) -> Result<A, DomainError> {
        let mut aggregate: A = record.decode()?;
        aggregate.set_version(record.version);
        Ok(aggregate)
    }
}
