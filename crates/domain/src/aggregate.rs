//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use serde::{Serialize, de::DeserializeOwned};
use store::Version;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// Used as the envelope's `event_type` and for routing in projections.
    fn event_type(&self) -> &'static str;

    /// When the event was raised.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Who caused the event.
    fn actor(&self) -> &Actor;
}

/// Trait for aggregates persisted as a versioned state record.
///
/// Every mutation validates first, then records one event and applies it to
/// itself, so current state and event history never disagree. Raised events
/// wait in a pending buffer until the caller drains them with
/// [`Aggregate::take_events`] after a successful save.
pub trait Aggregate: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    ///
    /// Used for store organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    fn id(&self) -> AggregateId;

    /// Returns the business key that must be unique across aggregates of this
    /// type, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }

    /// Returns the stored version this instance was loaded at.
    ///
    /// [`Version::initial`] for an aggregate that has never been saved.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading and after saving.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be deterministic and must not fail: events are facts.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Events raised since the last drain, oldest first.
    fn pending_events(&self) -> &[Self::Event];

    /// Removes and returns all pending events, oldest first.
    fn take_events(&mut self) -> Vec<Self::Event>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Created { actor: Actor, at: DateTime<Utc> },
        Updated { value: i32, actor: Actor, at: DateTime<Utc> },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestCreated",
                TestEvent::Updated { .. } => "TestUpdated",
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                TestEvent::Created { at, .. } | TestEvent::Updated { at, .. } => *at,
            }
        }

        fn actor(&self) -> &Actor {
            match self {
                TestEvent::Created { actor, .. } | TestEvent::Updated { actor, .. } => actor,
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct TestAggregate {
        id: AggregateId,
        value: i32,
        #[serde(skip)]
        version: Version,
        #[serde(skip)]
        pending: Vec<TestEvent>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
        }

        fn id(&self) -> AggregateId {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            if let TestEvent::Updated { value, .. } = event {
                self.value = value;
            }
        }

        fn pending_events(&self) -> &[Self::Event] {
            &self.pending
        }

        fn take_events(&mut self) -> Vec<Self::Event> {
            std::mem::take(&mut self.pending)
        }
    }

    fn updated(value: i32) -> TestEvent {
        TestEvent::Updated {
            value,
            actor: Actor::system(),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_aggregate_apply_events() {
        let mut aggregate = TestAggregate::default();
        aggregate.apply_events(vec![
            TestEvent::Created {
                actor: Actor::system(),
                at: Utc::now(),
            },
            updated(42),
        ]);

        assert_eq!(aggregate.value, 42);
        assert!(aggregate.unique_key().is_none());
    }

    #[test]
    fn test_domain_event_metadata() {
        let event = updated(1);
        assert_eq!(event.event_type(), "TestUpdated");
        assert!(event.actor().is_system());
    }

    #[test]
    fn test_take_events_drains() {
        let mut aggregate = TestAggregate::default();
        aggregate.pending.push(updated(1));
        aggregate.pending.push(updated(2));

        assert_eq!(aggregate.pending_events().len(), 2);
        let drained = aggregate.take_events();
        assert_eq!(drained.len(), 2);
        assert!(aggregate.pending_events().is_empty());
        assert!(aggregate.take_events().is_empty());
    }
}
