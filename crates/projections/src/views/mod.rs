//! Read model views over housing search events.

pub mod contract_history;
pub mod search_pipeline;

pub use contract_history::{ClosedContractRecord, ContractHistoryView, FailedContractRecord};
pub use search_pipeline::{SearchPipelineView, SearchSummary};

#[cfg(test)]
pub(crate) mod test_support {
    use common::AggregateId;
    use domain::{DomainEvent, HousingSearchEvent};
    use store::EventEnvelope;

    /// Wraps an event the way the store would after committing it at
    /// `sequence`.
    pub fn envelope(
        search_id: AggregateId,
        sequence: u64,
        event: &HousingSearchEvent,
    ) -> EventEnvelope {
        let mut envelope = EventEnvelope::builder()
            .aggregate_id(search_id)
            .aggregate_type("HousingSearch")
            .event_type(event.event_type())
            .timestamp(event.occurred_at())
            .payload(event)
            .unwrap()
            .metadata("actor", serde_json::json!(event.actor().as_str()))
            .build()
            .unwrap();
        envelope.sequence = sequence;
        envelope
    }
}
