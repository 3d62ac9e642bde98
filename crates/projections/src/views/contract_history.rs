//! Contract history read model: every contract that collapsed or closed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{HousingSearchEvent, Money, PropertyId, StageTransition};
use store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A contract that fell through.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedContractRecord {
    pub search_id: AggregateId,
    pub property_id: PropertyId,
    pub contract_price: Money,
    pub contract_date: DateTime<Utc>,
    pub failed_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub days_under_contract: i64,
}

/// A contract that reached closing.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedContractRecord {
    pub search_id: AggregateId,
    pub property_id: PropertyId,
    pub price: Money,
    pub contract_date: DateTime<Utc>,
    pub closing_date: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct History {
    failures: HashMap<AggregateId, Vec<FailedContractRecord>>,
    closings: HashMap<AggregateId, ClosedContractRecord>,
}

/// Read model view of contract outcomes, per search and per property.
///
/// A search whose closing later collapses keeps its failure here, and its
/// closing record is dropped.
#[derive(Clone)]
pub struct ContractHistoryView {
    history: Arc<RwLock<History>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl ContractHistoryView {
    /// Creates a new empty contract history view.
    pub fn new() -> Self {
        Self {
            history: Arc::new(RwLock::new(History::default())),
            position: Arc::new(RwLock::new(ProjectionPosition::zero())),
        }
    }

    /// Gets the failed contracts of one search, oldest first.
    pub async fn failures_for_search(&self, search_id: AggregateId) -> Vec<FailedContractRecord> {
        self.history
            .read()
            .await
            .failures
            .get(&search_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Gets every failed contract on one property across all searches.
    pub async fn failures_for_property(&self, property_id: PropertyId) -> Vec<FailedContractRecord> {
        let history = self.history.read().await;
        let mut records: Vec<_> = history
            .failures
            .values()
            .flatten()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.failed_date);
        records
    }

    pub async fn total_failures(&self) -> usize {
        self.history.read().await.failures.values().map(Vec::len).sum()
    }

    pub async fn closing_for_search(&self, search_id: AggregateId) -> Option<ClosedContractRecord> {
        self.history.read().await.closings.get(&search_id).cloned()
    }

    pub async fn total_closings(&self) -> usize {
        self.history.read().await.closings.len()
    }

    async fn advance(&self, sequence: u64) {
        let mut pos = self.position.write().await;
        *pos = pos.advance_to(sequence);
    }
}

impl Default for ContractHistoryView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for ContractHistoryView {
    fn name(&self) -> &'static str {
        "ContractHistoryView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "HousingSearch"
            && let HousingSearchEvent::StageChanged(data) = event.decode()?
        {
            let search_id = event.aggregate_id;
            let mut history = self.history.write().await;

            match data.transition {
                StageTransition::ContractFellThrough { attempt } => {
                    history.closings.remove(&search_id);
                    history
                        .failures
                        .entry(search_id)
                        .or_default()
                        .push(FailedContractRecord {
                            search_id,
                            property_id: attempt.property_id(),
                            contract_price: attempt.contract_price().clone(),
                            contract_date: attempt.contract_date(),
                            failed_date: attempt.failed_date(),
                            reason: attempt.reason().map(str::to_string),
                            days_under_contract: attempt.days_under_contract(),
                        });
                }
                StageTransition::ClosingRecorded { contract } => {
                    history.closings.insert(
                        search_id,
                        ClosedContractRecord {
                            search_id,
                            property_id: contract.property_id(),
                            price: contract.price().clone(),
                            contract_date: contract.contract_date(),
                            closing_date: contract.actual_closing_date().unwrap_or(data.occurred_at),
                        },
                    );
                }
                _ => {}
            }
        }

        self.advance(event.sequence).await;
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        let mut history = self.history.write().await;
        history.failures.clear();
        history.closings.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for ContractHistoryView {
    fn name(&self) -> &'static str {
        "ContractHistoryView"
    }

    fn count(&self) -> usize {
        // Use try_read to avoid blocking; returns 0 if lock is held
        self.history
            .try_read()
            .map(|h| h.failures.values().map(Vec::len).sum::<usize>() + h.closings.len())
            .unwrap_or(0)
    }
}
