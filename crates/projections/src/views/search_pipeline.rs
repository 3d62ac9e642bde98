//! Search pipeline read model: one row per housing search.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{ApplicantId, HousingSearchEvent, Money, PropertyId, StageKind, StageTransition};
use store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

const AGGREGATE_TYPE: &str = "HousingSearch";

/// Coordinator-facing summary of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSummary {
    pub search_id: AggregateId,
    pub applicant_id: ApplicantId,
    pub search_number: String,
    pub stage: StageKind,
    pub stage_changed_at: DateTime<Utc>,
    pub is_active: bool,

    /// Property and price of the live contract, kept after closing.
    pub property_id: Option<PropertyId>,
    pub contract_price: Option<Money>,

    pub failed_contract_count: usize,
    pub last_changed_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchSummary {
    /// True for searches a coordinator still has to work on.
    pub fn is_open(&self) -> bool {
        self.is_active && !self.stage.is_terminal()
    }

    fn apply_transition(&mut self, transition: &StageTransition) {
        match transition {
            StageTransition::ContractSigned { contract }
            | StageTransition::ClosingRecorded { contract }
            | StageTransition::MovedIn { contract, .. } => {
                self.property_id = Some(contract.property_id());
                self.contract_price = Some(contract.price().clone());
            }
            StageTransition::ContractFellThrough { .. } => {
                self.failed_contract_count += 1;
                self.property_id = None;
                self.contract_price = None;
            }
            StageTransition::HouseHuntingStarted
            | StageTransition::Rejected { .. }
            | StageTransition::Paused { .. }
            | StageTransition::Resumed => {}
        }
    }
}

/// Read model view listing every search with its current stage.
///
/// Deactivated searches stay in the view with `is_active` cleared.
#[derive(Clone)]
pub struct SearchPipelineView {
    searches: Arc<RwLock<HashMap<AggregateId, SearchSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl SearchPipelineView {
    /// Creates a new empty pipeline view.
    pub fn new() -> Self {
        Self {
            searches: Arc::new(RwLock::new(HashMap::new())),
            position: Arc::new(RwLock::new(ProjectionPosition::zero())),
        }
    }

    pub async fn get_search(&self, search_id: AggregateId) -> Option<SearchSummary> {
        self.searches.read().await.get(&search_id).cloned()
    }

    pub async fn find_by_applicant(&self, applicant_id: ApplicantId) -> Option<SearchSummary> {
        self.searches
            .read()
            .await
            .values()
            .find(|s| s.applicant_id == applicant_id)
            .cloned()
    }

    /// Gets searches in one stage, oldest stage change first.
    pub async fn by_stage(&self, stage: StageKind) -> Vec<SearchSummary> {
        let mut searches: Vec<_> = self
            .searches
            .read()
            .await
            .values()
            .filter(|s| s.stage == stage)
            .cloned()
            .collect();
        searches.sort_by_key(|s| s.stage_changed_at);
        searches
    }

    /// Gets active searches that have not reached a terminal stage.
    pub async fn open_searches(&self) -> Vec<SearchSummary> {
        self.searches
            .read()
            .await
            .values()
            .filter(|s| s.is_open())
            .cloned()
            .collect()
    }

    /// Counts active searches per stage.
    pub async fn count_by_stage(&self) -> BTreeMap<StageKind, usize> {
        let mut counts = BTreeMap::new();
        for summary in self.searches.read().await.values().filter(|s| s.is_active) {
            *counts.entry(summary.stage).or_insert(0) += 1;
        }
        counts
    }

    async fn advance(&self, sequence: u64) {
        let mut pos = self.position.write().await;
        *pos = pos.advance_to(sequence);
    }
}

impl Default for SearchPipelineView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for SearchPipelineView {
    fn name(&self) -> &'static str {
        "SearchPipelineView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != AGGREGATE_TYPE {
            self.advance(event.sequence).await;
            return Ok(());
        }

        let search_event: HousingSearchEvent = event.decode()?;
        let search_id = event.aggregate_id;

        let mut searches = self.searches.write().await;

        match search_event {
            HousingSearchEvent::HousingSearchStarted(data) => {
                searches.insert(
                    search_id,
                    SearchSummary {
                        search_id,
                        applicant_id: data.applicant_id,
                        search_number: data.search_number,
                        stage: StageKind::Submitted,
                        stage_changed_at: data.occurred_at,
                        is_active: true,
                        property_id: None,
                        contract_price: None,
                        failed_contract_count: 0,
                        last_changed_by: data.created_by.as_str().to_string(),
                        created_at: data.occurred_at,
                        updated_at: data.occurred_at,
                    },
                );
            }
            HousingSearchEvent::StageChanged(data) => {
                if let Some(search) = searches.get_mut(&search_id) {
                    search.stage = data.new_stage;
                    search.stage_changed_at = data.occurred_at;
                    search.apply_transition(&data.transition);
                    search.last_changed_by = data.changed_by.as_str().to_string();
                    search.updated_at = data.occurred_at;
                }
            }
            HousingSearchEvent::Deactivated(data) => {
                if let Some(search) = searches.get_mut(&search_id) {
                    search.is_active = false;
                    search.last_changed_by = data.changed_by.as_str().to_string();
                    search.updated_at = data.occurred_at;
                }
            }
            HousingSearchEvent::Reactivated(data) => {
                if let Some(search) = searches.get_mut(&search_id) {
                    search.is_active = true;
                    search.last_changed_by = data.changed_by.as_str().to_string();
                    search.updated_at = data.occurred_at;
                }
            }
            HousingSearchEvent::HousingPreferencesUpdated(_)
            | HousingSearchEvent::MovedInStatusUpdated(_)
            | HousingSearchEvent::NotesUpdated(_) => {
                if let Some(search) = searches.get_mut(&search_id) {
                    if let Some(actor) = event.actor() {
                        search.last_changed_by = actor.to_string();
                    }
                    search.updated_at = event.timestamp;
                }
            }
        }
        drop(searches);

        self.advance(event.sequence).await;
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.searches.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for SearchPipelineView {
    fn name(&self) -> &'static str {
        "SearchPipelineView"
    }

    fn count(&self) -> usize {
        // Use try_read to avoid blocking; returns 0 if lock is held
        self.searches.try_read().map(|s| s.len()).unwrap_or(0)
    }
}
