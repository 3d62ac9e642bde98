//! Housing search aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use serde::{Deserialize, Serialize};
use store::Version;

use crate::aggregate::Aggregate;
use crate::money::Money;

use super::stage::{
    CONTRACT_FELL_THROUGH_FROM, PAUSE_FROM, PUT_UNDER_CONTRACT_FROM, RECORD_CLOSING_FROM,
    RECORD_MOVED_IN_FROM, REJECT_FROM, RESUME_FROM, START_HOUSE_HUNTING_FROM,
};
use super::{
    ApplicantId, Contract, FailedContractAttempt, FailedContractHistory, HousingPreferences,
    HousingSearchError, HousingSearchEvent, MovedInStatus, PropertyId, RequiredStages, Stage,
    StageKind, StageTransition,
    events::{HousingSearchStartedData, StageChangedData},
};

/// Housing search aggregate root.
///
/// Tracks one applicant's path from an approved application to living in a
/// purchased home. The stage only moves through the transition methods below,
/// each of which checks the current stage first and raises exactly one
/// [`HousingSearchEvent`] on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousingSearch {
    id: AggregateId,

    /// Stored version; owned by the record, not the state document.
    #[serde(skip)]
    version: Version,

    applicant_id: ApplicantId,
    search_number: String,

    stage: Stage,
    stage_changed_date: DateTime<Utc>,

    #[serde(default)]
    failed_contracts: FailedContractHistory,

    moved_in_status: Option<MovedInStatus>,
    moved_in_date: Option<DateTime<Utc>>,

    #[serde(default)]
    preferences: HousingPreferences,

    notes: Option<String>,
    is_active: bool,

    created_by: Actor,
    created_date: DateTime<Utc>,
    modified_by: Actor,
    modified_date: DateTime<Utc>,

    #[serde(skip)]
    pending_events: Vec<HousingSearchEvent>,
}

impl Aggregate for HousingSearch {
    type Event = HousingSearchEvent;
    type Error = HousingSearchError;

    fn aggregate_type() -> &'static str {
        "HousingSearch"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    /// One search per applicant.
    fn unique_key(&self) -> Option<String> {
        Some(self.applicant_id.to_string())
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            // Identity is fixed at creation.
            HousingSearchEvent::HousingSearchStarted(_) => {}
            HousingSearchEvent::StageChanged(data) => self.apply_stage_changed(data),
            HousingSearchEvent::HousingPreferencesUpdated(data) => {
                self.preferences = data.preferences;
                self.touch(data.updated_by, data.occurred_at);
            }
            HousingSearchEvent::MovedInStatusUpdated(data) => {
                self.moved_in_status = Some(data.status);
                if data.moved_in_date.is_some() {
                    self.moved_in_date = data.moved_in_date;
                }
                self.touch(data.updated_by, data.occurred_at);
            }
            HousingSearchEvent::NotesUpdated(data) => {
                self.notes = data.notes;
                self.touch(data.updated_by, data.occurred_at);
            }
            HousingSearchEvent::Deactivated(data) => {
                self.is_active = false;
                self.touch(data.changed_by, data.occurred_at);
            }
            HousingSearchEvent::Reactivated(data) => {
                self.is_active = true;
                self.touch(data.changed_by, data.occurred_at);
            }
        }
    }

    fn pending_events(&self) -> &[Self::Event] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.pending_events)
    }
}

// Query methods
impl HousingSearch {
    pub fn applicant_id(&self) -> ApplicantId {
        self.applicant_id
    }

    pub fn search_number(&self) -> &str {
        &self.search_number
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn stage_changed_date(&self) -> DateTime<Utc> {
        self.stage_changed_date
    }

    /// The contract held by the current stage, if any.
    pub fn current_contract(&self) -> Option<&Contract> {
        self.stage.contract()
    }

    pub fn contract_property_id(&self) -> Option<PropertyId> {
        self.current_contract().map(Contract::property_id)
    }

    pub fn contract_price(&self) -> Option<&Money> {
        self.current_contract().map(Contract::price)
    }

    pub fn contract_date(&self) -> Option<DateTime<Utc>> {
        self.current_contract().map(Contract::contract_date)
    }

    /// Expected closing date of the current contract.
    pub fn closing_date(&self) -> Option<DateTime<Utc>> {
        self.current_contract()
            .and_then(Contract::expected_closing_date)
    }

    pub fn actual_closing_date(&self) -> Option<DateTime<Utc>> {
        self.current_contract().and_then(Contract::actual_closing_date)
    }

    pub fn failed_contracts(&self) -> &FailedContractHistory {
        &self.failed_contracts
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.stage {
            Stage::Rejected { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn pause_reason(&self) -> Option<&str> {
        match &self.stage {
            Stage::Paused { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn moved_in_status(&self) -> Option<MovedInStatus> {
        self.moved_in_status
    }

    pub fn moved_in_date(&self) -> Option<DateTime<Utc>> {
        self.moved_in_date
    }

    pub fn preferences(&self) -> &HousingPreferences {
        &self.preferences
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns true once the search is rejected or the family moved in.
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn created_by(&self) -> &Actor {
        &self.created_by
    }

    pub fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    pub fn modified_by(&self) -> &Actor {
        &self.modified_by
    }

    pub fn modified_date(&self) -> DateTime<Utc> {
        self.modified_date
    }
}

// Command methods
impl HousingSearch {
    /// Opens a new search in the `Submitted` stage.
    pub fn create(
        id: AggregateId,
        applicant_id: ApplicantId,
        search_number: &str,
        created_by: impl Into<Actor>,
    ) -> Result<Self, HousingSearchError> {
        if id.is_nil() {
            return Err(HousingSearchError::SearchIdRequired);
        }
        if applicant_id.is_nil() {
            return Err(HousingSearchError::ApplicantIdRequired);
        }
        let search_number = search_number.trim();
        if search_number.is_empty() {
            return Err(HousingSearchError::SearchNumberRequired);
        }

        let data = HousingSearchStartedData {
            search_id: id,
            applicant_id,
            search_number: search_number.to_string(),
            created_by: created_by.into(),
            occurred_at: Utc::now(),
        };
        let mut search = Self::from_started(&data);
        search
            .pending_events
            .push(HousingSearchEvent::HousingSearchStarted(data));
        Ok(search)
    }

    /// Rebuilds a search by replaying its events in order.
    pub fn from_history(
        events: impl IntoIterator<Item = HousingSearchEvent>,
    ) -> Result<Self, HousingSearchError> {
        let mut events = events.into_iter();
        let Some(HousingSearchEvent::HousingSearchStarted(data)) = events.next() else {
            return Err(HousingSearchError::HistoryWithoutStart);
        };
        let mut search = Self::from_started(&data);
        search.apply_events(events);
        Ok(search)
    }

    pub fn start_house_hunting(
        &mut self,
        modified_by: impl Into<Actor>,
    ) -> Result<(), HousingSearchError> {
        self.ensure_stage("start house hunting", START_HOUSE_HUNTING_FROM)?;
        self.change_stage(StageTransition::HouseHuntingStarted, modified_by.into());
        Ok(())
    }

    /// Turns the application down. Appends `Rejected: {reason}` to the notes.
    pub fn reject(
        &mut self,
        reason: &str,
        modified_by: impl Into<Actor>,
    ) -> Result<(), HousingSearchError> {
        self.ensure_stage("reject", REJECT_FROM)?;
        let reason = required_reason(reason, "reject")?;
        self.change_stage(StageTransition::Rejected { reason }, modified_by.into());
        Ok(())
    }

    /// Signs a contract on a property. The contract date is now.
    pub fn put_under_contract(
        &mut self,
        property_id: PropertyId,
        price: Money,
        expected_closing_date: Option<DateTime<Utc>>,
        modified_by: impl Into<Actor>,
    ) -> Result<(), HousingSearchError> {
        self.ensure_stage("put under contract", PUT_UNDER_CONTRACT_FROM)?;
        let contract = Contract::new(property_id, price, Utc::now(), expected_closing_date)?;
        self.change_stage(
            StageTransition::ContractSigned { contract },
            modified_by.into(),
        );
        Ok(())
    }

    /// Puts the search on hold. Appends `Paused: {reason}` to the notes.
    pub fn pause(
        &mut self,
        reason: &str,
        modified_by: impl Into<Actor>,
    ) -> Result<(), HousingSearchError> {
        self.ensure_stage("pause", PAUSE_FROM)?;
        let reason = required_reason(reason, "pause")?;
        self.change_stage(StageTransition::Paused { reason }, modified_by.into());
        Ok(())
    }

    pub fn resume(&mut self, modified_by: impl Into<Actor>) -> Result<(), HousingSearchError> {
        self.ensure_stage("resume", RESUME_FROM)?;
        self.change_stage(StageTransition::Resumed, modified_by.into());
        Ok(())
    }

    /// Archives the current contract and returns to house hunting.
    ///
    /// Allowed after closing is recorded, until the family moves in. A blank
    /// reason is stored as no reason.
    pub fn contract_fell_through(
        &mut self,
        reason: Option<&str>,
        modified_by: impl Into<Actor>,
    ) -> Result<(), HousingSearchError> {
        self.ensure_stage("mark contract as fallen through", CONTRACT_FELL_THROUGH_FROM)?;
        let Some(contract) = self.stage.contract() else {
            return Err(self.transition_error(
                "mark contract as fallen through",
                CONTRACT_FELL_THROUGH_FROM,
            ));
        };
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let attempt = FailedContractAttempt::from_contract(contract, Utc::now(), reason);
        self.change_stage(
            StageTransition::ContractFellThrough { attempt },
            modified_by.into(),
        );
        Ok(())
    }

    pub fn record_closing(
        &mut self,
        actual_closing_date: DateTime<Utc>,
        modified_by: impl Into<Actor>,
    ) -> Result<(), HousingSearchError> {
        self.ensure_stage("record closing", RECORD_CLOSING_FROM)?;
        let Some(contract) = self.stage.contract() else {
            return Err(self.transition_error("record closing", RECORD_CLOSING_FROM));
        };
        let contract = contract.with_actual_closing_date(actual_closing_date);
        self.change_stage(
            StageTransition::ClosingRecorded { contract },
            modified_by.into(),
        );
        Ok(())
    }

    /// Marks the family as moved in. Leaves `moved_in_status` untouched.
    pub fn record_moved_in(
        &mut self,
        moved_in_date: DateTime<Utc>,
        modified_by: impl Into<Actor>,
    ) -> Result<(), HousingSearchError> {
        self.ensure_stage("record move-in", RECORD_MOVED_IN_FROM)?;
        let Some(contract) = self.stage.contract().cloned() else {
            return Err(self.transition_error("record move-in", RECORD_MOVED_IN_FROM));
        };
        self.change_stage(
            StageTransition::MovedIn {
                contract,
                moved_in_date,
            },
            modified_by.into(),
        );
        Ok(())
    }

    /// Replaces the housing criteria. Allowed in any stage.
    pub fn update_housing_preferences(
        &mut self,
        preferences: HousingPreferences,
        modified_by: impl Into<Actor>,
    ) {
        self.raise(HousingSearchEvent::housing_preferences_updated(
            self.id,
            preferences,
            modified_by.into(),
        ));
    }

    /// Records occupancy status after closing. Allowed in any stage.
    pub fn set_moved_in_status(
        &mut self,
        status: MovedInStatus,
        moved_in_date: Option<DateTime<Utc>>,
        modified_by: impl Into<Actor>,
    ) {
        self.raise(HousingSearchEvent::moved_in_status_updated(
            self.id,
            status,
            moved_in_date,
            modified_by.into(),
        ));
    }

    /// Replaces the notes. Blank text clears them.
    pub fn update_notes(&mut self, notes: &str, modified_by: impl Into<Actor>) {
        let notes = Some(notes.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        self.raise(HousingSearchEvent::notes_updated(
            self.id,
            notes,
            modified_by.into(),
        ));
    }

    /// Soft-deletes the search. No event if already inactive.
    pub fn deactivate(&mut self, modified_by: impl Into<Actor>) {
        if self.is_active {
            self.raise(HousingSearchEvent::deactivated(self.id, modified_by.into()));
        }
    }

    /// Restores a soft-deleted search. No event if already active.
    pub fn reactivate(&mut self, modified_by: impl Into<Actor>) {
        if !self.is_active {
            self.raise(HousingSearchEvent::reactivated(self.id, modified_by.into()));
        }
    }
}

// Event helpers
impl HousingSearch {
    fn from_started(data: &HousingSearchStartedData) -> Self {
        Self {
            id: data.search_id,
            version: Version::initial(),
            applicant_id: data.applicant_id,
            search_number: data.search_number.clone(),
            stage: Stage::Submitted,
            stage_changed_date: data.occurred_at,
            failed_contracts: FailedContractHistory::default(),
            moved_in_status: None,
            moved_in_date: None,
            preferences: HousingPreferences::default(),
            notes: None,
            is_active: true,
            created_by: data.created_by.clone(),
            created_date: data.occurred_at,
            modified_by: data.created_by.clone(),
            modified_date: data.occurred_at,
            pending_events: Vec::new(),
        }
    }

    fn raise(&mut self, event: HousingSearchEvent) {
        self.apply(event.clone());
        self.pending_events.push(event);
    }

    fn change_stage(&mut self, transition: StageTransition, modified_by: Actor) {
        let event =
            HousingSearchEvent::stage_changed(self.id, self.stage.kind(), transition, modified_by);
        self.raise(event);
    }

    fn apply_stage_changed(&mut self, data: StageChangedData) {
        self.stage = match data.transition {
            StageTransition::HouseHuntingStarted | StageTransition::Resumed => Stage::HouseHunting,
            StageTransition::Rejected { reason } => {
                self.append_note(&format!("Rejected: {reason}"));
                Stage::Rejected { reason }
            }
            StageTransition::ContractSigned { contract } => Stage::UnderContract(contract),
            StageTransition::Paused { reason } => {
                self.append_note(&format!("Paused: {reason}"));
                Stage::Paused { reason }
            }
            StageTransition::ContractFellThrough { attempt } => {
                self.failed_contracts.push(attempt);
                Stage::HouseHunting
            }
            StageTransition::ClosingRecorded { contract } => Stage::Closed(contract),
            StageTransition::MovedIn {
                contract,
                moved_in_date,
            } => {
                self.moved_in_date = Some(moved_in_date);
                Stage::MovedIn { contract }
            }
        };
        self.stage_changed_date = data.occurred_at;
        self.touch(data.changed_by, data.occurred_at);
    }

    fn append_note(&mut self, line: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line.to_string(),
        });
    }

    fn touch(&mut self, by: Actor, at: DateTime<Utc>) {
        self.modified_by = by;
        self.modified_date = at;
    }

    fn ensure_stage(
        &self,
        action: &'static str,
        allowed: &'static [StageKind],
    ) -> Result<(), HousingSearchError> {
        if allowed.contains(&self.stage.kind()) {
            Ok(())
        } else {
            Err(self.transition_error(action, allowed))
        }
    }

    fn transition_error(
        &self,
        action: &'static str,
        allowed: &'static [StageKind],
    ) -> HousingSearchError {
        HousingSearchError::InvalidTransition {
            action,
            required: RequiredStages(allowed),
            current: self.stage.kind(),
        }
    }
}

fn required_reason(reason: &str, action: &'static str) -> Result<String, HousingSearchError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(HousingSearchError::ReasonRequired { action });
    }
    Ok(reason.to_string())
}
