//! Housing search domain events.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{
    ApplicantId, Contract, FailedContractAttempt, HousingPreferences, MovedInStatus, StageKind,
};

/// Events raised by a housing search, one per successful state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HousingSearchEvent {
    /// A search was opened for an applicant.
    HousingSearchStarted(HousingSearchStartedData),

    /// The search moved from one stage to another.
    StageChanged(StageChangedData),

    /// The applicant's housing criteria were replaced.
    HousingPreferencesUpdated(HousingPreferencesUpdatedData),

    /// Occupancy status after closing was recorded.
    MovedInStatusUpdated(MovedInStatusUpdatedData),

    /// Coordinator notes were replaced or cleared.
    NotesUpdated(NotesUpdatedData),

    /// The search was soft-deleted.
    Deactivated(ActivityChangedData),

    /// A soft-deleted search was restored.
    Reactivated(ActivityChangedData),
}

impl DomainEvent for HousingSearchEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HousingSearchEvent::HousingSearchStarted(_) => "HousingSearchStarted",
            HousingSearchEvent::StageChanged(_) => "StageChanged",
            HousingSearchEvent::HousingPreferencesUpdated(_) => "HousingPreferencesUpdated",
            HousingSearchEvent::MovedInStatusUpdated(_) => "MovedInStatusUpdated",
            HousingSearchEvent::NotesUpdated(_) => "NotesUpdated",
            HousingSearchEvent::Deactivated(_) => "Deactivated",
            HousingSearchEvent::Reactivated(_) => "Reactivated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            HousingSearchEvent::HousingSearchStarted(data) => data.occurred_at,
            HousingSearchEvent::StageChanged(data) => data.occurred_at,
            HousingSearchEvent::HousingPreferencesUpdated(data) => data.occurred_at,
            HousingSearchEvent::MovedInStatusUpdated(data) => data.occurred_at,
            HousingSearchEvent::NotesUpdated(data) => data.occurred_at,
            HousingSearchEvent::Deactivated(data) | HousingSearchEvent::Reactivated(data) => {
                data.occurred_at
            }
        }
    }

    fn actor(&self) -> &Actor {
        match self {
            HousingSearchEvent::HousingSearchStarted(data) => &data.created_by,
            HousingSearchEvent::StageChanged(data) => &data.changed_by,
            HousingSearchEvent::HousingPreferencesUpdated(data) => &data.updated_by,
            HousingSearchEvent::MovedInStatusUpdated(data) => &data.updated_by,
            HousingSearchEvent::NotesUpdated(data) => &data.updated_by,
            HousingSearchEvent::Deactivated(data) | HousingSearchEvent::Reactivated(data) => {
                &data.changed_by
            }
        }
    }
}

impl HousingSearchEvent {
    /// The search this event belongs to.
    pub fn search_id(&self) -> AggregateId {
        match self {
            HousingSearchEvent::HousingSearchStarted(data) => data.search_id,
            HousingSearchEvent::StageChanged(data) => data.search_id,
            HousingSearchEvent::HousingPreferencesUpdated(data) => data.search_id,
            HousingSearchEvent::MovedInStatusUpdated(data) => data.search_id,
            HousingSearchEvent::NotesUpdated(data) => data.search_id,
            HousingSearchEvent::Deactivated(data) | HousingSearchEvent::Reactivated(data) => {
                data.search_id
            }
        }
    }
}

/// Data for HousingSearchStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingSearchStartedData {
    pub search_id: AggregateId,
    pub applicant_id: ApplicantId,

    /// Human-readable reference, e.g. `HS-2024-0042`.
    pub search_number: String,

    pub created_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Data for StageChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChangedData {
    pub search_id: AggregateId,
    pub previous_stage: StageKind,
    pub new_stage: StageKind,

    /// What happened, with the data the new stage needs.
    pub transition: StageTransition,

    pub changed_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// The specific transition behind a stage change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StageTransition {
    HouseHuntingStarted,
    Rejected {
        reason: String,
    },
    ContractSigned {
        contract: Contract,
    },
    Paused {
        reason: String,
    },
    Resumed,
    /// The collapsed contract, already archived as a history entry.
    ContractFellThrough {
        attempt: FailedContractAttempt,
    },
    /// The contract with its actual closing date set.
    ClosingRecorded {
        contract: Contract,
    },
    MovedIn {
        contract: Contract,
        moved_in_date: DateTime<Utc>,
    },
}

impl StageTransition {
    /// The stage this transition lands in.
    pub fn target(&self) -> StageKind {
        match self {
            StageTransition::HouseHuntingStarted
            | StageTransition::Resumed
            | StageTransition::ContractFellThrough { .. } => StageKind::HouseHunting,
            StageTransition::Rejected { .. } => StageKind::Rejected,
            StageTransition::ContractSigned { .. } => StageKind::UnderContract,
            StageTransition::Paused { .. } => StageKind::Paused,
            StageTransition::ClosingRecorded { .. } => StageKind::Closed,
            StageTransition::MovedIn { .. } => StageKind::MovedIn,
        }
    }
}

/// Data for HousingPreferencesUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingPreferencesUpdatedData {
    pub search_id: AggregateId,

    /// The full replacement snapshot.
    pub preferences: HousingPreferences,

    pub updated_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Data for MovedInStatusUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovedInStatusUpdatedData {
    pub search_id: AggregateId,
    pub status: MovedInStatus,
    pub moved_in_date: Option<DateTime<Utc>>,
    pub updated_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Data for NotesUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesUpdatedData {
    pub search_id: AggregateId,
    pub notes: Option<String>,
    pub updated_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Data for Deactivated and Reactivated events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityChangedData {
    pub search_id: AggregateId,
    pub changed_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

// Convenience constructors for events
impl HousingSearchEvent {
    pub fn housing_search_started(
        search_id: AggregateId,
        applicant_id: ApplicantId,
        search_number: String,
        created_by: Actor,
    ) -> Self {
        HousingSearchEvent::HousingSearchStarted(HousingSearchStartedData {
            search_id,
            applicant_id,
            search_number,
            created_by,
            occurred_at: Utc::now(),
        })
    }

    pub fn stage_changed(
        search_id: AggregateId,
        previous_stage: StageKind,
        transition: StageTransition,
        changed_by: Actor,
    ) -> Self {
        HousingSearchEvent::StageChanged(StageChangedData {
            search_id,
            previous_stage,
            new_stage: transition.target(),
            transition,
            changed_by,
            occurred_at: Utc::now(),
        })
    }

    pub fn housing_preferences_updated(
        search_id: AggregateId,
        preferences: HousingPreferences,
        updated_by: Actor,
    ) -> Self {
        HousingSearchEvent::HousingPreferencesUpdated(HousingPreferencesUpdatedData {
            search_id,
            preferences,
            updated_by,
            occurred_at: Utc::now(),
        })
    }

    pub fn moved_in_status_updated(
        search_id: AggregateId,
        status: MovedInStatus,
        moved_in_date: Option<DateTime<Utc>>,
        updated_by: Actor,
    ) -> Self {
        HousingSearchEvent::MovedInStatusUpdated(MovedInStatusUpdatedData {
            search_id,
            status,
            moved_in_date,
            updated_by,
            occurred_at: Utc::now(),
        })
    }

    pub fn notes_updated(search_id: AggregateId, notes: Option<String>, updated_by: Actor) -> Self {
        HousingSearchEvent::NotesUpdated(NotesUpdatedData {
            search_id,
            notes,
            updated_by,
            occurred_at: Utc::now(),
        })
    }

    pub fn deactivated(search_id: AggregateId, changed_by: Actor) -> Self {
        HousingSearchEvent::Deactivated(ActivityChangedData {
            search_id,
            changed_by,
            occurred_at: Utc::now(),
        })
    }

    pub fn reactivated(search_id: AggregateId, changed_by: Actor) -> Self {
        HousingSearchEvent::Reactivated(ActivityChangedData {
            search_id,
            changed_by,
            occurred_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_names() {
        let id = AggregateId::new();
        let by = Actor::new("coordinator");
        assert_eq!(
            HousingSearchEvent::housing_search_started(
                id,
                ApplicantId::new(),
                "HS-2024-0001".into(),
                by.clone()
            )
            .event_type(),
            "HousingSearchStarted"
        );
        assert_eq!(
            HousingSearchEvent::stage_changed(
                id,
                StageKind::Submitted,
                StageTransition::HouseHuntingStarted,
                by.clone()
            )
            .event_type(),
            "StageChanged"
        );
        assert_eq!(
            HousingSearchEvent::deactivated(id, by.clone()).event_type(),
            "Deactivated"
        );
        assert_eq!(
            HousingSearchEvent::notes_updated(id, None, by).event_type(),
            "NotesUpdated"
        );
    }

    #[test]
    fn stage_changed_derives_new_stage_from_transition() {
        let event = HousingSearchEvent::stage_changed(
            AggregateId::new(),
            StageKind::HouseHunting,
            StageTransition::Paused {
                reason: "Travel".into(),
            },
            Actor::system(),
        );
        match event {
            HousingSearchEvent::StageChanged(data) => {
                assert_eq!(data.previous_stage, StageKind::HouseHunting);
                assert_eq!(data.new_stage, StageKind::Paused);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn event_serialization_is_tagged() {
        let id = AggregateId::new();
        let event = HousingSearchEvent::stage_changed(
            id,
            StageKind::Submitted,
            StageTransition::Rejected {
                reason: "Incomplete".into(),
            },
            Actor::new("board"),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StageChanged");
        assert_eq!(json["data"]["new_stage"], "Rejected");
        assert_eq!(json["data"]["transition"]["kind"], "Rejected");
        assert_eq!(json["data"]["changed_by"], "board");

        let back: HousingSearchEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.search_id(), id);
        assert_eq!(back.actor().as_str(), "board");
    }
}
