//! Housing search commands.
//!
//! Commands carry already-validated value objects plus the acting user.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};

use crate::command::Command;
use crate::money::Money;

use super::{ApplicantId, HousingPreferences, HousingSearch, MovedInStatus, PropertyId};

macro_rules! housing_search_command {
    ($name:ident, $label:literal) => {
        impl Command for $name {
            type Aggregate = HousingSearch;

            fn aggregate_id(&self) -> AggregateId {
                self.search_id
            }

            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

/// Command to open a search for an applicant.
#[derive(Debug, Clone)]
pub struct OpenHousingSearch {
    pub search_id: AggregateId,
    pub applicant_id: ApplicantId,

    /// Explicit search number; generated when None.
    pub search_number: Option<String>,

    pub created_by: Actor,
}

impl OpenHousingSearch {
    /// Creates the command with a generated search ID and number.
    pub fn for_applicant(applicant_id: ApplicantId, created_by: impl Into<Actor>) -> Self {
        Self {
            search_id: AggregateId::new(),
            applicant_id,
            search_number: None,
            created_by: created_by.into(),
        }
    }

    pub fn with_search_number(mut self, search_number: impl Into<String>) -> Self {
        self.search_number = Some(search_number.into());
        self
    }
}

housing_search_command!(OpenHousingSearch, "open_housing_search");

/// Command to begin looking at properties.
#[derive(Debug, Clone)]
pub struct StartHouseHunting {
    pub search_id: AggregateId,
    pub modified_by: Actor,
}

impl StartHouseHunting {
    pub fn new(search_id: AggregateId, modified_by: impl Into<Actor>) -> Self {
        Self {
            search_id,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(StartHouseHunting, "start_house_hunting");

/// Command to turn a submitted application down.
#[derive(Debug, Clone)]
pub struct RejectSearch {
    pub search_id: AggregateId,
    pub reason: String,
    pub modified_by: Actor,
}

impl RejectSearch {
    pub fn new(
        search_id: AggregateId,
        reason: impl Into<String>,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            reason: reason.into(),
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(RejectSearch, "reject");

/// Command to sign a purchase contract.
#[derive(Debug, Clone)]
pub struct PutUnderContract {
    pub search_id: AggregateId,
    pub property_id: PropertyId,
    pub price: Money,
    pub expected_closing_date: Option<DateTime<Utc>>,
    pub modified_by: Actor,
}

impl PutUnderContract {
    pub fn new(
        search_id: AggregateId,
        property_id: PropertyId,
        price: Money,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            property_id,
            price,
            expected_closing_date: None,
            modified_by: modified_by.into(),
        }
    }

    pub fn closing_on(mut self, expected_closing_date: DateTime<Utc>) -> Self {
        self.expected_closing_date = Some(expected_closing_date);
        self
    }
}

housing_search_command!(PutUnderContract, "put_under_contract");

/// Command to put the search on hold.
#[derive(Debug, Clone)]
pub struct PauseSearch {
    pub search_id: AggregateId,
    pub reason: String,
    pub modified_by: Actor,
}

impl PauseSearch {
    pub fn new(
        search_id: AggregateId,
        reason: impl Into<String>,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            reason: reason.into(),
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(PauseSearch, "pause");

/// Command to resume a paused search.
#[derive(Debug, Clone)]
pub struct ResumeSearch {
    pub search_id: AggregateId,
    pub modified_by: Actor,
}

impl ResumeSearch {
    pub fn new(search_id: AggregateId, modified_by: impl Into<Actor>) -> Self {
        Self {
            search_id,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(ResumeSearch, "resume");

/// Command to record that the current contract collapsed.
#[derive(Debug, Clone)]
pub struct MarkContractFellThrough {
    pub search_id: AggregateId,
    pub reason: Option<String>,
    pub modified_by: Actor,
}

impl MarkContractFellThrough {
    pub fn new(
        search_id: AggregateId,
        reason: Option<String>,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            reason,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(MarkContractFellThrough, "contract_fell_through");

/// Command to record the closing of the current contract.
#[derive(Debug, Clone)]
pub struct RecordClosing {
    pub search_id: AggregateId,
    pub actual_closing_date: DateTime<Utc>,
    pub modified_by: Actor,
}

impl RecordClosing {
    pub fn new(
        search_id: AggregateId,
        actual_closing_date: DateTime<Utc>,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            actual_closing_date,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(RecordClosing, "record_closing");

/// Command to record that the family moved in.
#[derive(Debug, Clone)]
pub struct RecordMovedIn {
    pub search_id: AggregateId,
    pub moved_in_date: DateTime<Utc>,
    pub modified_by: Actor,
}

impl RecordMovedIn {
    pub fn new(
        search_id: AggregateId,
        moved_in_date: DateTime<Utc>,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            moved_in_date,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(RecordMovedIn, "record_moved_in");

/// Command to replace the housing criteria.
#[derive(Debug, Clone)]
pub struct UpdateHousingPreferences {
    pub search_id: AggregateId,
    pub preferences: HousingPreferences,
    pub modified_by: Actor,
}

impl UpdateHousingPreferences {
    pub fn new(
        search_id: AggregateId,
        preferences: HousingPreferences,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            preferences,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(UpdateHousingPreferences, "update_housing_preferences");

/// Command to record occupancy after closing.
#[derive(Debug, Clone)]
pub struct SetMovedInStatus {
    pub search_id: AggregateId,
    pub status: MovedInStatus,
    pub moved_in_date: Option<DateTime<Utc>>,
    pub modified_by: Actor,
}

impl SetMovedInStatus {
    pub fn new(
        search_id: AggregateId,
        status: MovedInStatus,
        moved_in_date: Option<DateTime<Utc>>,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            status,
            moved_in_date,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(SetMovedInStatus, "set_moved_in_status");

/// Command to replace or clear the coordinator notes.
#[derive(Debug, Clone)]
pub struct UpdateNotes {
    pub search_id: AggregateId,
    pub notes: String,
    pub modified_by: Actor,
}

impl UpdateNotes {
    pub fn new(
        search_id: AggregateId,
        notes: impl Into<String>,
        modified_by: impl Into<Actor>,
    ) -> Self {
        Self {
            search_id,
            notes: notes.into(),
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(UpdateNotes, "update_notes");

/// Command to soft-delete a search.
#[derive(Debug, Clone)]
pub struct DeactivateSearch {
    pub search_id: AggregateId,
    pub modified_by: Actor,
}

impl DeactivateSearch {
    pub fn new(search_id: AggregateId, modified_by: impl Into<Actor>) -> Self {
        Self {
            search_id,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(DeactivateSearch, "deactivate");

/// Command to restore a soft-deleted search.
#[derive(Debug, Clone)]
pub struct ReactivateSearch {
    pub search_id: AggregateId,
    pub modified_by: Actor,
}

impl ReactivateSearch {
    pub fn new(search_id: AggregateId, modified_by: impl Into<Actor>) -> Self {
        Self {
            search_id,
            modified_by: modified_by.into(),
        }
    }
}

housing_search_command!(ReactivateSearch, "reactivate");
