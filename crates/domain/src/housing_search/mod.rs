//! Housing search aggregate and related types.

mod aggregate;
mod commands;
mod contract;
mod events;
mod preferences;
mod search_number;
mod service;
mod stage;
mod value_objects;

pub use aggregate::HousingSearch;
pub use commands::*;
pub use contract::{Contract, FailedContractAttempt, FailedContractHistory};
pub use events::{
    ActivityChangedData, HousingPreferencesUpdatedData, HousingSearchEvent,
    HousingSearchStartedData, MovedInStatusUpdatedData, NotesUpdatedData, StageChangedData,
    StageTransition,
};
pub use preferences::{HousingPreferences, HousingPreferencesBuilder, ShulProximityPreference};
pub use search_number::SearchNumberGenerator;
pub use service::HousingSearchService;
pub use stage::{RequiredStages, Stage, StageKind};
pub use value_objects::{ApplicantId, MoveTimeline, MovedInStatus, PropertyId, ShulId};

use thiserror::Error;

/// Broad category of a [`HousingSearchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required value was missing or malformed.
    InvalidArgument,

    /// The operation is not allowed from the current stage.
    InvalidTransition,
}

/// Errors that can occur during housing search operations.
///
/// A failed operation never changes the search.
#[derive(Debug, Error)]
pub enum HousingSearchError {
    #[error("Search ID is required")]
    SearchIdRequired,

    #[error("Applicant ID is required")]
    ApplicantIdRequired,

    #[error("Search number is required")]
    SearchNumberRequired,

    #[error("Property ID is required")]
    PropertyIdRequired,

    /// Rejecting or pausing needs a reason.
    #[error("A reason is required to {action}")]
    ReasonRequired { action: &'static str },

    #[error("Invalid housing preference: {0}")]
    InvalidPreference(String),

    /// The operation is not legal from the current stage.
    #[error("Cannot {action} unless {required} (current stage: {current})")]
    InvalidTransition {
        action: &'static str,
        required: RequiredStages,
        current: StageKind,
    },

    /// Replayed history did not begin with `HousingSearchStarted`.
    #[error("Event history must start with HousingSearchStarted")]
    HistoryWithoutStart,
}

impl HousingSearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HousingSearchError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            _ => ErrorKind::InvalidArgument,
        }
    }
}
