//! Domain layer for the housing search workspace.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for state-persisted aggregates
//! - Command trait and CommandHandler for the load, mutate, save cycle
//! - Money and the housing search value objects
//! - The HousingSearch aggregate with its stage machine

pub mod aggregate;
pub mod command;
pub mod config;
pub mod error;
pub mod housing_search;
pub mod money;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult, DEFAULT_MAX_CONFLICT_RETRIES};
pub use config::ServiceConfig;
pub use error::DomainError;
pub use housing_search::{
    ApplicantId, Contract, DeactivateSearch, ErrorKind, FailedContractAttempt,
    FailedContractHistory, HousingPreferences, HousingPreferencesBuilder, HousingSearch,
    HousingSearchError, HousingSearchEvent, HousingSearchService, MarkContractFellThrough,
    MoveTimeline, MovedInStatus, OpenHousingSearch, PauseSearch, PropertyId, PutUnderContract,
    ReactivateSearch, RecordClosing, RecordMovedIn, RejectSearch, RequiredStages, ResumeSearch,
    SearchNumberGenerator, SetMovedInStatus, ShulId, ShulProximityPreference, Stage, StageKind,
    StageTransition, StartHouseHunting, UpdateHousingPreferences, UpdateNotes,
};
pub use money::{Money, MoneyError};
