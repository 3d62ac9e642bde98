//! Newline-delimited JSON command feed for the running service.
//!
//! Each non-blank line is one command, tagged by `command`:
//!
//! ```text
//! {"command":"open","applicant_id":"…","by":"intake"}
//! {"command":"put_under_contract","search_id":"…","property_id":"…","price":{"cents":45000000,"currency":"USD"},"by":"coordinator"}
//! ```
//!
//! Lines starting with `#` are skipped. A malformed or refused command is
//! logged and counted; it does not stop the feed.

use chrono::{DateTime, Utc};
use common::{Actor, AggregateId};
use domain::{
    Aggregate, ApplicantId, CommandResult, DeactivateSearch, DomainError, HousingPreferences,
    HousingSearch, HousingSearchService, MarkContractFellThrough, Money, MoveTimeline,
    MovedInStatus, OpenHousingSearch, PauseSearch, PropertyId, PutUnderContract,
    ReactivateSearch, RecordClosing, RecordMovedIn, RejectSearch, ResumeSearch, SetMovedInStatus,
    ShulProximityPreference, StartHouseHunting, UpdateHousingPreferences, UpdateNotes,
};
use serde::Deserialize;
use store::AggregateStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::RelayError;

/// Criteria as they arrive on the wire; validated through the builder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreferencesInput {
    pub budget: Option<Money>,
    pub min_bedrooms: Option<u32>,
    pub min_bathrooms: Option<f64>,
    pub required_features: Vec<String>,
    pub max_walking_distance_miles: Option<f64>,
    pub move_timeline: Option<MoveTimeline>,
}

impl PreferencesInput {
    fn build(self) -> Result<HousingPreferences, DomainError> {
        let mut builder = HousingPreferences::builder().required_features(self.required_features);
        if let Some(budget) = self.budget {
            builder = builder.budget(budget);
        }
        if let Some(bedrooms) = self.min_bedrooms {
            builder = builder.min_bedrooms(bedrooms);
        }
        if let Some(bathrooms) = self.min_bathrooms {
            builder = builder.min_bathrooms(bathrooms);
        }
        if let Some(miles) = self.max_walking_distance_miles {
            builder = builder.shul_proximity(ShulProximityPreference::with_max_distance(miles)?);
        }
        if let Some(timeline) = self.move_timeline {
            builder = builder.move_timeline(timeline);
        }
        Ok(builder.build()?)
    }
}

/// One line of the feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IntakeCommand {
    Open {
        applicant_id: ApplicantId,
        search_id: Option<AggregateId>,
        search_number: Option<String>,
        by: Actor,
    },
    StartHouseHunting {
        search_id: AggregateId,
        by: Actor,
    },
    Reject {
        search_id: AggregateId,
        reason: String,
        by: Actor,
    },
    PutUnderContract {
        search_id: AggregateId,
        property_id: PropertyId,
        price: Money,
        expected_closing_date: Option<DateTime<Utc>>,
        by: Actor,
    },
    Pause {
        search_id: AggregateId,
        reason: String,
        by: Actor,
    },
    Resume {
        search_id: AggregateId,
        by: Actor,
    },
    ContractFellThrough {
        search_id: AggregateId,
        reason: Option<String>,
        by: Actor,
    },
    RecordClosing {
        search_id: AggregateId,
        actual_closing_date: DateTime<Utc>,
        by: Actor,
    },
    RecordMovedIn {
        search_id: AggregateId,
        moved_in_date: DateTime<Utc>,
        by: Actor,
    },
    UpdatePreferences {
        search_id: AggregateId,
        preferences: PreferencesInput,
        by: Actor,
    },
    SetMovedInStatus {
        search_id: AggregateId,
        status: MovedInStatus,
        moved_in_date: Option<DateTime<Utc>>,
        by: Actor,
    },
    UpdateNotes {
        search_id: AggregateId,
        notes: String,
        by: Actor,
    },
    Deactivate {
        search_id: AggregateId,
        by: Actor,
    },
    Reactivate {
        search_id: AggregateId,
        by: Actor,
    },
}

impl IntakeCommand {
    /// Runs the command against the service.
    pub async fn dispatch<S: AggregateStore>(
        self,
        service: &HousingSearchService<S>,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        match self {
            IntakeCommand::Open {
                applicant_id,
                search_id,
                search_number,
                by,
            } => {
                let mut cmd = OpenHousingSearch::for_applicant(applicant_id, by);
                if let Some(id) = search_id {
                    cmd.search_id = id;
                }
                if let Some(number) = search_number {
                    cmd = cmd.with_search_number(number);
                }
                service.open_search(cmd).await
            }
            IntakeCommand::StartHouseHunting { search_id, by } => {
                service
                    .start_house_hunting(StartHouseHunting::new(search_id, by))
                    .await
            }
            IntakeCommand::Reject {
                search_id,
                reason,
                by,
            } => service.reject(RejectSearch::new(search_id, reason, by)).await,
            IntakeCommand::PutUnderContract {
                search_id,
                property_id,
                price,
                expected_closing_date,
                by,
            } => {
                let mut cmd = PutUnderContract::new(search_id, property_id, price, by);
                if let Some(date) = expected_closing_date {
                    cmd = cmd.closing_on(date);
                }
                service.put_under_contract(cmd).await
            }
            IntakeCommand::Pause {
                search_id,
                reason,
                by,
            } => service.pause(PauseSearch::new(search_id, reason, by)).await,
            IntakeCommand::Resume { search_id, by } => {
                service.resume(ResumeSearch::new(search_id, by)).await
            }
            IntakeCommand::ContractFellThrough {
                search_id,
                reason,
                by,
            } => {
                service
                    .contract_fell_through(MarkContractFellThrough::new(search_id, reason, by))
                    .await
            }
            IntakeCommand::RecordClosing {
                search_id,
                actual_closing_date,
                by,
            } => {
                service
                    .record_closing(RecordClosing::new(search_id, actual_closing_date, by))
                    .await
            }
            IntakeCommand::RecordMovedIn {
                search_id,
                moved_in_date,
                by,
            } => {
                service
                    .record_moved_in(RecordMovedIn::new(search_id, moved_in_date, by))
                    .await
            }
            IntakeCommand::UpdatePreferences {
                search_id,
                preferences,
                by,
            } => {
                let preferences = preferences.build()?;
                service
                    .update_housing_preferences(UpdateHousingPreferences::new(
                        search_id,
                        preferences,
                        by,
                    ))
                    .await
            }
            IntakeCommand::SetMovedInStatus {
                search_id,
                status,
                moved_in_date,
                by,
            } => {
                service
                    .set_moved_in_status(SetMovedInStatus::new(
                        search_id,
                        status,
                        moved_in_date,
                        by,
                    ))
                    .await
            }
            IntakeCommand::UpdateNotes {
                search_id,
                notes,
                by,
            } => {
                service
                    .update_notes(UpdateNotes::new(search_id, notes, by))
                    .await
            }
            IntakeCommand::Deactivate { search_id, by } => {
                service.deactivate(DeactivateSearch::new(search_id, by)).await
            }
            IntakeCommand::Reactivate { search_id, by } => {
                service.reactivate(ReactivateSearch::new(search_id, by)).await
            }
        }
    }
}

/// Counts of what a feed run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeSummary {
    pub applied: usize,
    pub malformed: usize,
    pub refused: usize,
}

/// Reads commands from `reader` until end of input.
///
/// Only an I/O failure on the reader ends the run with an error.
pub async fn run_intake<R, S>(
    reader: R,
    service: &HousingSearchService<S>,
) -> Result<IntakeSummary, RelayError>
where
    R: AsyncBufRead + Unpin,
    S: AggregateStore,
{
    let mut lines = reader.lines();
    let mut summary = IntakeSummary::default();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command: IntakeCommand = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(error) => {
                tracing::warn!(line = line_number, %error, "malformed intake command");
                summary.malformed += 1;
                continue;
            }
        };

        match command.dispatch(service).await {
            Ok(result) => {
                tracing::debug!(
                    line = line_number,
                    search_id = %result.aggregate.id(),
                    version = %result.new_version,
                    "intake command applied"
                );
                summary.applied += 1;
            }
            Err(error) => {
                tracing::warn!(line = line_number, %error, "intake command refused");
                summary.refused += 1;
            }
        }
    }

    tracing::info!(
        applied = summary.applied,
        malformed = summary.malformed,
        refused = summary.refused,
        "intake feed closed"
    );
    Ok(summary)
}
