//! Housing search service providing a simplified API over the command handler.

use common::AggregateId;
use store::{AggregateStore, StoreError};

use crate::aggregate::Aggregate;
use crate::command::{Command, CommandHandler, CommandResult};
use crate::config::ServiceConfig;
use crate::error::DomainError;

use super::{
    ApplicantId, DeactivateSearch, HousingSearch, HousingSearchError, MarkContractFellThrough,
    OpenHousingSearch, PauseSearch, PutUnderContract, ReactivateSearch, RecordClosing,
    RecordMovedIn, RejectSearch, ResumeSearch, SearchNumberGenerator, SetMovedInStatus,
    StartHouseHunting, UpdateHousingPreferences, UpdateNotes,
};

/// Service for managing housing searches.
///
/// Each method runs one aggregate operation inside the load, mutate, save
/// cycle of the [`CommandHandler`].
pub struct HousingSearchService<S: AggregateStore> {
    handler: CommandHandler<S, HousingSearch>,
    numbers: SearchNumberGenerator,
}

impl<S: AggregateStore> HousingSearchService<S> {
    /// Creates a service with default settings.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        Self {
            handler: CommandHandler::new(store)
                .with_max_conflict_retries(config.max_conflict_retries),
            numbers: SearchNumberGenerator::new(config.search_number_prefix),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, HousingSearch> {
        &self.handler
    }

    /// Feeds every stored search number into the generator.
    ///
    /// Call once at startup so generated numbers continue after existing ones.
    #[tracing::instrument(skip(self))]
    pub async fn restore_search_numbers(&self) -> Result<usize, DomainError> {
        let records = self
            .handler
            .store()
            .list(HousingSearch::aggregate_type())
            .await?;
        for record in &records {
            let search: HousingSearch = record.decode()?;
            self.numbers.observe(search.search_number()).await;
        }
        tracing::info!(count = records.len(), "search numbers restored");
        Ok(records.len())
    }

    /// Opens a search in the `Submitted` stage.
    ///
    /// Fails with `SearchAlreadyExists` if the applicant already has one.
    #[tracing::instrument(skip(self))]
    pub async fn open_search(
        &self,
        cmd: OpenHousingSearch,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        let result = self.open(&cmd).await;
        record_outcome(cmd.name(), &result);
        result
    }

    async fn open(
        &self,
        cmd: &OpenHousingSearch,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        let applicant_key = cmd.applicant_id.to_string();
        if let Some(existing) = self.handler.find_by_key(&applicant_key).await? {
            return Err(DomainError::SearchAlreadyExists {
                applicant_id: applicant_key,
                existing: existing.id().to_string(),
            });
        }

        let search_number = match &cmd.search_number {
            Some(number) => number.clone(),
            None => self.numbers.next().await,
        };
        let search = HousingSearch::create(
            cmd.search_id,
            cmd.applicant_id,
            &search_number,
            cmd.created_by.clone(),
        )?;

        match self.handler.create(search).await {
            Err(DomainError::Store(StoreError::DuplicateKey { key, existing, .. })) => {
                Err(DomainError::SearchAlreadyExists {
                    applicant_id: key,
                    existing: existing.to_string(),
                })
            }
            result => {
                if let Ok(created) = &result {
                    if cmd.search_number.is_some() {
                        self.numbers.observe(created.aggregate.search_number()).await;
                    }
                    tracing::info!(
                        search_id = %created.aggregate.id(),
                        search_number = created.aggregate.search_number(),
                        "housing search opened"
                    );
                }
                result
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_house_hunting(
        &self,
        cmd: StartHouseHunting,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.start_house_hunting(cmd.modified_by.clone())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject(
        &self,
        cmd: RejectSearch,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.reject(&cmd.reason, cmd.modified_by.clone())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn put_under_contract(
        &self,
        cmd: PutUnderContract,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.put_under_contract(
                cmd.property_id,
                cmd.price.clone(),
                cmd.expected_closing_date,
                cmd.modified_by.clone(),
            )
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn pause(
        &self,
        cmd: PauseSearch,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.pause(&cmd.reason, cmd.modified_by.clone())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn resume(
        &self,
        cmd: ResumeSearch,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| search.resume(cmd.modified_by.clone()))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn contract_fell_through(
        &self,
        cmd: MarkContractFellThrough,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.contract_fell_through(cmd.reason.as_deref(), cmd.modified_by.clone())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn record_closing(
        &self,
        cmd: RecordClosing,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.record_closing(cmd.actual_closing_date, cmd.modified_by.clone())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn record_moved_in(
        &self,
        cmd: RecordMovedIn,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.record_moved_in(cmd.moved_in_date, cmd.modified_by.clone())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_housing_preferences(
        &self,
        cmd: UpdateHousingPreferences,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.update_housing_preferences(cmd.preferences.clone(), cmd.modified_by.clone());
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_moved_in_status(
        &self,
        cmd: SetMovedInStatus,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.set_moved_in_status(cmd.status, cmd.moved_in_date, cmd.modified_by.clone());
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_notes(
        &self,
        cmd: UpdateNotes,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.update_notes(&cmd.notes, cmd.modified_by.clone());
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate(
        &self,
        cmd: DeactivateSearch,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.deactivate(cmd.modified_by.clone());
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reactivate(
        &self,
        cmd: ReactivateSearch,
    ) -> Result<CommandResult<HousingSearch>, DomainError> {
        self.dispatch(&cmd, |search| {
            search.reactivate(cmd.modified_by.clone());
            Ok(())
        })
        .await
    }

    /// Loads a search by ID.
    ///
    /// Returns None if the search doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_search(
        &self,
        search_id: AggregateId,
    ) -> Result<Option<HousingSearch>, DomainError> {
        self.handler.load(search_id).await
    }

    /// Loads the search belonging to an applicant.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<HousingSearch>, DomainError> {
        self.handler.find_by_key(&applicant_id.to_string()).await
    }

    async fn dispatch<C, F>(
        &self,
        cmd: &C,
        operation: F,
    ) -> Result<CommandResult<HousingSearch>, DomainError>
    where
        C: Command<Aggregate = HousingSearch>,
        F: Fn(&mut HousingSearch) -> Result<(), HousingSearchError>,
    {
        let result = self.handler.execute(cmd.aggregate_id(), operation).await;
        record_outcome(cmd.name(), &result);
        result
    }
}

fn record_outcome(command: &'static str, result: &Result<CommandResult<HousingSearch>, DomainError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(DomainError::HousingSearch(_)) | Err(DomainError::SearchAlreadyExists { .. }) => {
            "rejected"
        }
        Err(err) if err.is_conflict() => "conflict",
        Err(_) => "error",
    };
    metrics::counter!("housing_search_commands_total", "command" => command, "outcome" => outcome)
        .increment(1);
    if let Err(err) = result {
        tracing::debug!(command, error = %err, "command failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::housing_search::{ErrorKind, HousingPreferences, MovedInStatus, PropertyId, StageKind};
    use crate::money::Money;
    use chrono::{Datelike, Utc};
    use store::InMemoryAggregateStore;

    async fn opened(
        service: &HousingSearchService<InMemoryAggregateStore>,
    ) -> CommandResult<HousingSearch> {
        service
            .open_search(OpenHousingSearch::for_applicant(
                ApplicantId::new(),
                "intake",
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_search_generates_number() {
        let service = HousingSearchService::new(InMemoryAggregateStore::new());

        let result = opened(&service).await;

        assert_eq!(result.aggregate.stage_kind(), StageKind::Submitted);
        assert!(result.aggregate.search_number().starts_with("HS-"));
        assert!(result.aggregate.search_number().ends_with("-0001"));
        assert_eq!(result.events.len(), 1);
    }

    #[tokio::test]
    async fn test_open_search_uses_explicit_number() {
        let service = HousingSearchService::new(InMemoryAggregateStore::new());
        let cmd = OpenHousingSearch::for_applicant(ApplicantId::new(), "intake")
            .with_search_number("HS-2019-0300");

        let result = service.open_search(cmd).await.unwrap();
        assert_eq!(result.aggregate.search_number(), "HS-2019-0300");
    }

    #[tokio::test]
    async fn test_generated_number_follows_explicit_one() {
        let service = HousingSearchService::new(InMemoryAggregateStore::new());
        let year = Utc::now().year();
        let explicit = OpenHousingSearch::for_applicant(ApplicantId::new(), "intake")
            .with_search_number(format!("HS-{year}-0001"));
        service.open_search(explicit).await.unwrap();

        let generated = opened(&service).await;
        assert_eq!(
            generated.aggregate.search_number(),
            format!("HS-{year}-0002")
        );
    }

    #[tokio::test]
    async fn test_one_search_per_applicant() {
        let service = HousingSearchService::new(InMemoryAggregateStore::new());
        let applicant = ApplicantId::new();
        service
            .open_search(OpenHousingSearch::for_applicant(applicant, "intake"))
            .await
            .unwrap();

        let result = service
            .open_search(OpenHousingSearch::for_applicant(applicant, "intake"))
            .await;
        assert!(matches!(result, Err(DomainError::SearchAlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_invalid_transition_is_reported() {
        let service = HousingSearchService::new(InMemoryAggregateStore::new());
        let id = opened(&service).await.aggregate.id();

        let err = service
            .resume(ResumeSearch::new(id, "alice"))
            .await
            .unwrap_err();
        assert_eq!(err.rule_kind(), Some(ErrorKind::InvalidTransition));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let store = InMemoryAggregateStore::new();
        let service = HousingSearchService::new(store.clone());
        let id = opened(&service).await.aggregate.id();

        service
            .start_house_hunting(StartHouseHunting::new(id, "alice"))
            .await
            .unwrap();
        service
            .update_housing_preferences(UpdateHousingPreferences::new(
                id,
                HousingPreferences::builder().min_bedrooms(3).build().unwrap(),
                "alice",
            ))
            .await
            .unwrap();
        service
            .put_under_contract(PutUnderContract::new(
                id,
                PropertyId::new(),
                Money::new(450_000.0).unwrap(),
                "alice",
            ))
            .await
            .unwrap();
        service
            .record_closing(RecordClosing::new(id, Utc::now(), "alice"))
            .await
            .unwrap();
        service
            .set_moved_in_status(SetMovedInStatus::new(
                id,
                MovedInStatus::Renovating,
                None,
                "alice",
            ))
            .await
            .unwrap();
        let result = service
            .record_moved_in(RecordMovedIn::new(id, Utc::now(), "alice"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.stage_kind(), StageKind::MovedIn);
        assert_eq!(result.new_version.as_u64(), 7);
        assert_eq!(store.event_count().await, 7);

        let loaded = service.get_search(id).await.unwrap().unwrap();
        assert_eq!(loaded.moved_in_status(), Some(MovedInStatus::Renovating));
        assert_eq!(loaded.preferences().min_bedrooms(), Some(3));
    }

    #[tokio::test]
    async fn test_idempotent_deactivate_saves_once() {
        let store = InMemoryAggregateStore::new();
        let service = HousingSearchService::new(store.clone());
        let id = opened(&service).await.aggregate.id();

        service
            .deactivate(DeactivateSearch::new(id, "alice"))
            .await
            .unwrap();
        let second = service
            .deactivate(DeactivateSearch::new(id, "alice"))
            .await
            .unwrap();

        assert!(second.events.is_empty());
        assert_eq!(second.new_version.as_u64(), 2);
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn test_find_by_applicant_and_restore_numbers() {
        let store = InMemoryAggregateStore::new();
        let service = HousingSearchService::new(store.clone());
        let applicant = ApplicantId::new();
        let year = 2031;
        service
            .open_search(
                OpenHousingSearch::for_applicant(applicant, "intake")
                    .with_search_number(format!("HS-{year}-0012")),
            )
            .await
            .unwrap();

        let found = service.find_by_applicant(applicant).await.unwrap().unwrap();
        assert_eq!(found.search_number(), "HS-2031-0012");

        let restarted = HousingSearchService::new(store);
        assert_eq!(restarted.restore_search_numbers().await.unwrap(), 1);
        assert_eq!(
            restarted.numbers.next_for_year(year).await,
            "HS-2031-0013"
        );
    }
}
