//! Integration tests for the HousingSearch aggregate.
//!
//! These tests drive the aggregate through the service and store, checking
//! persisted state, the outbox contents and concurrency handling.

use chrono::{Duration, Utc};
use common::AggregateId;
use domain::{
    Aggregate, ApplicantId, DomainError, DomainEvent, ErrorKind, HousingSearch,
    HousingSearchEvent, HousingSearchService, MarkContractFellThrough, Money, OpenHousingSearch,
    PauseSearch, PropertyId, PutUnderContract, RecordClosing, RejectSearch, ResumeSearch,
    ServiceConfig, StageKind, StageTransition, StartHouseHunting,
};
use store::{AggregateRecord, AggregateStore, InMemoryAggregateStore, SaveOptions, Version};

fn create_service() -> (HousingSearchService<InMemoryAggregateStore>, InMemoryAggregateStore) {
    let store = InMemoryAggregateStore::new();
    (HousingSearchService::new(store.clone()), store)
}

async fn open(service: &HousingSearchService<InMemoryAggregateStore>, number: &str) -> AggregateId {
    service
        .open_search(
            OpenHousingSearch::for_applicant(ApplicantId::new(), "intake")
                .with_search_number(number),
        )
        .await
        .unwrap()
        .aggregate
        .id()
}

async fn contract(
    service: &HousingSearchService<InMemoryAggregateStore>,
    id: AggregateId,
    property: PropertyId,
    amount: f64,
) {
    service
        .put_under_contract(PutUnderContract::new(
            id,
            property,
            Money::new(amount).unwrap(),
            "coordinator",
        ))
        .await
        .unwrap();
}

mod scenarios {
    use super::*;

    #[test]
    fn create_queues_one_started_event() {
        let applicant = ApplicantId::new();
        let mut search =
            HousingSearch::create(AggregateId::new(), applicant, "HS-2026-0001", "intake").unwrap();

        assert_eq!(search.stage_kind(), StageKind::Submitted);
        let events = search.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            HousingSearchEvent::HousingSearchStarted(data) => {
                assert_eq!(data.applicant_id, applicant);
                assert_eq!(data.search_number, "HS-2026-0001");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn contract_falls_through_back_to_hunting() {
        let (service, _) = create_service();
        let id = open(&service, "HS-2026-0001").await;
        let p1 = PropertyId::new();

        let result = service
            .start_house_hunting(StartHouseHunting::new(id, "coordinator"))
            .await
            .unwrap();
        assert_eq!(result.aggregate.stage_kind(), StageKind::HouseHunting);

        contract(&service, id, p1, 450_000.0).await;
        let search = service.get_search(id).await.unwrap().unwrap();
        assert_eq!(search.stage_kind(), StageKind::UnderContract);
        assert_eq!(search.contract_property_id(), Some(p1));

        let result = service
            .contract_fell_through(MarkContractFellThrough::new(
                id,
                Some("Financing fell through".to_string()),
                "coordinator",
            ))
            .await
            .unwrap();

        let search = result.aggregate;
        assert_eq!(search.stage_kind(), StageKind::HouseHunting);
        assert_eq!(search.failed_contracts().len(), 1);
        assert_eq!(search.contract_property_id(), None);
    }

    #[tokio::test]
    async fn consecutive_failures_are_kept_in_order() {
        let (service, _) = create_service();
        let id = open(&service, "HS-2026-0002").await;
        let (p1, p2) = (PropertyId::new(), PropertyId::new());
        service
            .start_house_hunting(StartHouseHunting::new(id, "coordinator"))
            .await
            .unwrap();

        contract(&service, id, p1, 450_000.0).await;
        service
            .contract_fell_through(MarkContractFellThrough::new(
                id,
                Some("Inspection".to_string()),
                "coordinator",
            ))
            .await
            .unwrap();
        contract(&service, id, p2, 430_000.0).await;
        let result = service
            .contract_fell_through(MarkContractFellThrough::new(
                id,
                Some("Appraisal low".to_string()),
                "coordinator",
            ))
            .await
            .unwrap();

        let history: Vec<_> = result.aggregate.failed_contracts().iter().cloned().collect();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].property_id(), p1);
        assert_eq!(history[0].reason(), Some("Inspection"));
        assert_eq!(history[1].property_id(), p2);
        assert_eq!(history[1].reason(), Some("Appraisal low"));
        assert_eq!(history[1].contract_price(), &Money::new(430_000.0).unwrap());
    }

    #[tokio::test]
    async fn closing_cannot_skip_stages() {
        let (service, store) = create_service();
        let id = open(&service, "HS-2026-0003").await;

        let err = service
            .record_closing(RecordClosing::new(id, Utc::now(), "coordinator"))
            .await
            .unwrap_err();

        assert_eq!(err.rule_kind(), Some(ErrorKind::InvalidTransition));
        assert!(err.to_string().contains("unless UnderContract"));
        let search = service.get_search(id).await.unwrap().unwrap();
        assert_eq!(search.stage_kind(), StageKind::Submitted);
        assert_eq!(store.event_count().await, 1);
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn outbox_preserves_event_order_and_actor() {
        let (service, store) = create_service();
        let id = open(&service, "HS-2026-0010").await;
        service
            .start_house_hunting(StartHouseHunting::new(id, "alice"))
            .await
            .unwrap();
        service
            .pause(PauseSearch::new(id, "Family emergency", "bob"))
            .await
            .unwrap();
        service
            .resume(ResumeSearch::new(id, "carol"))
            .await
            .unwrap();

        let envelopes = store.events_for_aggregate(id).await.unwrap();
        let types: Vec<_> = envelopes.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["HousingSearchStarted", "StageChanged", "StageChanged", "StageChanged"]
        );
        let actors: Vec<_> = envelopes.iter().filter_map(|e| e.actor()).collect();
        assert_eq!(actors, vec!["intake", "alice", "bob", "carol"]);
        assert!(envelopes.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert_eq!(envelopes[3].version, Version::new(4));

        let paused: HousingSearchEvent = envelopes[2].decode().unwrap();
        match paused {
            HousingSearchEvent::StageChanged(data) => {
                assert_eq!(data.previous_stage, StageKind::HouseHunting);
                assert_eq!(
                    data.transition,
                    StageTransition::Paused {
                        reason: "Family emergency".to_string()
                    }
                );
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn outbox_replays_into_identical_state() {
        let (service, store) = create_service();
        let id = open(&service, "HS-2026-0011").await;
        service
            .start_house_hunting(StartHouseHunting::new(id, "alice"))
            .await
            .unwrap();
        contract(&service, id, PropertyId::new(), 300_000.0).await;
        service
            .record_closing(RecordClosing::new(
                id,
                Utc::now() + Duration::days(30),
                "alice",
            ))
            .await
            .unwrap();

        let events = store
            .events_for_aggregate(id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.decode::<HousingSearchEvent>())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let replayed = HousingSearch::from_history(events).unwrap();
        let stored = service.get_search(id).await.unwrap().unwrap();

        assert_eq!(replayed.stage(), stored.stage());
        assert_eq!(replayed.actual_closing_date(), stored.actual_closing_date());
        assert_eq!(replayed.modified_by(), stored.modified_by());
    }

    #[tokio::test]
    async fn failed_command_leaves_store_untouched() {
        let (service, store) = create_service();
        let id = open(&service, "HS-2026-0012").await;

        let err = service
            .reject(RejectSearch::new(id, "   ", "board"))
            .await
            .unwrap_err();

        assert_eq!(err.rule_kind(), Some(ErrorKind::InvalidArgument));
        let record = store.load(id).await.unwrap().unwrap();
        assert_eq!(record.version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn rejected_search_is_terminal() {
        let (service, _) = create_service();
        let id = open(&service, "HS-2026-0013").await;
        let result = service
            .reject(RejectSearch::new(id, "Incomplete application", "board"))
            .await
            .unwrap();
        assert_eq!(
            result.aggregate.notes(),
            Some("Rejected: Incomplete application")
        );

        let err = service
            .start_house_hunting(StartHouseHunting::new(id, "board"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::HousingSearch(_)));
    }

    #[tokio::test]
    async fn unknown_search_is_not_found() {
        let (service, _) = create_service();
        let err = service
            .start_house_hunting(StartHouseHunting::new(AggregateId::new(), "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AggregateNotFound { .. }));
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn stale_writer_is_rejected_by_the_store() {
        let (service, store) = create_service();
        let id = open(&service, "HS-2026-0020").await;

        // Two writers load the same version.
        let handler = service.handler();
        let mut first = handler.load_existing(id).await.unwrap();
        let mut second = handler.load_existing(id).await.unwrap();

        first.start_house_hunting("alice").unwrap();
        second.reject("Duplicate application", "bob").unwrap();

        let record = AggregateRecord::from_state(id, "HousingSearch", &first).unwrap();
        store
            .save(
                record,
                vec![],
                SaveOptions::expect_version(first.version()),
            )
            .await
            .unwrap();

        let record = AggregateRecord::from_state(id, "HousingSearch", &second).unwrap();
        let result = store
            .save(
                record,
                vec![],
                SaveOptions::expect_version(second.version()),
            )
            .await;
        assert!(matches!(result, Err(err) if err.is_conflict()));
    }

    #[tokio::test]
    async fn concurrent_commands_are_serialized_by_retry() {
        let store = InMemoryAggregateStore::new();
        let service = std::sync::Arc::new(HousingSearchService::with_config(
            store.clone(),
            ServiceConfig {
                max_conflict_retries: 10,
                ..ServiceConfig::default()
            },
        ));
        let id = open(&service, "HS-2026-0021").await;

        let mut tasks = Vec::new();
        for i in 0..5 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .update_notes(domain::UpdateNotes::new(id, format!("note {i}"), "alice"))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let record = store.load(id).await.unwrap().unwrap();
        assert_eq!(record.version, Version::new(6));
        let notes_events = store
            .events_for_aggregate(id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.event_type == "NotesUpdated")
            .count();
        assert_eq!(notes_events, 5);
    }

    #[test]
    fn event_metadata_is_exposed() {
        let mut search =
            HousingSearch::create(AggregateId::new(), ApplicantId::new(), "HS-1", "intake").unwrap();
        search.start_house_hunting("alice").unwrap();
        let events = search.take_events();
        assert_eq!(events[1].actor().as_str(), "alice");
        assert!(events[0].occurred_at() <= events[1].occurred_at());
    }
}
