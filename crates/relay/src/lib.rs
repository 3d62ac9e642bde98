//! Composition root for the housing search service.
//!
//! Wires the aggregate store, the command service and the outbox relay with
//! its read models, feeds commands in from a line-delimited JSON intake, and
//! provides the tracing/metrics setup for the binary.

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
pub mod worker;

use std::sync::Arc;

use domain::HousingSearchService;
use projections::{ContractHistoryView, OutboxRelay, Projection, SearchPipelineView};
use store::AggregateStore;

pub use config::{Config, LogFormat};
pub use error::RelayError;
pub use intake::{IntakeCommand, IntakeSummary, run_intake};
pub use worker::RelayWorker;

/// Everything the running process holds on to.
pub struct App<S: AggregateStore> {
    pub service: Arc<HousingSearchService<S>>,
    pub worker: RelayWorker<S>,
    pub pipeline: SearchPipelineView,
    pub contracts: ContractHistoryView,
}

/// Builds the service and relay over `store`.
///
/// Search numbers already in the store are fed to the generator so new ones
/// continue the yearly sequence.
pub async fn build_app<S: AggregateStore + Clone + 'static>(
    config: &Config,
    store: S,
) -> Result<App<S>, RelayError> {
    let service = HousingSearchService::with_config(store.clone(), config.service_config());
    let restored = service.restore_search_numbers().await?;
    tracing::info!(restored, "search numbers restored");

    let pipeline = SearchPipelineView::new();
    let contracts = ContractHistoryView::new();

    let mut relay = OutboxRelay::new(store).with_batch_size(config.batch_size);
    relay.register(Box::new(pipeline.clone()) as Box<dyn Projection>);
    relay.register(Box::new(contracts.clone()) as Box<dyn Projection>);

    Ok(App {
        service: Arc::new(service),
        worker: RelayWorker::new(relay, config.relay_interval),
        pipeline,
        contracts,
    })
}
