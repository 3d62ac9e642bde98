//! Relay entry point.
//!
//! Reads housing search commands as JSON lines on stdin and relays the
//! resulting events into the read models until SIGINT or SIGTERM.

use relay::{App, Config, RelayError};
use store::InMemoryAggregateStore;
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::oneshot;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env()?;
    relay::telemetry::init_tracing(&config)?;

    // 2. Install Prometheus metrics recorder
    relay::telemetry::init_metrics(&config)?;

    // 3. Create store, service and relay
    let store = InMemoryAggregateStore::new();
    let App {
        service,
        worker,
        pipeline,
        contracts,
    } = relay::build_app(&config, store).await?;

    // 4. Run the relay in the background
    tracing::info!(
        prefix = %config.search_number_prefix,
        interval_ms = config.relay_interval.as_millis() as u64,
        "starting outbox relay"
    );
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let worker = tokio::spawn(worker.run_until(async {
        let _ = stop_rx.await;
    }));

    // 5. Feed commands from stdin until shutdown
    let intake = tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(error) = relay::run_intake(stdin, &*service).await {
            tracing::error!(%error, "intake feed failed");
        }
    });

    shutdown_signal().await;
    intake.abort();
    let _ = stop_tx.send(());
    let dispatched = worker.await?;

    for (stage, count) in pipeline.count_by_stage().await {
        tracing::info!(stage = stage.as_str(), count, "active searches");
    }
    tracing::info!(
        dispatched,
        failed_contracts = contracts.total_failures().await,
        closings = contracts.total_closings().await,
        "relay shut down gracefully"
    );
    Ok(())
}
