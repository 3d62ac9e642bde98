//! Errors surfaced by the relay binary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid configuration: {name}={value}")]
    InvalidConfig { name: &'static str, value: String },

    #[error("failed to initialise tracing: {0}")]
    Telemetry(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to read intake feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("relay worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Domain(#[from] domain::DomainError),

    #[error(transparent)]
    Projection(#[from] projections::ProjectionError),
}
