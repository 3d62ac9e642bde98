//! Tracing and metrics setup for the relay binary.

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};
use crate::error::RelayError;

/// Installs the global tracing subscriber.
///
/// `config.log_level` takes `RUST_LOG` syntax; a directive that does not
/// parse is a configuration error.
pub fn init_tracing(config: &Config) -> Result<(), RelayError> {
    let filter = log_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    result.map_err(|e| RelayError::Telemetry(e.to_string()))
}

fn log_filter(config: &Config) -> Result<EnvFilter, RelayError> {
    EnvFilter::try_new(&config.log_level).map_err(|_| RelayError::InvalidConfig {
        name: "RUST_LOG",
        value: config.log_level.clone(),
    })
}

/// Installs the Prometheus recorder when a listen address is configured.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(config: &Config) -> Result<(), RelayError> {
    let Some(addr) = config.metrics_addr else {
        tracing::debug!("metrics export disabled");
        return Ok(());
    };

    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "serving Prometheus metrics");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filters_parse() {
        for level in ["info", "debug,store=trace", "relay=warn"] {
            let config = Config {
                log_level: level.to_string(),
                ..Config::default()
            };
            assert!(log_filter(&config).is_ok(), "{level}");
        }
    }

    #[test]
    fn test_unparseable_filter_fails_startup() {
        let config = Config {
            log_level: "relay=loudest".to_string(),
            ..Config::default()
        };

        let err = init_tracing(&config).unwrap_err();
        assert!(matches!(
            err,
            RelayError::InvalidConfig {
                name: "RUST_LOG",
                ref value,
            } if value == "relay=loudest"
        ));
    }
}
