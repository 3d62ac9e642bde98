//! Application configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use domain::ServiceConfig;
use domain::config::DEFAULT_SEARCH_NUMBER_PREFIX;
use projections::DEFAULT_BATCH_SIZE;

use crate::error::RelayError;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Relay configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `SEARCH_NUMBER_PREFIX`: prefix of generated search numbers (default: `"HS"`)
/// - `RELAY_INTERVAL_MS`: delay between outbox passes (default: `1000`)
/// - `RELAY_BATCH_SIZE`: events fetched per pass (default: `100`)
/// - `MAX_CONFLICT_RETRIES`: command retries after a version conflict (default: `3`)
/// - `METRICS_ADDR`: Prometheus listen address; metrics are not exported when unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub search_number_prefix: String,
    pub relay_interval: Duration,
    pub batch_size: usize,
    pub max_conflict_retries: u32,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    ///
    /// Unset variables take their default; set but unparseable ones are an
    /// error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let defaults = Self::default();

        let log_format = match lookup("LOG_FORMAT") {
            None => defaults.log_format,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => {
                    return Err(RelayError::InvalidConfig {
                        name: "LOG_FORMAT",
                        value,
                    });
                }
            },
        };

        Ok(Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            search_number_prefix: lookup("SEARCH_NUMBER_PREFIX")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.search_number_prefix),
            relay_interval: parse(&lookup, "RELAY_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.relay_interval),
            batch_size: parse(&lookup, "RELAY_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            max_conflict_retries: parse(&lookup, "MAX_CONFLICT_RETRIES")?
                .unwrap_or(defaults.max_conflict_retries),
            metrics_addr: parse(&lookup, "METRICS_ADDR")?,
        })
    }

    /// Settings handed to the housing search service.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            search_number_prefix: self.search_number_prefix.clone(),
            max_conflict_retries: self.max_conflict_retries,
        }
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, RelayError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| RelayError::InvalidConfig { name, value })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            search_number_prefix: DEFAULT_SEARCH_NUMBER_PREFIX.to_string(),
            relay_interval: Duration::from_millis(1000),
            batch_size: DEFAULT_BATCH_SIZE,
            max_conflict_retries: service.max_conflict_retries,
            metrics_addr: None,
        }
    }
}
