//! Settings the housing search service runs with.

use crate::command::DEFAULT_MAX_CONFLICT_RETRIES;

/// Prefix used for search numbers when none is configured.
pub const DEFAULT_SEARCH_NUMBER_PREFIX: &str = "HS";

/// Service-level settings, filled in by the composition root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Prefix of generated search numbers, e.g. `HS` in `HS-2024-0001`.
    pub search_number_prefix: String,

    /// How often a command is re-run after losing a version race.
    pub max_conflict_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            search_number_prefix: DEFAULT_SEARCH_NUMBER_PREFIX.to_string(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}
