//! Human-readable search numbers.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use tokio::sync::Mutex;

/// Hands out search numbers of the form `{PREFIX}-{YEAR}-{NNNN}`.
///
/// The sequence restarts every year and is padded to four digits; it keeps
/// counting past 9999. Numbers already in use can be fed in with
/// [`SearchNumberGenerator::observe`] so a restarted process does not reuse
/// them.
#[derive(Debug)]
pub struct SearchNumberGenerator {
    prefix: String,
    last_by_year: Mutex<HashMap<i32, u32>>,
}

impl SearchNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last_by_year: Mutex::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the next number for the current year.
    pub async fn next(&self) -> String {
        self.next_for_year(Utc::now().year()).await
    }

    pub async fn next_for_year(&self, year: i32) -> String {
        let mut last_by_year = self.last_by_year.lock().await;
        let last = last_by_year.entry(year).or_insert(0);
        *last += 1;
        self.format(year, *last)
    }

    /// Records an existing number so it is never handed out again.
    ///
    /// Numbers with a different prefix or an unparseable shape are ignored.
    pub async fn observe(&self, search_number: &str) {
        let Some((year, sequence)) = self.parse(search_number) else {
            return;
        };
        let mut last_by_year = self.last_by_year.lock().await;
        let last = last_by_year.entry(year).or_insert(0);
        if sequence > *last {
            *last = sequence;
        }
    }

    fn format(&self, year: i32, sequence: u32) -> String {
        format!("{}-{year}-{sequence:04}", self.prefix)
    }

    fn parse(&self, search_number: &str) -> Option<(i32, u32)> {
        let rest = search_number
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('-')?;
        let (year, sequence) = rest.split_once('-')?;
        Some((year.parse().ok()?, sequence.parse().ok()?))
    }
}
