//! Purchase contracts and the history of contracts that fell through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

use super::{HousingSearchError, PropertyId};

/// A purchase contract on a property.
///
/// Immutable: recording the closing produces a new value via
/// [`Contract::with_actual_closing_date`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    property_id: PropertyId,
    price: Money,
    contract_date: DateTime<Utc>,
    expected_closing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    actual_closing_date: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn new(
        property_id: PropertyId,
        price: Money,
        contract_date: DateTime<Utc>,
        expected_closing_date: Option<DateTime<Utc>>,
    ) -> Result<Self, HousingSearchError> {
        if property_id.is_nil() {
            return Err(HousingSearchError::PropertyIdRequired);
        }
        Ok(Self {
            property_id,
            price,
            contract_date,
            expected_closing_date,
            actual_closing_date: None,
        })
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn contract_date(&self) -> DateTime<Utc> {
        self.contract_date
    }

    pub fn expected_closing_date(&self) -> Option<DateTime<Utc>> {
        self.expected_closing_date
    }

    pub fn actual_closing_date(&self) -> Option<DateTime<Utc>> {
        self.actual_closing_date
    }

    /// Returns true once the closing has been recorded.
    pub fn is_closed(&self) -> bool {
        self.actual_closing_date.is_some()
    }

    /// Whole days from contract to closing, or to now while still open.
    pub fn days_under_contract(&self) -> i64 {
        self.days_under_contract_at(Utc::now())
    }

    /// Same as [`Contract::days_under_contract`] with an explicit clock.
    pub fn days_under_contract_at(&self, now: DateTime<Utc>) -> i64 {
        let end = self.actual_closing_date.unwrap_or(now);
        (end - self.contract_date).num_days()
    }

    /// Returns a copy of this contract with the closing recorded.
    pub fn with_actual_closing_date(&self, date: DateTime<Utc>) -> Self {
        Self {
            actual_closing_date: Some(date),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {} (contract {})",
            self.property_id,
            self.price,
            self.contract_date.format("%Y-%m-%d")
        )?;
        if let Some(closed) = self.actual_closing_date {
            write!(f, ", closed {}", closed.format("%Y-%m-%d"))?;
        }
        Ok(())
    }
}

/// A contract that collapsed before the family moved in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedContractAttempt {
    property_id: PropertyId,
    contract_price: Money,
    contract_date: DateTime<Utc>,
    failed_date: DateTime<Utc>,
    reason: Option<String>,
}

impl FailedContractAttempt {
    pub fn from_contract(
        contract: &Contract,
        failed_date: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        Self {
            property_id: contract.property_id,
            contract_price: contract.price.clone(),
            contract_date: contract.contract_date,
            failed_date,
            reason,
        }
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    pub fn contract_price(&self) -> &Money {
        &self.contract_price
    }

    pub fn contract_date(&self) -> DateTime<Utc> {
        self.contract_date
    }

    pub fn failed_date(&self) -> DateTime<Utc> {
        self.failed_date
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Whole days the contract was in place before it failed.
    pub fn days_under_contract(&self) -> i64 {
        (self.failed_date - self.contract_date).num_days()
    }
}

impl std::fmt::Display for FailedContractAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}: {} days, failed: {}",
            self.property_id,
            self.contract_price,
            self.days_under_contract(),
            self.reason.as_deref().unwrap_or("no reason given")
        )
    }
}

/// Append-only record of contracts that fell through, oldest first.
///
/// Entries can only be added from inside the crate; there is no way to
/// remove or edit one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailedContractHistory(Vec<FailedContractAttempt>);

impl FailedContractHistory {
    pub(crate) fn push(&mut self, attempt: FailedContractAttempt) {
        self.0.push(attempt);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailedContractAttempt> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FailedContractAttempt> {
        self.0.get(index)
    }

    /// The most recent failure.
    pub fn last(&self) -> Option<&FailedContractAttempt> {
        self.0.last()
    }

    pub fn as_slice(&self) -> &[FailedContractAttempt] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a FailedContractHistory {
    type Item = &'a FailedContractAttempt;
    type IntoIter = std::slice::Iter<'a, FailedContractAttempt>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn date(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    fn contract_on(day: u32) -> Contract {
        Contract::new(
            PropertyId::new(),
            Money::new(450_000.0).unwrap(),
            date(day),
            Some(date(28)),
        )
        .unwrap()
    }

    #[test]
    fn nil_property_is_rejected() {
        let result = Contract::new(
            PropertyId::from_uuid(Uuid::nil()),
            Money::new(1.0).unwrap(),
            Utc::now(),
            None,
        );
        assert!(matches!(result, Err(HousingSearchError::PropertyIdRequired)));
    }

    #[test]
    fn open_contract_counts_days_to_now() {
        let contract = contract_on(1);
        assert!(!contract.is_closed());
        assert_eq!(contract.days_under_contract_at(date(11)), 10);
        // Partial days truncate.
        assert_eq!(
            contract.days_under_contract_at(date(11) + Duration::hours(23)),
            10
        );
    }

    #[test]
    fn closing_returns_new_value_and_fixes_day_count() {
        let open = contract_on(1);
        let closed = open.with_actual_closing_date(date(21));

        assert!(!open.is_closed());
        assert!(closed.is_closed());
        assert_eq!(closed.actual_closing_date(), Some(date(21)));
        assert_eq!(closed.days_under_contract_at(date(30)), 20);
        assert_eq!(closed.property_id(), open.property_id());
        assert_eq!(closed.expected_closing_date(), Some(date(28)));
    }

    #[test]
    fn failed_attempt_copies_contract_terms() {
        let contract = contract_on(1);
        let attempt =
            FailedContractAttempt::from_contract(&contract, date(15), Some("Inspection".into()));

        assert_eq!(attempt.property_id(), contract.property_id());
        assert_eq!(attempt.contract_price(), contract.price());
        assert_eq!(attempt.contract_date(), date(1));
        assert_eq!(attempt.days_under_contract(), 14);
        assert_eq!(attempt.reason(), Some("Inspection"));
    }

    #[test]
    fn failed_attempt_display() {
        let contract = contract_on(1);
        let attempt = FailedContractAttempt::from_contract(&contract, date(15), None);
        let text = attempt.to_string();
        assert!(text.contains("$450,000.00"));
        assert!(text.contains("14 days"));
        assert!(text.ends_with("no reason given"));
    }

    #[test]
    fn history_only_grows() {
        let mut history = FailedContractHistory::default();
        assert!(history.is_empty());

        let first = FailedContractAttempt::from_contract(&contract_on(1), date(5), None);
        let second = FailedContractAttempt::from_contract(&contract_on(6), date(9), None);
        history.push(first.clone());
        history.push(second.clone());

        assert_eq!(history.len(), 2);
        assert_eq!(history.get(0), Some(&first));
        assert_eq!(history.last(), Some(&second));
        assert_eq!(history.iter().count(), 2);
    }

    #[test]
    fn history_serializes_as_plain_list() {
        let mut history = FailedContractHistory::default();
        history.push(FailedContractAttempt::from_contract(
            &contract_on(1),
            date(5),
            Some("Financing".into()),
        ));

        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["reason"], "Financing");

        let back: FailedContractHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }
}
