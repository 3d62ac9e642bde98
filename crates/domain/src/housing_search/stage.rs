//! Housing search stage machine.

use serde::{Deserialize, Serialize};

use super::Contract;

/// The stage of a housing search, without its per-stage data.
///
/// Legal transitions:
/// ```text
/// Submitted ──► HouseHunting ──► UnderContract ──► Closed ──► MovedIn
///     │            ▲    │  ▲           │              │
///     │            │    ▼  └───────────┴──────────────┘  (contract fell through)
///     │            └─ Paused
///     └──► Rejected
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum StageKind {
    /// Application received, search not started.
    #[default]
    Submitted,

    /// Actively looking at properties.
    HouseHunting,

    /// Search turned down (terminal state).
    Rejected,

    /// A purchase contract is in place.
    UnderContract,

    /// Search on hold.
    Paused,

    /// Purchase closed, family not yet moved in.
    Closed,

    /// Family moved into the purchased home (terminal state).
    MovedIn,
}

pub(crate) const START_HOUSE_HUNTING_FROM: &[StageKind] = &[StageKind::Submitted];
pub(crate) const REJECT_FROM: &[StageKind] = &[StageKind::Submitted];
pub(crate) const PUT_UNDER_CONTRACT_FROM: &[StageKind] = &[StageKind::HouseHunting];
pub(crate) const PAUSE_FROM: &[StageKind] = &[StageKind::HouseHunting];
pub(crate) const RESUME_FROM: &[StageKind] = &[StageKind::Paused];
pub(crate) const CONTRACT_FELL_THROUGH_FROM: &[StageKind] =
    &[StageKind::UnderContract, StageKind::Closed];
pub(crate) const RECORD_CLOSING_FROM: &[StageKind] = &[StageKind::UnderContract];
pub(crate) const RECORD_MOVED_IN_FROM: &[StageKind] = &[StageKind::Closed];

impl StageKind {
    /// Every stage, in lifecycle order.
    pub const ALL: [StageKind; 7] = [
        StageKind::Submitted,
        StageKind::HouseHunting,
        StageKind::Rejected,
        StageKind::UnderContract,
        StageKind::Paused,
        StageKind::Closed,
        StageKind::MovedIn,
    ];

    pub fn can_start_house_hunting(&self) -> bool {
        START_HOUSE_HUNTING_FROM.contains(self)
    }

    pub fn can_reject(&self) -> bool {
        REJECT_FROM.contains(self)
    }

    pub fn can_put_under_contract(&self) -> bool {
        PUT_UNDER_CONTRACT_FROM.contains(self)
    }

    pub fn can_pause(&self) -> bool {
        PAUSE_FROM.contains(self)
    }

    pub fn can_resume(&self) -> bool {
        RESUME_FROM.contains(self)
    }

    /// A deal can still collapse after closing is recorded, up to move-in.
    pub fn can_fall_through(&self) -> bool {
        CONTRACT_FELL_THROUGH_FROM.contains(self)
    }

    pub fn can_record_closing(&self) -> bool {
        RECORD_CLOSING_FROM.contains(self)
    }

    pub fn can_record_moved_in(&self) -> bool {
        RECORD_MOVED_IN_FROM.contains(self)
    }

    /// Returns true if no transition leaves this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageKind::Rejected | StageKind::MovedIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Submitted => "Submitted",
            StageKind::HouseHunting => "HouseHunting",
            StageKind::Rejected => "Rejected",
            StageKind::UnderContract => "UnderContract",
            StageKind::Paused => "Paused",
            StageKind::Closed => "Closed",
            StageKind::MovedIn => "MovedIn",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The source stages a transition accepts, rendered as `"A or B"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredStages(pub &'static [StageKind]);

impl RequiredStages {
    pub fn stages(&self) -> &'static [StageKind] {
        self.0
    }
}

impl std::fmt::Display for RequiredStages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, stage) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

/// The current stage of a search together with the data only that stage has.
///
/// Contract terms exist only while a contract is active, so a `Submitted`
/// search with a contract price cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind")]
pub enum Stage {
    #[default]
    Submitted,
    HouseHunting,
    Rejected {
        reason: String,
    },
    /// The contract has no actual closing date yet.
    UnderContract(Contract),
    Paused {
        reason: String,
    },
    /// The contract carries the actual closing date.
    Closed(Contract),
    MovedIn {
        contract: Contract,
    },
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Submitted => StageKind::Submitted,
            Stage::HouseHunting => StageKind::HouseHunting,
            Stage::Rejected { .. } => StageKind::Rejected,
            Stage::UnderContract(_) => StageKind::UnderContract,
            Stage::Paused { .. } => StageKind::Paused,
            Stage::Closed(_) => StageKind::Closed,
            Stage::MovedIn { .. } => StageKind::MovedIn,
        }
    }

    /// The active or completed purchase contract, if the stage has one.
    pub fn contract(&self) -> Option<&Contract> {
        match self {
            Stage::UnderContract(contract) | Stage::Closed(contract) => Some(contract),
            Stage::MovedIn { contract } => Some(contract),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::housing_search::PropertyId;
    use crate::money::Money;
    use chrono::Utc;

    fn contract() -> Contract {
        Contract::new(
            PropertyId::new(),
            Money::new(450_000.0).unwrap(),
            Utc::now(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn default_stage_is_submitted() {
        assert_eq!(StageKind::default(), StageKind::Submitted);
        assert_eq!(Stage::default().kind(), StageKind::Submitted);
    }

    #[test]
    fn submitted_can_start_or_be_rejected() {
        assert!(StageKind::Submitted.can_start_house_hunting());
        assert!(StageKind::Submitted.can_reject());
        assert!(!StageKind::HouseHunting.can_start_house_hunting());
        assert!(!StageKind::HouseHunting.can_reject());
        assert!(!StageKind::Paused.can_reject());
    }

    #[test]
    fn house_hunting_can_contract_or_pause() {
        assert!(StageKind::HouseHunting.can_put_under_contract());
        assert!(StageKind::HouseHunting.can_pause());
        assert!(!StageKind::Paused.can_put_under_contract());
        assert!(!StageKind::UnderContract.can_pause());
        assert!(StageKind::Paused.can_resume());
        assert!(!StageKind::HouseHunting.can_resume());
    }

    #[test]
    fn contract_can_fall_through_before_and_after_closing() {
        assert!(StageKind::UnderContract.can_fall_through());
        assert!(StageKind::Closed.can_fall_through());
        assert!(!StageKind::HouseHunting.can_fall_through());
        assert!(!StageKind::MovedIn.can_fall_through());
    }

    #[test]
    fn closing_then_move_in() {
        assert!(StageKind::UnderContract.can_record_closing());
        assert!(!StageKind::Closed.can_record_closing());
        assert!(StageKind::Closed.can_record_moved_in());
        assert!(!StageKind::UnderContract.can_record_moved_in());
    }

    #[test]
    fn terminal_stages_have_no_outgoing_edges() {
        for stage in [StageKind::Rejected, StageKind::MovedIn] {
            assert!(stage.is_terminal());
            assert!(!stage.can_start_house_hunting());
            assert!(!stage.can_reject());
            assert!(!stage.can_put_under_contract());
            assert!(!stage.can_pause());
            assert!(!stage.can_resume());
            assert!(!stage.can_fall_through());
            assert!(!stage.can_record_closing());
            assert!(!stage.can_record_moved_in());
        }
        let non_terminal = StageKind::ALL.iter().filter(|s| !s.is_terminal()).count();
        assert_eq!(non_terminal, 5);
    }

    #[test]
    fn required_stages_display() {
        assert_eq!(RequiredStages(REJECT_FROM).to_string(), "Submitted");
        assert_eq!(
            RequiredStages(CONTRACT_FELL_THROUGH_FROM).to_string(),
            "UnderContract or Closed"
        );
    }

    #[test]
    fn stage_exposes_contract_only_when_present() {
        assert!(Stage::HouseHunting.contract().is_none());
        assert!(
            Stage::Paused {
                reason: "travel".into()
            }
            .contract()
            .is_none()
        );
        let c = contract();
        assert_eq!(Stage::UnderContract(c.clone()).contract(), Some(&c));
        assert_eq!(Stage::MovedIn { contract: c.clone() }.contract(), Some(&c));
    }

    #[test]
    fn stage_serialization_is_tagged() {
        let stage = Stage::UnderContract(contract());
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["kind"], "UnderContract");
        let back: Stage = serde_json::from_value(json).unwrap();
        assert_eq!(back, stage);

        let json = serde_json::to_value(Stage::Rejected {
            reason: "Incomplete".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "Rejected");
        assert_eq!(json["reason"], "Incomplete");
    }

    #[test]
    fn display() {
        assert_eq!(StageKind::HouseHunting.to_string(), "HouseHunting");
        assert_eq!(Stage::Closed(contract()).to_string(), "Closed");
    }
}
