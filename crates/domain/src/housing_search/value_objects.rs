//! Identifiers and small enumerations used by the housing search.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Returns true for the all-zero UUID, which never names a real entity.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// The board-approved relocation applicant who owns a search.
    ApplicantId
);

uuid_id!(
    /// A property listing a contract can be placed on.
    PropertyId
);

uuid_id!(
    /// A synagogue an applicant may want to live near.
    ShulId
);

/// How soon the family intends to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveTimeline {
    Immediate,
    ShortTerm,
    MediumTerm,
    LongTerm,
    Flexible,
    NotSure,
}

impl MoveTimeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveTimeline::Immediate => "Immediate",
            MoveTimeline::ShortTerm => "ShortTerm",
            MoveTimeline::MediumTerm => "MediumTerm",
            MoveTimeline::LongTerm => "LongTerm",
            MoveTimeline::Flexible => "Flexible",
            MoveTimeline::NotSure => "NotSure",
        }
    }
}

impl std::fmt::Display for MoveTimeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occupancy after closing. Tracked independently of the search stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovedInStatus {
    NotYetMoved,
    Renovating,
    MovedIn,
    RentingOut,
    Other,
}

impl MovedInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovedInStatus::NotYetMoved => "NotYetMoved",
            MovedInStatus::Renovating => "Renovating",
            MovedInStatus::MovedIn => "MovedIn",
            MovedInStatus::RentingOut => "RentingOut",
            MovedInStatus::Other => "Other",
        }
    }
}

impl std::fmt::Display for MovedInStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
