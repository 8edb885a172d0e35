//! Location kinds and their fixed parent/child relationships.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Level of a node in the campus → area hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationKind {
    Campus,
    Building,
    Floor,
    Zone,
    Area,
}

impl LocationKind {
    pub const ALL: [Self; 5] = [
        Self::Campus,
        Self::Building,
        Self::Floor,
        Self::Zone,
        Self::Area,
    ];

    /// Kind of the immediate parent, `None` for the root kind.
    #[must_use]
    pub fn expected_parent(self) -> Option<Self> {
        match self {
            Self::Campus => None,
            Self::Building => Some(Self::Campus),
            Self::Floor => Some(Self::Building),
            Self::Zone => Some(Self::Floor),
            Self::Area => Some(Self::Zone),
        }
    }

    /// Depth in the hierarchy, starting at 1 for campuses.
    #[must_use]
    pub fn depth(self) -> u8 {
        match self {
            Self::Campus => 1,
            Self::Building => 2,
            Self::Floor => 3,
            Self::Zone => 4,
            Self::Area => 5,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Campus => "CAMPUS",
            Self::Building => "BUILDING",
            Self::Floor => "FLOOR",
            Self::Zone => "ZONE",
            Self::Area => "AREA",
        }
    }

    /// Check that a node of this kind may hang below a parent of `parent` kind.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when a parent is missing, unexpected or
    /// of the wrong kind.
    pub fn check_parent(self, parent: Option<Self>) -> Result<(), ValidationError> {
        match (self.expected_parent(), parent) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(ValidationError::UnexpectedParent { kind: self }),
            (Some(expected), None) => Err(ValidationError::MissingParent {
                kind: self,
                expected,
            }),
            (Some(expected), Some(actual)) if expected == actual => Ok(()),
            (Some(expected), Some(actual)) => Err(ValidationError::ParentKindMismatch {
                kind: self,
                expected,
                actual,
            }),
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "location kind",
                value: s.to_string(),
            })
    }
}
