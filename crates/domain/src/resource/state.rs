//! Resource availability states and the transition table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceState {
    #[default]
    Available,
    Reserved,
    Occupied,
    Cleaning,
    Sanitization,
    Maintenance,
    Blocked,
    Inactive,
}

impl ResourceState {
    pub const ALL: [Self; 8] = [
        Self::Available,
        Self::Reserved,
        Self::Occupied,
        Self::Cleaning,
        Self::Sanitization,
        Self::Maintenance,
        Self::Blocked,
        Self::Inactive,
    ];

    /// States reachable from `self` in one step. Empty for INACTIVE.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [Self] {
        use ResourceState as S;

        match self {
            S::Available => &[S::Occupied, S::Reserved, S::Maintenance, S::Blocked, S::Inactive],
            S::Reserved => &[S::Available, S::Occupied, S::Maintenance, S::Blocked, S::Inactive],
            S::Occupied => &[S::Cleaning, S::Sanitization, S::Maintenance, S::Blocked, S::Inactive],
            S::Cleaning | S::Sanitization => &[S::Available, S::Maintenance, S::Blocked, S::Inactive],
            S::Maintenance => &[S::Available, S::Blocked, S::Inactive],
            S::Blocked => &[S::Available, S::Maintenance, S::Inactive],
            S::Inactive => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// RESERVED and BLOCKED must say why.
    #[must_use]
    pub fn requires_reason(self) -> bool {
        matches!(self, Self::Reserved | Self::Blocked)
    }

    /// Whether a resource may be created directly in this state.
    #[must_use]
    pub fn is_valid_initial(self) -> bool {
        !matches!(self, Self::Occupied | Self::Inactive)
    }

    /// Whether a unit or resource holding this state blocks deactivation.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Occupied | Self::Reserved)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Reserved => "RESERVED",
            Self::Occupied => "OCCUPIED",
            Self::Cleaning => "CLEANING",
            Self::Sanitization => "SANITIZATION",
            Self::Maintenance => "MAINTENANCE",
            Self::Blocked => "BLOCKED",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "resource state",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_allow_available_to_inactive() {
        assert!(ResourceState::Available.can_transition_to(ResourceState::Inactive));
    }

    #[test]
    fn should_reject_available_to_cleaning() {
        assert!(!ResourceState::Available.can_transition_to(ResourceState::Cleaning));
    }

    #[test]
    fn should_route_occupied_through_housekeeping() {
        assert!(!ResourceState::Occupied.can_transition_to(ResourceState::Available));
        assert!(ResourceState::Occupied.can_transition_to(ResourceState::Cleaning));
        assert!(ResourceState::Cleaning.can_transition_to(ResourceState::Available));
        assert!(ResourceState::Sanitization.can_transition_to(ResourceState::Available));
    }

    #[test]
    fn should_have_no_exit_from_inactive() {
        for next in ResourceState::ALL {
            assert!(!ResourceState::Inactive.can_transition_to(next));
        }
    }

    #[test]
    fn should_never_allow_self_transition() {
        for state in ResourceState::ALL {
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn should_require_reason_for_reserved_and_blocked_only() {
        let with_reason: Vec<_> = ResourceState::ALL
            .into_iter()
            .filter(|s| s.requires_reason())
            .collect();
        assert_eq!(with_reason, [ResourceState::Reserved, ResourceState::Blocked]);
    }

    #[test]
    fn should_reject_occupied_and_inactive_as_initial_states() {
        assert!(!ResourceState::Occupied.is_valid_initial());
        assert!(!ResourceState::Inactive.is_valid_initial());
        assert!(ResourceState::Maintenance.is_valid_initial());
    }

    #[test]
    fn should_parse_wire_name() {
        assert_eq!(
            "sanitization".parse::<ResourceState>().unwrap(),
            ResourceState::Sanitization
        );
        assert!("BROKEN".parse::<ResourceState>().is_err());
    }
}
