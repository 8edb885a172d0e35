//! Time, timestamps and effective-dated periods.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// UTC timestamp used for effective dates, booking windows and audit times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time, truncated to microseconds so that it
/// survives a storage round-trip unchanged.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Half-open validity interval `[effective_from, effective_to)`.
///
/// `effective_to = None` means the period never ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePeriod {
    pub effective_from: Timestamp,
    pub effective_to: Option<Timestamp>,
}

impl EffectivePeriod {
    /// Build a period, rejecting an end that is not strictly after the start.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPeriod`] when `to <= from`.
    pub fn new(from: Timestamp, to: Option<Timestamp>) -> Result<Self, ValidationError> {
        if to.is_some_and(|to| to <= from) {
            return Err(ValidationError::InvalidPeriod);
        }
        Ok(Self {
            effective_from: from,
            effective_to: to,
        })
    }

    /// Open-ended period starting at `from`.
    #[must_use]
    pub fn starting(from: Timestamp) -> Self {
        Self {
            effective_from: from,
            effective_to: None,
        }
    }

    #[must_use]
    pub fn is_open_ended(&self) -> bool {
        self.effective_to.is_none()
    }

    /// Whether `at` falls inside the period.
    #[must_use]
    pub fn contains(&self, at: Timestamp) -> bool {
        self.effective_from <= at && self.effective_to.is_none_or(|to| at < to)
    }

    /// Two half-open periods overlap iff each starts before the other ends.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let starts_before_other_ends = other
            .effective_to
            .is_none_or(|to| self.effective_from < to);
        let other_starts_before_end = self
            .effective_to
            .is_none_or(|to| other.effective_from < to);
        starts_before_other_ends && other_starts_before_end
    }

    /// Whether the period still runs after `at`.
    #[must_use]
    pub fn extends_past(&self, at: Timestamp) -> bool {
        self.effective_to.is_none_or(|to| to > at)
    }
}
