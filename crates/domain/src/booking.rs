//! Procedure bookings: half-open time windows reserved on a resource.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConflictError, InfraError, NotFoundError, ValidationError};
use crate::id::{ActorId, BookingId, BranchId, ResourceId, UnitId};
use crate::policy::PrecheckFlags;
use crate::resource::{ResourceState, UnitResource};
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Scheduled,
    Cancelled,
}

impl BookingStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(Self::Scheduled),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ValidationError::UnknownValue {
                field: "booking status",
                value: s.to_string(),
            }),
        }
    }
}

/// Half-open `[start_at, end_at)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWindow {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

impl BookingWindow {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidWindow`] unless `start_at < end_at`.
    pub fn new(start_at: Timestamp, end_at: Timestamp) -> Result<Self, ValidationError> {
        if start_at >= end_at {
            return Err(ValidationError::InvalidWindow);
        }
        Ok(Self { start_at, end_at })
    }

    /// Touching windows do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_at < other.end_at && self.end_at > other.start_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureBooking {
    pub id: BookingId,
    pub branch_id: BranchId,
    pub unit_id: UnitId,
    pub resource_id: ResourceId,
    pub patient_id: Option<String>,
    pub department_id: Option<String>,
    #[serde(flatten)]
    pub window: BookingWindow,
    pub status: BookingStatus,
    #[serde(flatten)]
    pub flags: PrecheckFlags,
    pub created_by: ActorId,
    pub created_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
    pub cancelled_by: Option<ActorId>,
    pub cancel_reason: Option<String>,
}

impl ProcedureBooking {
    /// Whether this booking still occupies its window.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.status == BookingStatus::Scheduled
    }

    /// Cancel a scheduled booking.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ReasonRequired`] for a blank reason
    /// - [`ConflictError::NotScheduled`] when already cancelled
    pub fn cancel(&self, reason: &str, actor: ActorId, at: Timestamp) -> Result<Self, InfraError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::ReasonRequired("cancel a booking").into());
        }
        if !self.is_scheduled() {
            return Err(ConflictError::NotScheduled(self.status).into());
        }
        let mut cancelled = self.clone();
        cancelled.status = BookingStatus::Cancelled;
        cancelled.cancelled_at = Some(at);
        cancelled.cancelled_by = Some(actor);
        cancelled.cancel_reason = Some(reason.to_string());
        Ok(cancelled)
    }
}

/// Check that `resource` can take a new booking in `unit_id` of `branch_id`.
///
/// # Errors
///
/// - [`NotFoundError`] when the resource belongs to another branch or unit
/// - [`ValidationError::Inactive`] / [`ValidationError::NotSchedulable`]
/// - [`ConflictError::ResourceNotAvailable`] naming any state but AVAILABLE
pub fn check_bookable(
    resource: &UnitResource,
    branch_id: BranchId,
    unit_id: UnitId,
) -> Result<(), InfraError> {
    if resource.branch_id != branch_id || resource.unit_id != unit_id {
        return Err(NotFoundError::new("UnitResource", resource.id).into());
    }
    if !resource.is_active || resource.state == ResourceState::Inactive {
        return Err(ValidationError::Inactive("resource").into());
    }
    if !resource.is_schedulable {
        return Err(ValidationError::NotSchedulable.into());
    }
    if resource.state != ResourceState::Available {
        return Err(ConflictError::ResourceNotAvailable(resource.state).into());
    }
    Ok(())
}

/// First scheduled booking on `resource_id` whose window overlaps `window`.
pub fn find_conflict<'a>(
    existing: impl IntoIterator<Item = &'a ProcedureBooking>,
    resource_id: ResourceId,
    window: &BookingWindow,
) -> Option<&'a ProcedureBooking> {
    existing.into_iter().find(|booking| {
        booking.resource_id == resource_id && booking.is_scheduled() && booking.window.overlaps(window)
    })
}
