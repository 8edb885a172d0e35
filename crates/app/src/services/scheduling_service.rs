//! Scheduling service: procedure bookings with pre-checks and overlap
//! detection.

use medinfra_domain::audit::{AuditAction, AuditRecord};
use medinfra_domain::booking::{BookingStatus, BookingWindow, ProcedureBooking, check_bookable};
use medinfra_domain::error::{InfraError, NotFoundError, ValidationError};
use medinfra_domain::id::{BookingId, ResourceId, UnitId};
use medinfra_domain::policy::{PrecheckFlags, PrecheckItem};
use medinfra_domain::scope::Scope;
use medinfra_domain::time::{Timestamp, now};

use crate::ports::{
    AuditSink, BookingFilter, BookingRepository, PolicyRepository, ResourceRepository,
    UnitRepository,
};
use crate::services::emit;
use crate::services::registry_service::{branch_resource, branch_unit};

/// Input for [`SchedulingService::create`].
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub unit_id: UnitId,
    pub resource_id: ResourceId,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub flags: PrecheckFlags,
    pub patient_id: Option<String>,
    pub department_id: Option<String>,
}

/// A created booking with the WARN-mode pre-checks it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledBooking {
    pub booking: ProcedureBooking,
    pub warnings: Vec<PrecheckItem>,
}

/// Application service for procedure bookings.
pub struct SchedulingService<S, A> {
    store: S,
    audit: A,
}

impl<S, A> SchedulingService<S, A>
where
    S: UnitRepository + ResourceRepository + BookingRepository + PolicyRepository + Send + Sync,
    A: AuditSink + Send + Sync,
{
    /// Create a new service backed by the given store and audit sink.
    pub fn new(store: S, audit: A) -> Self {
        Self { store, audit }
    }

    /// Book `resource_id` for the window.
    ///
    /// Checks run in this order: unit, pre-check policy, resource, window,
    /// overlap. The resource and overlap checks are repeated by the store
    /// inside the insert's unit of work.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign unit or resource,
    ///   or a resource of another unit
    /// - [`InfraError::Validation`] for an inactive unit or resource, a
    ///   blocking pre-check, an unschedulable resource or an empty window
    /// - [`InfraError::Conflict`] when the resource is not AVAILABLE or an
    ///   existing SCHEDULED booking overlaps the window
    #[tracing::instrument(skip(self, input), fields(unit_id = %input.unit_id, resource_id = %input.resource_id))]
    pub async fn create(&self, scope: &Scope, input: NewBooking) -> Result<ScheduledBooking, InfraError> {
        let unit = branch_unit(&self.store, scope, input.unit_id).await?;
        if !unit.is_active {
            return Err(ValidationError::Inactive("unit").into());
        }

        let policy = self
            .store
            .get_policy(scope.branch_id)
            .await?
            .unwrap_or_default();
        let warnings = policy.precheck.evaluate(input.flags)?;

        let resource = branch_resource(&self.store, scope, input.resource_id).await?;
        check_bookable(&resource, scope.branch_id, unit.id)?;
        let window = BookingWindow::new(input.start_at, input.end_at)?;

        let booking = ProcedureBooking {
            id: BookingId::new(),
            branch_id: scope.branch_id,
            unit_id: unit.id,
            resource_id: resource.id,
            patient_id: input.patient_id,
            department_id: input.department_id,
            window,
            status: BookingStatus::Scheduled,
            flags: input.flags,
            created_by: scope.actor_id,
            created_at: now(),
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        };
        let booking = self.store.create_booking_if_free(booking).await?;

        if !warnings.is_empty() {
            tracing::warn!(booking_id = %booking.id, ?warnings, "booking created with pre-check warnings");
        }
        tracing::info!(
            booking_id = %booking.id,
            resource_id = %booking.resource_id,
            start_at = %booking.window.start_at,
            end_at = %booking.window.end_at,
            "booking created"
        );
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::SchedCreate,
                "ProcedureBooking",
                booking.id,
                serde_json::json!({
                    "unitId": booking.unit_id,
                    "resourceId": booking.resource_id,
                    "startAt": booking.window.start_at,
                    "endAt": booking.window.end_at,
                    "warnings": warnings,
                }),
            ),
        )
        .await;
        Ok(ScheduledBooking { booking, warnings })
    }

    /// Cancel a SCHEDULED booking.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign booking
    /// - [`ValidationError::ReasonRequired`] for a blank reason
    /// - [`InfraError::Conflict`] when the booking is not SCHEDULED
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(&self, scope: &Scope, id: BookingId, reason: &str) -> Result<ProcedureBooking, InfraError> {
        let booking = self.get(scope, id).await?;
        let cancelled = booking.cancel(reason, scope.actor_id, now())?;
        let cancelled = self.store.cancel_booking(cancelled).await?;
        tracing::info!(booking_id = %id, "booking cancelled");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::SchedCancel,
                "ProcedureBooking",
                id,
                serde_json::json!({ "reason": cancelled.cancel_reason }),
            ),
        )
        .await;
        Ok(cancelled)
    }

    /// Bookings of the branch ordered by start.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self, scope: &Scope, filter: &BookingFilter) -> Result<Vec<ProcedureBooking>, InfraError> {
        self.store.list_bookings(scope.branch_id, filter).await
    }

    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] for a missing or foreign booking.
    pub async fn get(&self, scope: &Scope, id: BookingId) -> Result<ProcedureBooking, InfraError> {
        let booking = self
            .store
            .get_booking(id)
            .await?
            .ok_or_else(|| NotFoundError::new("ProcedureBooking", id))?;
        scope.ensure_owns(booking.branch_id, "ProcedureBooking", id)?;
        Ok(booking)
    }
}
