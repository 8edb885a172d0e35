//! Resource service: the resource state machine and its lifecycle.

use medinfra_domain::audit::{AuditAction, AuditRecord};
use medinfra_domain::error::{InfraError, ValidationError};
use medinfra_domain::id::ResourceId;
use medinfra_domain::resource::{ResourceState, UnitResource};
use medinfra_domain::scope::Scope;
use medinfra_domain::time::now;

use crate::ports::{AuditSink, PolicyRepository, ResourceRepository, UnitRepository};
use crate::services::emit;
use crate::services::registry_service::{Deactivation, DeactivationOutcome, branch_resource, branch_unit};

/// Application service for resource state changes.
pub struct ResourceService<S, A> {
    store: S,
    audit: A,
}

impl<S, A> ResourceService<S, A>
where
    S: ResourceRepository + UnitRepository + PolicyRepository + Send + Sync,
    A: AuditSink + Send + Sync,
{
    /// Create a new service backed by the given store and audit sink.
    pub fn new(store: S, audit: A) -> Self {
        Self { store, audit }
    }

    /// Move a resource to `next` under the branch policy.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign resource
    /// - [`InfraError::Validation`] when the resource is inactive or a
    ///   RESERVED/BLOCKED move has no reason
    /// - [`InfraError::Conflict`] for a move outside the transition table,
    ///   the housekeeping gate, or a concurrent transition
    #[tracing::instrument(skip(self, reason))]
    pub async fn set_state(
        &self,
        scope: &Scope,
        id: ResourceId,
        next: ResourceState,
        reason: Option<&str>,
    ) -> Result<UnitResource, InfraError> {
        let resource = branch_resource(&self.store, scope, id).await?;
        let policy = self
            .store
            .get_policy(scope.branch_id)
            .await?
            .unwrap_or_default();
        let from = resource.state;
        let updated = resource.transition(next, reason, &policy, now())?;
        let updated = self.store.save_resource_state(updated, from).await?;

        tracing::info!(resource_id = %id, %from, to = %next, "resource state changed");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::ResourceStateUpdate,
                "UnitResource",
                id,
                serde_json::json!({
                    "from": from,
                    "to": next,
                    "reason": reason.map(str::trim).filter(|reason| !reason.is_empty()),
                }),
            ),
        )
        .await;
        Ok(updated)
    }

    /// Soft-deactivate a resource, or hard-delete one that was never booked.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign resource
    /// - [`InfraError::Validation`] for a soft request without reason or an
    ///   already inactive resource
    /// - [`InfraError::Conflict`] while OCCUPIED/RESERVED (soft) or once
    ///   referenced by a booking (hard)
    #[tracing::instrument(skip(self, request), fields(hard = request.hard))]
    pub async fn deactivate(
        &self,
        scope: &Scope,
        id: ResourceId,
        request: Deactivation,
    ) -> Result<DeactivationOutcome<UnitResource>, InfraError> {
        let resource = branch_resource(&self.store, scope, id).await?;
        if request.hard {
            self.store.delete_resource_if_unbooked(id).await?;
            tracing::info!(resource_id = %id, "resource deleted");
            emit(
                &self.audit,
                AuditRecord::new(
                    scope,
                    AuditAction::ResourceDeleteHard,
                    "UnitResource",
                    id,
                    serde_json::json!({ "code": resource.code, "unitId": resource.unit_id }),
                ),
            )
            .await;
            return Ok(DeactivationOutcome::Deleted);
        }

        let from = resource.state;
        let updated = resource.deactivate(request.reason.as_deref(), scope.actor_id, now())?;
        let updated = self.store.save_resource_state(updated, from).await?;
        tracing::info!(resource_id = %id, %from, "resource deactivated");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::ResourceDeactivate,
                "UnitResource",
                id,
                serde_json::json!({ "from": from, "reason": updated.deactivation_reason }),
            ),
        )
        .await;
        Ok(DeactivationOutcome::Deactivated(updated))
    }

    /// Bring an INACTIVE resource back as AVAILABLE.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign resource
    /// - [`ValidationError::Inactive`] while the owning unit is inactive
    /// - [`InfraError::Conflict`] when the resource is not INACTIVE
    #[tracing::instrument(skip(self))]
    pub async fn reactivate(&self, scope: &Scope, id: ResourceId) -> Result<UnitResource, InfraError> {
        let resource = branch_resource(&self.store, scope, id).await?;
        let unit = branch_unit(&self.store, scope, resource.unit_id).await?;
        if !unit.is_active {
            return Err(ValidationError::Inactive("unit").into());
        }
        let updated = resource.reactivate(now())?;
        let updated = self
            .store
            .save_resource_state(updated, ResourceState::Inactive)
            .await?;
        tracing::info!(resource_id = %id, "resource reactivated");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::ResourceReactivate,
                "UnitResource",
                id,
                serde_json::json!({ "to": updated.state }),
            ),
        )
        .await;
        Ok(updated)
    }
}
