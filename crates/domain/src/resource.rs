//! Unit resources (beds, tables, chairs and slots) and their lifecycle.
//!
//! State changes go through [`UnitResource::transition`], which applies the
//! transition table from [`ResourceState`] and the branch's housekeeping gate.

mod kind;
mod state;

use serde::{Deserialize, Serialize};

pub use kind::{ResourceCategory, ResourceType};
pub use state::ResourceState;

use crate::code;
use crate::error::{ConflictError, InfraError, ValidationError};
use crate::id::{ActorId, BranchId, ResourceId, RoomId, UnitId};
use crate::policy::BranchPolicy;
use crate::time::{Timestamp, now};
use crate::unit::{Room, Unit};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitResource {
    pub id: ResourceId,
    pub branch_id: BranchId,
    pub unit_id: UnitId,
    pub room_id: Option<RoomId>,
    pub code: String,
    pub name: String,
    pub resource_type: ResourceType,
    pub state: ResourceState,
    pub reserved_reason: Option<String>,
    pub blocked_reason: Option<String>,
    pub is_active: bool,
    pub is_schedulable: bool,
    pub deactivated_at: Option<Timestamp>,
    pub deactivated_by: Option<ActorId>,
    pub deactivation_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn non_blank(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

fn reason_purpose(state: ResourceState) -> &'static str {
    match state {
        ResourceState::Reserved => "reserve a resource",
        _ => "block a resource",
    }
}

impl UnitResource {
    /// Create a builder for constructing a [`UnitResource`].
    #[must_use]
    pub fn builder() -> UnitResourceBuilder {
        UnitResourceBuilder::default()
    }

    #[must_use]
    pub fn category(&self) -> ResourceCategory {
        self.resource_type.category()
    }

    /// Move to `next`, returning the updated resource.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Inactive`] when the resource is inactive
    /// - [`ConflictError::HousekeepingRequired`] when the branch gate forbids
    ///   a bed-like resource going straight from OCCUPIED to AVAILABLE
    /// - [`ConflictError::TransitionNotAllowed`] outside the transition table
    /// - [`ValidationError::ReasonRequired`] for RESERVED/BLOCKED without reason
    pub fn transition(
        &self,
        next: ResourceState,
        reason: Option<&str>,
        policy: &BranchPolicy,
        at: Timestamp,
    ) -> Result<Self, InfraError> {
        if !self.is_active || self.state == ResourceState::Inactive {
            return Err(ValidationError::Inactive("resource").into());
        }
        if policy.housekeeping_blocks(self.resource_type, self.state, next) {
            return Err(ConflictError::HousekeepingRequired(self.resource_type).into());
        }
        if !self.state.can_transition_to(next) {
            return Err(ConflictError::TransitionNotAllowed {
                from: self.state,
                to: next,
            }
            .into());
        }
        let reason = non_blank(reason);
        if next.requires_reason() && reason.is_none() {
            return Err(ValidationError::ReasonRequired(reason_purpose(next)).into());
        }

        let mut updated = self.clone();
        updated.state = next;
        updated.reserved_reason = reason.clone().filter(|_| next == ResourceState::Reserved);
        updated.blocked_reason = reason.filter(|_| next == ResourceState::Blocked);
        if next == ResourceState::Inactive {
            updated.is_active = false;
            updated.deactivated_at = Some(at);
        }
        updated.updated_at = at;
        Ok(updated)
    }

    /// Soft-deactivate, recording who did it and why.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ReasonRequired`] without a reason
    /// - [`ValidationError::Inactive`] when already inactive
    /// - [`ConflictError::ResourceBusy`] while OCCUPIED or RESERVED
    pub fn deactivate(
        &self,
        reason: Option<&str>,
        actor: ActorId,
        at: Timestamp,
    ) -> Result<Self, InfraError> {
        let reason =
            non_blank(reason).ok_or(ValidationError::ReasonRequired("deactivate a resource"))?;
        if !self.is_active || self.state == ResourceState::Inactive {
            return Err(ValidationError::Inactive("resource").into());
        }
        if self.state.is_busy() {
            return Err(ConflictError::ResourceBusy(self.state).into());
        }
        let mut updated = self.clone();
        updated.state = ResourceState::Inactive;
        updated.is_active = false;
        updated.reserved_reason = None;
        updated.blocked_reason = None;
        updated.deactivated_at = Some(at);
        updated.deactivated_by = Some(actor);
        updated.deactivation_reason = Some(reason);
        updated.updated_at = at;
        Ok(updated)
    }

    /// Bring an INACTIVE resource back as AVAILABLE.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::NotInactive`] for any other state.
    pub fn reactivate(&self, at: Timestamp) -> Result<Self, InfraError> {
        if self.state != ResourceState::Inactive {
            return Err(ConflictError::NotInactive(self.state).into());
        }
        let mut updated = self.clone();
        updated.state = ResourceState::Available;
        updated.is_active = true;
        updated.deactivated_at = None;
        updated.deactivated_by = None;
        updated.deactivation_reason = None;
        updated.updated_at = at;
        Ok(updated)
    }
}

/// Check that a resource of `resource_type` may live in `unit` (of type
/// `unit_type_code`), optionally inside `room`.
///
/// # Errors
///
/// Returns a [`ValidationError`] for an incompatible type, a missing or
/// forbidden room, a room of another unit, or an active resource under an
/// inactive unit or room.
pub fn check_placement(
    resource_type: ResourceType,
    unit: &Unit,
    unit_type_code: &str,
    room: Option<&Room>,
    is_active: bool,
) -> Result<(), ValidationError> {
    if !resource_type.is_allowed_in(unit_type_code) {
        return Err(ValidationError::ResourceTypeNotAllowed {
            resource_type,
            unit_type: unit_type_code.to_string(),
        });
    }
    match room {
        Some(_) if !unit.uses_rooms => return Err(ValidationError::RoomNotAllowed),
        Some(room) if room.unit_id != unit.id => return Err(ValidationError::RoomOutsideUnit),
        None if unit.uses_rooms && !resource_type.is_mobile() => {
            return Err(ValidationError::RoomRequired(resource_type));
        }
        _ => {}
    }
    if is_active {
        if !unit.is_active {
            return Err(ValidationError::Inactive("unit"));
        }
        if room.is_some_and(|room| !room.is_active) {
            return Err(ValidationError::Inactive("room"));
        }
    }
    Ok(())
}

/// Step-by-step builder for [`UnitResource`].
#[derive(Debug, Default)]
pub struct UnitResourceBuilder {
    branch_id: Option<BranchId>,
    unit_id: Option<UnitId>,
    room_id: Option<RoomId>,
    code: Option<String>,
    name: Option<String>,
    resource_type: Option<ResourceType>,
    state: Option<ResourceState>,
    reason: Option<String>,
    is_active: Option<bool>,
    is_schedulable: Option<bool>,
    created_by: Option<ActorId>,
    created_at: Option<Timestamp>,
}

impl UnitResourceBuilder {
    #[must_use]
    pub fn branch_id(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    #[must_use]
    pub fn unit_id(mut self, unit_id: UnitId) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    #[must_use]
    pub fn room_id(mut self, room_id: Option<RoomId>) -> Self {
        self.room_id = room_id;
        self
    }

    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    #[must_use]
    pub fn state(mut self, state: ResourceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Reason for a RESERVED/BLOCKED initial state, or for creating inactive.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    #[must_use]
    pub fn is_schedulable(mut self, is_schedulable: bool) -> Self {
        self.is_schedulable = Some(is_schedulable);
        self
    }

    #[must_use]
    pub fn created_by(mut self, actor: ActorId) -> Self {
        self.created_by = Some(actor);
        self
    }

    #[must_use]
    pub fn created_at(mut self, at: Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Consume the builder, validate, and return a [`UnitResource`].
    ///
    /// `is_active(false)` produces an INACTIVE resource carrying
    /// deactivation metadata.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] for a missing type, an invalid code,
    /// an empty name, an OCCUPIED/INACTIVE initial state, or a missing reason.
    pub fn build(self) -> Result<UnitResource, InfraError> {
        let resource_type = self.resource_type.ok_or(ValidationError::UnknownValue {
            field: "resource type",
            value: String::new(),
        })?;
        let code = code::segment(self.code.as_deref().unwrap_or_default())?;
        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let state = self.state.unwrap_or_default();
        if !state.is_valid_initial() {
            return Err(ValidationError::InvalidInitialState(state).into());
        }
        let reason = non_blank(self.reason.as_deref());
        if state.requires_reason() && reason.is_none() {
            return Err(ValidationError::ReasonRequired(reason_purpose(state)).into());
        }
        let created_at = self.created_at.unwrap_or_else(now);
        let is_active = self.is_active.unwrap_or(true);

        let mut resource = UnitResource {
            id: ResourceId::new(),
            branch_id: self.branch_id.unwrap_or_default(),
            unit_id: self.unit_id.unwrap_or_default(),
            room_id: self.room_id,
            code,
            name,
            resource_type,
            state,
            reserved_reason: reason.clone().filter(|_| state == ResourceState::Reserved),
            blocked_reason: reason.clone().filter(|_| state == ResourceState::Blocked),
            is_active,
            is_schedulable: self
                .is_schedulable
                .unwrap_or_else(|| resource_type.is_schedulable_by_default()),
            deactivated_at: None,
            deactivated_by: None,
            deactivation_reason: None,
            created_at,
            updated_at: created_at,
        };
        if !is_active {
            resource.state = ResourceState::Inactive;
            resource.reserved_reason = None;
            resource.blocked_reason = None;
            resource.deactivated_at = Some(created_at);
            resource.deactivated_by = self.created_by;
            resource.deactivation_reason =
                Some(reason.unwrap_or_else(|| "created inactive".to_string()));
        }
        Ok(resource)
    }
}
