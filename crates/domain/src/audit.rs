//! Audit records emitted once per successful mutation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{ActorId, BranchId};
use crate::scope::Scope;
use crate::time::{Timestamp, now};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    LocationCreate,
    LocationUpdate,
    DepartmentCreate,
    UnitTypeCreate,
    UnitCreate,
    UnitUpdate,
    UnitDeactivate,
    UnitDeleteHard,
    RoomCreate,
    ResourceCreate,
    ResourceStateUpdate,
    ResourceDeactivate,
    ResourceDeleteHard,
    ResourceReactivate,
    SchedCreate,
    SchedCancel,
    PolicyUpdate,
}

impl AuditAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocationCreate => "LOCATION_CREATE",
            Self::LocationUpdate => "LOCATION_UPDATE",
            Self::DepartmentCreate => "DEPARTMENT_CREATE",
            Self::UnitTypeCreate => "UNIT_TYPE_CREATE",
            Self::UnitCreate => "UNIT_CREATE",
            Self::UnitUpdate => "UNIT_UPDATE",
            Self::UnitDeactivate => "UNIT_DEACTIVATE",
            Self::UnitDeleteHard => "UNIT_DELETE_HARD",
            Self::RoomCreate => "ROOM_CREATE",
            Self::ResourceCreate => "RESOURCE_CREATE",
            Self::ResourceStateUpdate => "RESOURCE_STATE_UPDATE",
            Self::ResourceDeactivate => "RESOURCE_DEACTIVATE",
            Self::ResourceDeleteHard => "RESOURCE_DELETE_HARD",
            Self::ResourceReactivate => "RESOURCE_REACTIVATE",
            Self::SchedCreate => "SCHED_CREATE",
            Self::SchedCancel => "SCHED_CANCEL",
            Self::PolicyUpdate => "POLICY_UPDATE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub branch_id: BranchId,
    pub actor_id: ActorId,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: String,
    pub meta: serde_json::Value,
    pub at: Timestamp,
}

impl AuditRecord {
    #[must_use]
    pub fn new(
        scope: &Scope,
        action: AuditAction,
        entity: &str,
        entity_id: impl fmt::Display,
        meta: serde_json::Value,
    ) -> Self {
        Self {
            branch_id: scope.branch_id,
            actor_id: scope.actor_id,
            action,
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
            meta,
            at: now(),
        }
    }
}
