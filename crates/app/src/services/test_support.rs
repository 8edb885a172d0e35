//! In-memory port implementations shared by the service tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use medinfra_domain::audit::AuditRecord;
use medinfra_domain::booking::{BookingStatus, ProcedureBooking, check_bookable, find_conflict};
use medinfra_domain::department::Department;
use medinfra_domain::error::{ConflictError, InfraError, NotFoundError};
use medinfra_domain::id::{
    ActorId, BookingId, BranchId, DepartmentId, LocationNodeId, ResourceId, RoomId, UnitId,
    UnitTypeId,
};
use medinfra_domain::location::{LocationKind, LocationNode, LocationRevision, LocationView};
use medinfra_domain::policy::BranchPolicy;
use medinfra_domain::resource::{ResourceState, UnitResource};
use medinfra_domain::time::{EffectivePeriod, Timestamp};
use medinfra_domain::unit::{Room, Unit};
use medinfra_domain::unit_type::UnitTypeCatalog;

use crate::ports::{
    AuditSink, BookingFilter, BookingRepository, DepartmentRepository, LocationRepository,
    PolicyRepository, ResourceFilter, ResourceRepository, RoomRepository, Supersede, UnitFilter,
    UnitRepository, UnitTypeRepository,
};

#[derive(Default)]
struct State {
    nodes: HashMap<LocationNodeId, LocationNode>,
    revisions: Vec<LocationRevision>,
    departments: HashMap<DepartmentId, Department>,
    unit_types: HashMap<UnitTypeId, UnitTypeCatalog>,
    units: HashMap<UnitId, Unit>,
    rooms: HashMap<RoomId, Room>,
    resources: HashMap<ResourceId, UnitResource>,
    bookings: Vec<ProcedureBooking>,
    policies: HashMap<BranchId, BranchPolicy>,
}

impl State {
    fn code_holder(
        &self,
        branch_id: BranchId,
        code: &str,
        period: &EffectivePeriod,
        exclude: LocationNodeId,
    ) -> Option<LocationNodeId> {
        self.revisions
            .iter()
            .filter(|r| r.node_id != exclude && r.code == code && r.period.overlaps(period))
            .find(|r| {
                self.nodes
                    .get(&r.node_id)
                    .is_some_and(|n| n.branch_id == branch_id)
            })
            .map(|r| r.node_id)
    }

    fn duplicate(entity: &'static str, field: &'static str, value: &str) -> InfraError {
        ConflictError::Duplicate {
            entity,
            field,
            value: value.to_string(),
        }
        .into()
    }

    fn check_unit_unique(&self, unit: &Unit) -> Result<(), InfraError> {
        let others = self.units.values().filter(|u| u.id != unit.id);
        for other in others {
            if other.branch_id == unit.branch_id && other.code == unit.code {
                return Err(Self::duplicate("unit", "code", &unit.code));
            }
            if other.department_id == unit.department_id
                && Unit::name_key(&other.name) == Unit::name_key(&unit.name)
            {
                return Err(Self::duplicate("unit", "name", &unit.name));
            }
        }
        Ok(())
    }
}

/// Every storage port over one shared in-memory state.
#[derive(Clone, Default)]
pub(crate) struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }
}

impl LocationRepository for InMemoryStore {
    fn create_location(
        &self,
        node: LocationNode,
        revision: LocationRevision,
    ) -> impl Future<Output = Result<LocationView, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            if let Some(holder) =
                s.code_holder(node.branch_id, &revision.code, &revision.period, node.id)
            {
                return Err(ConflictError::DuplicateCode {
                    code: revision.code.clone(),
                    holder,
                }
                .into());
            }
            s.nodes.insert(node.id, node.clone());
            s.revisions.push(revision.clone());
            Ok(LocationView { node, revision })
        });
        async move { result }
    }

    fn revise_location(
        &self,
        node: &LocationNode,
        supersede: Option<Supersede>,
        revision: LocationRevision,
    ) -> impl Future<Output = Result<LocationRevision, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            if let Some(holder) =
                s.code_holder(node.branch_id, &revision.code, &revision.period, node.id)
            {
                return Err(ConflictError::DuplicateCode {
                    code: revision.code.clone(),
                    holder,
                }
                .into());
            }
            let closed = |r: &LocationRevision| match supersede {
                Some(sup) if sup.revision_id == r.id => EffectivePeriod {
                    effective_to: Some(sup.effective_to),
                    ..r.period
                },
                _ => r.period,
            };
            let overlapping = s
                .revisions
                .iter()
                .filter(|r| r.node_id == node.id)
                .any(|r| closed(r).overlaps(&revision.period));
            if overlapping {
                return Err(ConflictError::RevisionOverlap(node.id).into());
            }
            for r in s.revisions.iter_mut().filter(|r| r.node_id == node.id) {
                r.period = closed(r);
            }
            s.revisions.push(revision.clone());
            Ok(revision)
        });
        async move { result }
    }

    fn get_location_node(
        &self,
        id: LocationNodeId,
    ) -> impl Future<Output = Result<Option<LocationNode>, InfraError>> + Send {
        let result = self.with(|s| s.nodes.get(&id).cloned());
        async move { Ok(result) }
    }

    fn location_revision_at(
        &self,
        id: LocationNodeId,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<LocationRevision>, InfraError>> + Send {
        let result = self.with(|s| {
            s.revisions
                .iter()
                .find(|r| r.node_id == id && r.period.contains(at))
                .cloned()
        });
        async move { Ok(result) }
    }

    fn location_history(
        &self,
        id: LocationNodeId,
    ) -> impl Future<Output = Result<Vec<LocationRevision>, InfraError>> + Send {
        let mut result: Vec<LocationRevision> = self.with(|s| {
            s.revisions
                .iter()
                .filter(|r| r.node_id == id)
                .cloned()
                .collect()
        });
        result.sort_by_key(|r| r.period.effective_from);
        async move { Ok(result) }
    }

    fn locations_at(
        &self,
        branch_id: BranchId,
        at: Timestamp,
        kind: Option<LocationKind>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LocationView>, InfraError>> + Send {
        let mut result: Vec<LocationView> = self.with(|s| {
            s.revisions
                .iter()
                .filter(|r| r.period.contains(at))
                .filter_map(|r| {
                    let node = s.nodes.get(&r.node_id)?;
                    (node.branch_id == branch_id && kind.is_none_or(|k| node.kind == k)).then(
                        || LocationView {
                            node: node.clone(),
                            revision: r.clone(),
                        },
                    )
                })
                .collect()
        });
        result.sort_by(|a, b| a.revision.code.cmp(&b.revision.code));
        result.truncate(limit);
        async move { Ok(result) }
    }

    fn location_parents(
        &self,
        branch_id: BranchId,
    ) -> impl Future<Output = Result<Vec<(LocationNodeId, Option<LocationNodeId>)>, InfraError>> + Send
    {
        let result: Vec<_> = self.with(|s| {
            s.nodes
                .values()
                .filter(|n| n.branch_id == branch_id)
                .map(|n| (n.id, n.parent_id))
                .collect()
        });
        async move { Ok(result) }
    }
}

impl DepartmentRepository for InMemoryStore {
    fn create_department(
        &self,
        department: Department,
    ) -> impl Future<Output = Result<Department, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            let taken = s
                .departments
                .values()
                .any(|d| d.branch_id == department.branch_id && d.code == department.code);
            if taken {
                return Err(State::duplicate("department", "code", &department.code));
            }
            s.departments.insert(department.id, department.clone());
            Ok(department)
        });
        async move { result }
    }

    fn get_department(
        &self,
        id: DepartmentId,
    ) -> impl Future<Output = Result<Option<Department>, InfraError>> + Send {
        let result = self.with(|s| s.departments.get(&id).cloned());
        async move { Ok(result) }
    }

    fn list_departments(
        &self,
        branch_id: BranchId,
    ) -> impl Future<Output = Result<Vec<Department>, InfraError>> + Send {
        let mut result: Vec<Department> = self.with(|s| {
            s.departments
                .values()
                .filter(|d| d.branch_id == branch_id)
                .cloned()
                .collect()
        });
        result.sort_by(|a, b| a.code.cmp(&b.code));
        async move { Ok(result) }
    }
}

impl UnitTypeRepository for InMemoryStore {
    fn create_unit_type(
        &self,
        unit_type: UnitTypeCatalog,
    ) -> impl Future<Output = Result<UnitTypeCatalog, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            if s.unit_types.values().any(|t| t.code == unit_type.code) {
                return Err(State::duplicate("unit type", "code", &unit_type.code));
            }
            s.unit_types.insert(unit_type.id, unit_type.clone());
            Ok(unit_type)
        });
        async move { result }
    }

    fn get_unit_type(
        &self,
        id: UnitTypeId,
    ) -> impl Future<Output = Result<Option<UnitTypeCatalog>, InfraError>> + Send {
        let result = self.with(|s| s.unit_types.get(&id).cloned());
        async move { Ok(result) }
    }

    fn list_unit_types(&self) -> impl Future<Output = Result<Vec<UnitTypeCatalog>, InfraError>> + Send {
        let mut result: Vec<UnitTypeCatalog> = self.with(|s| s.unit_types.values().cloned().collect());
        result.sort_by(|a, b| a.code.cmp(&b.code));
        async move { Ok(result) }
    }
}

impl UnitRepository for InMemoryStore {
    fn create_unit(&self, unit: Unit) -> impl Future<Output = Result<Unit, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            s.check_unit_unique(&unit)?;
            s.units.insert(unit.id, unit.clone());
            Ok(unit)
        });
        async move { result }
    }

    fn update_unit(&self, unit: Unit) -> impl Future<Output = Result<Unit, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            if !s.units.contains_key(&unit.id) {
                return Err(NotFoundError::new("Unit", unit.id).into());
            }
            s.check_unit_unique(&unit)?;
            s.units.insert(unit.id, unit.clone());
            Ok(unit)
        });
        async move { result }
    }

    fn get_unit(&self, id: UnitId) -> impl Future<Output = Result<Option<Unit>, InfraError>> + Send {
        let result = self.with(|s| s.units.get(&id).cloned());
        async move { Ok(result) }
    }

    fn list_units(
        &self,
        branch_id: BranchId,
        filter: &UnitFilter,
    ) -> impl Future<Output = Result<Vec<Unit>, InfraError>> + Send {
        let mut result: Vec<Unit> = self.with(|s| {
            s.units
                .values()
                .filter(|u| u.branch_id == branch_id && filter.matches(u))
                .cloned()
                .collect()
        });
        result.sort_by(|a, b| a.code.cmp(&b.code));
        async move { Ok(result) }
    }

    fn deactivate_unit_cascade(
        &self,
        id: UnitId,
        reason: &str,
        actor: ActorId,
        at: Timestamp,
    ) -> impl Future<Output = Result<Unit, InfraError>> + Send {
        let reason = reason.to_string();
        let result: Result<_, InfraError> = self.with(|s| {
            let upcoming = s
                .bookings
                .iter()
                .any(|b| b.unit_id == id && b.is_scheduled() && b.window.end_at > at);
            if upcoming {
                return Err(ConflictError::HasDependants {
                    entity: "unit",
                    dependants: "upcoming scheduled bookings",
                }
                .into());
            }
            let busy = s
                .resources
                .values()
                .any(|r| r.unit_id == id && r.is_active && r.state.is_busy());
            if busy {
                return Err(ConflictError::HasDependants {
                    entity: "unit",
                    dependants: "reserved or occupied resources",
                }
                .into());
            }
            let unit = s
                .units
                .get_mut(&id)
                .ok_or_else(|| NotFoundError::new("Unit", id))?;
            unit.is_active = false;
            unit.deactivation_reason = Some(reason.clone());
            unit.deactivated_at = Some(at);
            unit.updated_at = at;
            let unit = unit.clone();
            for room in s.rooms.values_mut().filter(|r| r.unit_id == id) {
                room.is_active = false;
            }
            for resource in s
                .resources
                .values_mut()
                .filter(|r| r.unit_id == id && r.is_active)
            {
                resource.is_active = false;
                resource.state = ResourceState::Inactive;
                resource.reserved_reason = None;
                resource.blocked_reason = None;
                resource.deactivated_at = Some(at);
                resource.deactivated_by = Some(actor);
                resource.deactivation_reason = Some(reason.clone());
                resource.updated_at = at;
            }
            Ok(unit)
        });
        async move { result }
    }

    fn delete_unit_if_empty(&self, id: UnitId) -> impl Future<Output = Result<(), InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            let owns = s.rooms.values().any(|r| r.unit_id == id)
                || s.resources.values().any(|r| r.unit_id == id);
            if owns {
                return Err(ConflictError::HasDependants {
                    entity: "unit",
                    dependants: "rooms or resources",
                }
                .into());
            }
            s.units
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| NotFoundError::new("Unit", id).into())
        });
        async move { result }
    }
}

impl RoomRepository for InMemoryStore {
    fn create_room(&self, room: Room) -> impl Future<Output = Result<Room, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            let taken = s
                .rooms
                .values()
                .any(|r| r.unit_id == room.unit_id && r.code == room.code);
            if taken {
                return Err(State::duplicate("room", "code", &room.code));
            }
            s.rooms.insert(room.id, room.clone());
            Ok(room)
        });
        async move { result }
    }

    fn get_room(&self, id: RoomId) -> impl Future<Output = Result<Option<Room>, InfraError>> + Send {
        let result = self.with(|s| s.rooms.get(&id).cloned());
        async move { Ok(result) }
    }

    fn list_rooms(&self, unit_id: UnitId) -> impl Future<Output = Result<Vec<Room>, InfraError>> + Send {
        let mut result: Vec<Room> = self.with(|s| {
            s.rooms
                .values()
                .filter(|r| r.unit_id == unit_id)
                .cloned()
                .collect()
        });
        result.sort_by(|a, b| a.code.cmp(&b.code));
        async move { Ok(result) }
    }
}

impl ResourceRepository for InMemoryStore {
    fn create_resource(
        &self,
        resource: UnitResource,
    ) -> impl Future<Output = Result<UnitResource, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            let taken = s
                .resources
                .values()
                .any(|r| r.unit_id == resource.unit_id && r.code == resource.code);
            if taken {
                return Err(State::duplicate("resource", "code", &resource.code));
            }
            s.resources.insert(resource.id, resource.clone());
            Ok(resource)
        });
        async move { result }
    }

    fn get_resource(
        &self,
        id: ResourceId,
    ) -> impl Future<Output = Result<Option<UnitResource>, InfraError>> + Send {
        let result = self.with(|s| s.resources.get(&id).cloned());
        async move { Ok(result) }
    }

    fn list_resources(
        &self,
        branch_id: BranchId,
        filter: &ResourceFilter,
    ) -> impl Future<Output = Result<Vec<UnitResource>, InfraError>> + Send {
        let mut result: Vec<UnitResource> = self.with(|s| {
            s.resources
                .values()
                .filter(|r| r.branch_id == branch_id && filter.matches(r))
                .cloned()
                .collect()
        });
        result.sort_by(|a, b| a.code.cmp(&b.code));
        async move { Ok(result) }
    }

    fn save_resource_state(
        &self,
        resource: UnitResource,
        expected: ResourceState,
    ) -> impl Future<Output = Result<UnitResource, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| match s.resources.get_mut(&resource.id) {
            Some(stored) if stored.state == expected => {
                *stored = resource.clone();
                Ok(resource)
            }
            Some(_) => Err(ConflictError::StaleState(expected).into()),
            None => Err(NotFoundError::new("UnitResource", resource.id).into()),
        });
        async move { result }
    }

    fn delete_resource_if_unbooked(
        &self,
        id: ResourceId,
    ) -> impl Future<Output = Result<(), InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            if s.bookings.iter().any(|b| b.resource_id == id) {
                return Err(ConflictError::HasDependants {
                    entity: "resource",
                    dependants: "bookings",
                }
                .into());
            }
            s.resources
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| NotFoundError::new("UnitResource", id).into())
        });
        async move { result }
    }
}

impl BookingRepository for InMemoryStore {
    fn create_booking_if_free(
        &self,
        booking: ProcedureBooking,
    ) -> impl Future<Output = Result<ProcedureBooking, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| {
            let resource = s
                .resources
                .get(&booking.resource_id)
                .ok_or_else(|| NotFoundError::new("UnitResource", booking.resource_id))?;
            check_bookable(resource, booking.branch_id, booking.unit_id)?;
            if let Some(existing) = find_conflict(&s.bookings, booking.resource_id, &booking.window)
            {
                return Err(ConflictError::BookingOverlap(existing.id).into());
            }
            s.bookings.push(booking.clone());
            Ok(booking)
        });
        async move { result }
    }

    fn get_booking(
        &self,
        id: BookingId,
    ) -> impl Future<Output = Result<Option<ProcedureBooking>, InfraError>> + Send {
        let result = self.with(|s| s.bookings.iter().find(|b| b.id == id).cloned());
        async move { Ok(result) }
    }

    fn list_bookings(
        &self,
        branch_id: BranchId,
        filter: &BookingFilter,
    ) -> impl Future<Output = Result<Vec<ProcedureBooking>, InfraError>> + Send {
        let mut result: Vec<ProcedureBooking> = self.with(|s| {
            s.bookings
                .iter()
                .filter(|b| b.branch_id == branch_id && filter.matches(b))
                .cloned()
                .collect()
        });
        result.sort_by_key(|b| b.window.start_at);
        async move { Ok(result) }
    }

    fn cancel_booking(
        &self,
        booking: ProcedureBooking,
    ) -> impl Future<Output = Result<ProcedureBooking, InfraError>> + Send {
        let result: Result<_, InfraError> = self.with(|s| match s.bookings.iter_mut().find(|b| b.id == booking.id) {
            Some(stored) if stored.status == BookingStatus::Scheduled => {
                *stored = booking.clone();
                Ok(booking)
            }
            Some(stored) => Err(ConflictError::NotScheduled(stored.status).into()),
            None => Err(NotFoundError::new("ProcedureBooking", booking.id).into()),
        });
        async move { result }
    }
}

impl PolicyRepository for InMemoryStore {
    fn get_policy(
        &self,
        branch_id: BranchId,
    ) -> impl Future<Output = Result<Option<BranchPolicy>, InfraError>> + Send {
        let result = self.with(|s| s.policies.get(&branch_id).copied());
        async move { Ok(result) }
    }

    fn put_policy(
        &self,
        branch_id: BranchId,
        policy: BranchPolicy,
    ) -> impl Future<Output = Result<BranchPolicy, InfraError>> + Send {
        self.with(|s| s.policies.insert(branch_id, policy));
        async move { Ok(policy) }
    }
}

/// Audit sink that keeps every record for assertions.
#[derive(Clone, Default)]
pub(crate) struct RecordingAudit {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl RecordingAudit {
    pub(crate) fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, record: AuditRecord) -> impl Future<Output = Result<(), InfraError>> + Send {
        self.records.lock().unwrap().push(record);
        async { Ok(()) }
    }
}
