//! Registry service: departments, unit types, units, rooms and resources.

use medinfra_domain::audit::{AuditAction, AuditRecord};
use medinfra_domain::department::Department;
use medinfra_domain::error::{InfraError, NotFoundError, ValidationError};
use medinfra_domain::id::{DepartmentId, LocationNodeId, ResourceId, RoomId, UnitId, UnitTypeId};
use medinfra_domain::location::LocationKind;
use medinfra_domain::resource::{ResourceState, ResourceType, UnitResource, check_placement};
use medinfra_domain::scope::Scope;
use medinfra_domain::time::now;
use medinfra_domain::unit::{Room, Unit};
use medinfra_domain::unit_type::UnitTypeCatalog;

use crate::ports::{
    AuditSink, DepartmentRepository, LocationRepository, ResourceFilter, ResourceRepository,
    RoomRepository, UnitFilter, UnitRepository, UnitTypeRepository,
};
use crate::services::emit;
use crate::services::location_service::{active_location, ancestors_of};

/// Input for [`RegistryService::create_department`].
#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub code: String,
    pub name: String,
    /// Location subtrees the department occupies, with their primary flag.
    pub locations: Vec<(LocationNodeId, bool)>,
}

/// Input for [`RegistryService::create_unit_type`].
#[derive(Debug, Clone)]
pub struct NewUnitType {
    pub code: String,
    pub name: String,
    pub uses_rooms: bool,
    pub schedulable: bool,
    pub bed_based: bool,
}

/// Input for [`RegistryService::create_unit`].
#[derive(Debug, Clone)]
pub struct NewUnit {
    pub department_id: DepartmentId,
    pub unit_type_id: UnitTypeId,
    pub location_node_id: LocationNodeId,
    pub code: String,
    pub name: String,
}

/// Input for [`RegistryService::update_unit`].
#[derive(Debug, Clone, Default)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub location_node_id: Option<LocationNodeId>,
    /// Always rejected; deactivation has its own operation.
    pub is_active: Option<bool>,
}

/// Soft or hard removal request for units and resources.
#[derive(Debug, Clone, Default)]
pub struct Deactivation {
    pub hard: bool,
    pub reason: Option<String>,
}

/// What a deactivation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeactivationOutcome<T> {
    Deactivated(T),
    Deleted,
}

/// Input for [`RegistryService::create_room`].
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub code: String,
    pub name: String,
}

/// Input for [`RegistryService::create_resource`].
#[derive(Debug, Clone)]
pub struct NewResource {
    pub unit_id: UnitId,
    pub room_id: Option<RoomId>,
    pub code: String,
    pub name: String,
    pub resource_type: ResourceType,
    pub state: Option<ResourceState>,
    pub reason: Option<String>,
    pub is_active: Option<bool>,
    pub is_schedulable: Option<bool>,
}

/// Load a unit of the scope's branch; foreign units look missing.
pub(crate) async fn branch_unit<S: UnitRepository>(
    store: &S,
    scope: &Scope,
    id: UnitId,
) -> Result<Unit, InfraError> {
    let unit = store
        .get_unit(id)
        .await?
        .ok_or_else(|| NotFoundError::new("Unit", id))?;
    scope.ensure_owns(unit.branch_id, "Unit", id)?;
    Ok(unit)
}

/// Load a resource of the scope's branch; foreign resources look missing.
pub(crate) async fn branch_resource<S: ResourceRepository>(
    store: &S,
    scope: &Scope,
    id: ResourceId,
) -> Result<UnitResource, InfraError> {
    let resource = store
        .get_resource(id)
        .await?
        .ok_or_else(|| NotFoundError::new("UnitResource", id))?;
    scope.ensure_owns(resource.branch_id, "UnitResource", id)?;
    Ok(resource)
}

/// Application service for the unit and resource registry.
pub struct RegistryService<S, A> {
    store: S,
    audit: A,
}

impl<S, A> RegistryService<S, A>
where
    S: LocationRepository
        + DepartmentRepository
        + UnitTypeRepository
        + UnitRepository
        + RoomRepository
        + ResourceRepository
        + Send
        + Sync,
    A: AuditSink + Send + Sync,
{
    /// Create a new service backed by the given store and audit sink.
    pub fn new(store: S, audit: A) -> Self {
        Self { store, audit }
    }

    // Departments

    /// Create a department anchored to one or more active locations.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign location
    /// - [`InfraError::Validation`] for an inactive location, an invalid
    ///   code, an empty name or no location at all
    /// - [`InfraError::Conflict`] when the code is taken in the branch
    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_department(
        &self,
        scope: &Scope,
        input: NewDepartment,
    ) -> Result<Department, InfraError> {
        let at = now();
        let mut builder = Department::builder()
            .branch_id(scope.branch_id)
            .code(input.code)
            .name(input.name)
            .created_at(at);
        for (location_id, is_primary) in input.locations {
            active_location(&self.store, scope, location_id, at).await?;
            builder = builder.location(location_id, is_primary);
        }
        let department = self.store.create_department(builder.build()?).await?;
        tracing::info!(department_id = %department.id, code = %department.code, "department created");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::DepartmentCreate,
                "Department",
                department.id,
                serde_json::json!({ "code": department.code, "locations": department.locations }),
            ),
        )
        .await;
        Ok(department)
    }

    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_departments(&self, scope: &Scope) -> Result<Vec<Department>, InfraError> {
        self.store.list_departments(scope.branch_id).await
    }

    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] for a missing or foreign department.
    pub async fn get_department(&self, scope: &Scope, id: DepartmentId) -> Result<Department, InfraError> {
        let department = self
            .store
            .get_department(id)
            .await?
            .ok_or_else(|| NotFoundError::new("Department", id))?;
        scope.ensure_owns(department.branch_id, "Department", id)?;
        Ok(department)
    }

    // Unit types

    /// Add an entry to the global unit type catalog.
    ///
    /// # Errors
    ///
    /// - [`InfraError::Validation`] for an invalid code or empty name
    /// - [`InfraError::Conflict`] when the code is taken
    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_unit_type(
        &self,
        scope: &Scope,
        input: NewUnitType,
    ) -> Result<UnitTypeCatalog, InfraError> {
        let unit_type = UnitTypeCatalog::new(
            &input.code,
            &input.name,
            input.uses_rooms,
            input.schedulable,
            input.bed_based,
        )?;
        let unit_type = self.store.create_unit_type(unit_type).await?;
        tracing::info!(unit_type_id = %unit_type.id, code = %unit_type.code, "unit type created");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::UnitTypeCreate,
                "UnitType",
                unit_type.id,
                serde_json::json!({ "code": unit_type.code }),
            ),
        )
        .await;
        Ok(unit_type)
    }

    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_unit_types(&self) -> Result<Vec<UnitTypeCatalog>, InfraError> {
        self.store.list_unit_types().await
    }

    // Units

    /// A location a unit of `department` may sit at: active now, FLOOR or
    /// deeper, and inside one of the department's subtrees.
    async fn check_unit_location(
        &self,
        scope: &Scope,
        department: &Department,
        location_id: LocationNodeId,
    ) -> Result<(), InfraError> {
        let view = active_location(&self.store, scope, location_id, now()).await?;
        if view.node.kind.depth() < LocationKind::Floor.depth() {
            return Err(ValidationError::LocationTooShallow(view.node.kind).into());
        }
        let ancestors = ancestors_of(&self.store, scope.branch_id, location_id).await?;
        if !department.covers(&ancestors) {
            return Err(ValidationError::LocationOutsideDepartment.into());
        }
        Ok(())
    }

    /// Create a unit; capability flags come from its unit type.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign department, unit
    ///   type or location
    /// - [`InfraError::Validation`] for an inactive department, unit type or
    ///   location, a location above FLOOR or outside the department
    /// - [`InfraError::Conflict`] when the code (branch) or name (department)
    ///   is taken
    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_unit(&self, scope: &Scope, input: NewUnit) -> Result<Unit, InfraError> {
        let department = self.get_department(scope, input.department_id).await?;
        if !department.is_active {
            return Err(ValidationError::Inactive("department").into());
        }
        let unit_type = self
            .store
            .get_unit_type(input.unit_type_id)
            .await?
            .ok_or_else(|| NotFoundError::new("UnitType", input.unit_type_id))?;
        if !unit_type.is_active {
            return Err(ValidationError::Inactive("unit type").into());
        }
        self.check_unit_location(scope, &department, input.location_node_id)
            .await?;

        let unit = Unit::builder()
            .branch_id(scope.branch_id)
            .department_id(department.id)
            .unit_type(&unit_type)
            .location_node_id(input.location_node_id)
            .code(input.code)
            .name(input.name)
            .build()?;
        let unit = self.store.create_unit(unit).await?;
        tracing::info!(unit_id = %unit.id, code = %unit.code, unit_type = %unit_type.code, "unit created");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::UnitCreate,
                "Unit",
                unit.id,
                serde_json::json!({
                    "code": unit.code,
                    "departmentId": unit.department_id,
                    "unitTypeId": unit.unit_type_id,
                    "locationNodeId": unit.location_node_id,
                }),
            ),
        )
        .await;
        Ok(unit)
    }

    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_units(&self, scope: &Scope, filter: &UnitFilter) -> Result<Vec<Unit>, InfraError> {
        self.store.list_units(scope.branch_id, filter).await
    }

    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] for a missing or foreign unit.
    #[tracing::instrument(skip(self))]
    pub async fn get_unit(&self, scope: &Scope, id: UnitId) -> Result<Unit, InfraError> {
        branch_unit(&self.store, scope, id).await
    }

    /// Rename or move a unit.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ActiveFlagNotEditable`] when `is_active` is given
    /// - [`InfraError::Validation`] for an empty name or an invalid location
    /// - [`InfraError::Conflict`] when the new name is taken
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_unit(&self, scope: &Scope, id: UnitId, patch: UnitPatch) -> Result<Unit, InfraError> {
        if patch.is_active.is_some() {
            return Err(ValidationError::ActiveFlagNotEditable.into());
        }
        let mut unit = branch_unit(&self.store, scope, id).await?;
        if let Some(name) = patch.name {
            unit.name = name.trim().to_string();
        }
        if let Some(location_id) = patch.location_node_id {
            let department = self.get_department(scope, unit.department_id).await?;
            self.check_unit_location(scope, &department, location_id).await?;
            unit.location_node_id = location_id;
        }
        unit.validate()?;
        unit.updated_at = now();

        let unit = self.store.update_unit(unit).await?;
        tracing::info!(unit_id = %unit.id, "unit updated");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::UnitUpdate,
                "Unit",
                unit.id,
                serde_json::json!({ "name": unit.name, "locationNodeId": unit.location_node_id }),
            ),
        )
        .await;
        Ok(unit)
    }

    /// Soft-deactivate a unit with its rooms and resources, or hard-delete
    /// an empty one.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ReasonRequired`] for a soft request without reason
    /// - [`ValidationError::Inactive`] when already inactive
    /// - [`InfraError::Conflict`] while upcoming bookings or busy resources
    ///   exist (soft) or while rooms or resources exist (hard)
    #[tracing::instrument(skip(self, request), fields(hard = request.hard))]
    pub async fn deactivate_unit(
        &self,
        scope: &Scope,
        id: UnitId,
        request: Deactivation,
    ) -> Result<DeactivationOutcome<Unit>, InfraError> {
        let unit = branch_unit(&self.store, scope, id).await?;
        if request.hard {
            self.store.delete_unit_if_empty(id).await?;
            tracing::info!(unit_id = %id, "unit deleted");
            emit(
                &self.audit,
                AuditRecord::new(
                    scope,
                    AuditAction::UnitDeleteHard,
                    "Unit",
                    id,
                    serde_json::json!({ "code": unit.code }),
                ),
            )
            .await;
            return Ok(DeactivationOutcome::Deleted);
        }

        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(ValidationError::ReasonRequired("deactivate a unit"))?;
        if !unit.is_active {
            return Err(ValidationError::Inactive("unit").into());
        }
        let unit = self
            .store
            .deactivate_unit_cascade(id, reason, scope.actor_id, now())
            .await?;
        tracing::info!(unit_id = %id, reason, "unit deactivated");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::UnitDeactivate,
                "Unit",
                id,
                serde_json::json!({ "reason": reason }),
            ),
        )
        .await;
        Ok(DeactivationOutcome::Deactivated(unit))
    }

    // Rooms

    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign unit
    /// - [`InfraError::Validation`] when the unit is inactive or open-bay
    /// - [`InfraError::Conflict`] when the code is taken in the unit
    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_room(&self, scope: &Scope, unit_id: UnitId, input: NewRoom) -> Result<Room, InfraError> {
        let unit = branch_unit(&self.store, scope, unit_id).await?;
        let room = Room::new(&unit, &input.code, &input.name, now())?;
        let room = self.store.create_room(room).await?;
        tracing::info!(room_id = %room.id, unit_id = %unit_id, code = %room.code, "room created");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::RoomCreate,
                "Room",
                room.id,
                serde_json::json!({ "unitId": unit_id, "code": room.code }),
            ),
        )
        .await;
        Ok(room)
    }

    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] for a missing or foreign unit.
    pub async fn list_rooms(&self, scope: &Scope, unit_id: UnitId) -> Result<Vec<Room>, InfraError> {
        branch_unit(&self.store, scope, unit_id).await?;
        self.store.list_rooms(unit_id).await
    }

    // Resources

    /// Create a resource in a unit, optionally inside one of its rooms.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign unit or room
    /// - [`InfraError::Validation`] for an incompatible type, a room rule
    ///   violation, an inactive parent, an invalid initial state or a
    ///   missing reason
    /// - [`InfraError::Conflict`] when the code is taken in the unit
    #[tracing::instrument(skip(self, input), fields(code = %input.code, resource_type = %input.resource_type))]
    pub async fn create_resource(&self, scope: &Scope, input: NewResource) -> Result<UnitResource, InfraError> {
        let unit = branch_unit(&self.store, scope, input.unit_id).await?;
        let unit_type = self
            .store
            .get_unit_type(unit.unit_type_id)
            .await?
            .ok_or_else(|| NotFoundError::new("UnitType", unit.unit_type_id))?;
        let room = match input.room_id {
            Some(room_id) => {
                let room = self
                    .store
                    .get_room(room_id)
                    .await?
                    .ok_or_else(|| NotFoundError::new("Room", room_id))?;
                scope.ensure_owns(room.branch_id, "Room", room_id)?;
                Some(room)
            }
            None => None,
        };
        let is_active = input.is_active.unwrap_or(true);
        check_placement(
            input.resource_type,
            &unit,
            &unit_type.code,
            room.as_ref(),
            is_active,
        )?;

        let mut builder = UnitResource::builder()
            .branch_id(scope.branch_id)
            .unit_id(unit.id)
            .room_id(input.room_id)
            .code(input.code)
            .name(input.name)
            .resource_type(input.resource_type)
            .is_active(is_active)
            .created_by(scope.actor_id);
        if let Some(state) = input.state {
            builder = builder.state(state);
        }
        if let Some(reason) = input.reason {
            builder = builder.reason(reason);
        }
        if let Some(is_schedulable) = input.is_schedulable {
            builder = builder.is_schedulable(is_schedulable);
        }
        let resource = self.store.create_resource(builder.build()?).await?;
        tracing::info!(
            resource_id = %resource.id,
            unit_id = %unit.id,
            resource_type = %resource.resource_type,
            state = %resource.state,
            "resource created"
        );
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::ResourceCreate,
                "UnitResource",
                resource.id,
                serde_json::json!({
                    "unitId": resource.unit_id,
                    "roomId": resource.room_id,
                    "code": resource.code,
                    "resourceType": resource.resource_type,
                    "state": resource.state,
                }),
            ),
        )
        .await;
        Ok(resource)
    }

    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_resources(
        &self,
        scope: &Scope,
        filter: &ResourceFilter,
    ) -> Result<Vec<UnitResource>, InfraError> {
        self.store.list_resources(scope.branch_id, filter).await
    }

    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] for a missing or foreign resource.
    pub async fn get_resource(&self, scope: &Scope, id: ResourceId) -> Result<UnitResource, InfraError> {
        branch_resource(&self.store, scope, id).await
    }
}
