//! Storage port: repository traits for persistence.
//!
//! Methods that guard an invariant across several rows (temporal code
//! uniqueness, booking overlap, cascades, compare-and-set transitions) are
//! single calls so that an adapter can run them inside one transaction.

use std::future::Future;

use medinfra_domain::booking::ProcedureBooking;
use medinfra_domain::department::Department;
use medinfra_domain::error::InfraError;
use medinfra_domain::id::{
    ActorId, BookingId, BranchId, DepartmentId, LocationNodeId, LocationRevisionId, ResourceId,
    RoomId, UnitId, UnitTypeId,
};
use medinfra_domain::location::{LocationKind, LocationNode, LocationRevision, LocationView};
use medinfra_domain::policy::BranchPolicy;
use medinfra_domain::resource::{ResourceState, ResourceType, UnitResource};
use medinfra_domain::time::Timestamp;
use medinfra_domain::unit::{Room, Unit};
use medinfra_domain::unit_type::UnitTypeCatalog;

/// Closing of the revision a revise supersedes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Supersede {
    pub revision_id: LocationRevisionId,
    pub effective_to: Timestamp,
}

/// Repository for location nodes and their revisions.
pub trait LocationRepository {
    /// Persist a node with its first revision.
    ///
    /// Fails with `ConflictError::DuplicateCode` when another node of the
    /// branch holds the same code during an overlapping period.
    fn create_location(
        &self,
        node: LocationNode,
        revision: LocationRevision,
    ) -> impl Future<Output = Result<LocationView, InfraError>> + Send;

    /// Append a revision, first closing the superseded one when given.
    ///
    /// Fails with `ConflictError::DuplicateCode` when another node holds the
    /// code, or `ConflictError::RevisionOverlap` when the node's own history
    /// would overlap the new period.
    fn revise_location(
        &self,
        node: &LocationNode,
        supersede: Option<Supersede>,
        revision: LocationRevision,
    ) -> impl Future<Output = Result<LocationRevision, InfraError>> + Send;

    fn get_location_node(
        &self,
        id: LocationNodeId,
    ) -> impl Future<Output = Result<Option<LocationNode>, InfraError>> + Send;

    /// The revision of `id` whose period contains `at`.
    fn location_revision_at(
        &self,
        id: LocationNodeId,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<LocationRevision>, InfraError>> + Send;

    /// Every revision of `id`, ordered by `effective_from`.
    fn location_history(
        &self,
        id: LocationNodeId,
    ) -> impl Future<Output = Result<Vec<LocationRevision>, InfraError>> + Send;

    /// Nodes of the branch joined with their revision effective at `at`,
    /// ordered by code and capped at `limit` rows.
    fn locations_at(
        &self,
        branch_id: BranchId,
        at: Timestamp,
        kind: Option<LocationKind>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LocationView>, InfraError>> + Send;

    /// `(node, parent)` pairs for every node of the branch.
    fn location_parents(
        &self,
        branch_id: BranchId,
    ) -> impl Future<Output = Result<Vec<(LocationNodeId, Option<LocationNodeId>)>, InfraError>> + Send;
}

/// Repository for [`Department`]s.
pub trait DepartmentRepository {
    /// Fails with `ConflictError::Duplicate` when the code is taken in the branch.
    fn create_department(
        &self,
        department: Department,
    ) -> impl Future<Output = Result<Department, InfraError>> + Send;

    fn get_department(
        &self,
        id: DepartmentId,
    ) -> impl Future<Output = Result<Option<Department>, InfraError>> + Send;

    fn list_departments(
        &self,
        branch_id: BranchId,
    ) -> impl Future<Output = Result<Vec<Department>, InfraError>> + Send;
}

/// Repository for the global [`UnitTypeCatalog`].
pub trait UnitTypeRepository {
    /// Fails with `ConflictError::Duplicate` when the code is taken.
    fn create_unit_type(
        &self,
        unit_type: UnitTypeCatalog,
    ) -> impl Future<Output = Result<UnitTypeCatalog, InfraError>> + Send;

    fn get_unit_type(
        &self,
        id: UnitTypeId,
    ) -> impl Future<Output = Result<Option<UnitTypeCatalog>, InfraError>> + Send;

    fn list_unit_types(&self) -> impl Future<Output = Result<Vec<UnitTypeCatalog>, InfraError>> + Send;
}

/// Unit listing filters. Inactive units are skipped unless asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFilter {
    pub department_id: Option<DepartmentId>,
    pub unit_type_id: Option<UnitTypeId>,
    pub location_node_id: Option<LocationNodeId>,
    pub include_inactive: bool,
}

impl UnitFilter {
    #[must_use]
    pub fn matches(&self, unit: &Unit) -> bool {
        self.department_id.is_none_or(|id| unit.department_id == id)
            && self.unit_type_id.is_none_or(|id| unit.unit_type_id == id)
            && self.location_node_id.is_none_or(|id| unit.location_node_id == id)
            && (self.include_inactive || unit.is_active)
    }
}

/// Repository for [`Unit`]s.
pub trait UnitRepository {
    /// Fails with `ConflictError::Duplicate` when the code is taken in the
    /// branch or the name (case-insensitively) in the department.
    fn create_unit(&self, unit: Unit) -> impl Future<Output = Result<Unit, InfraError>> + Send;

    /// Same uniqueness rules as [`create_unit`](Self::create_unit).
    fn update_unit(&self, unit: Unit) -> impl Future<Output = Result<Unit, InfraError>> + Send;

    fn get_unit(&self, id: UnitId) -> impl Future<Output = Result<Option<Unit>, InfraError>> + Send;

    fn list_units(
        &self,
        branch_id: BranchId,
        filter: &UnitFilter,
    ) -> impl Future<Output = Result<Vec<Unit>, InfraError>> + Send;

    /// Deactivate a unit with its rooms and resources in one unit of work.
    ///
    /// Fails with `ConflictError::HasDependants` while a SCHEDULED booking of
    /// the unit ends after `at`, or an active resource is RESERVED/OCCUPIED.
    fn deactivate_unit_cascade(
        &self,
        id: UnitId,
        reason: &str,
        actor: ActorId,
        at: Timestamp,
    ) -> impl Future<Output = Result<Unit, InfraError>> + Send;

    /// Delete a unit that owns no rooms and no resources.
    fn delete_unit_if_empty(&self, id: UnitId) -> impl Future<Output = Result<(), InfraError>> + Send;
}

/// Repository for [`Room`]s.
pub trait RoomRepository {
    /// Fails with `ConflictError::Duplicate` when the code is taken in the unit.
    fn create_room(&self, room: Room) -> impl Future<Output = Result<Room, InfraError>> + Send;

    fn get_room(&self, id: RoomId) -> impl Future<Output = Result<Option<Room>, InfraError>> + Send;

    fn list_rooms(&self, unit_id: UnitId) -> impl Future<Output = Result<Vec<Room>, InfraError>> + Send;
}

/// Resource listing filters. Inactive resources are skipped unless asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    pub unit_id: Option<UnitId>,
    pub room_id: Option<RoomId>,
    pub resource_type: Option<ResourceType>,
    pub state: Option<ResourceState>,
    pub include_inactive: bool,
}

impl ResourceFilter {
    #[must_use]
    pub fn matches(&self, resource: &UnitResource) -> bool {
        self.unit_id.is_none_or(|id| resource.unit_id == id)
            && self.room_id.is_none_or(|id| resource.room_id == Some(id))
            && self.resource_type.is_none_or(|t| resource.resource_type == t)
            && self.state.is_none_or(|s| resource.state == s)
            && (self.include_inactive || resource.is_active)
    }
}

/// Repository for [`UnitResource`]s.
pub trait ResourceRepository {
    /// Fails with `ConflictError::Duplicate` when the code is taken in the unit.
    fn create_resource(
        &self,
        resource: UnitResource,
    ) -> impl Future<Output = Result<UnitResource, InfraError>> + Send;

    fn get_resource(
        &self,
        id: ResourceId,
    ) -> impl Future<Output = Result<Option<UnitResource>, InfraError>> + Send;

    fn list_resources(
        &self,
        branch_id: BranchId,
        filter: &ResourceFilter,
    ) -> impl Future<Output = Result<Vec<UnitResource>, InfraError>> + Send;

    /// Write `resource` only if the stored state still equals `expected`.
    ///
    /// Fails with `ConflictError::StaleState` otherwise.
    fn save_resource_state(
        &self,
        resource: UnitResource,
        expected: ResourceState,
    ) -> impl Future<Output = Result<UnitResource, InfraError>> + Send;

    /// Delete a resource no booking has ever referenced.
    fn delete_resource_if_unbooked(
        &self,
        id: ResourceId,
    ) -> impl Future<Output = Result<(), InfraError>> + Send;
}

/// Booking listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub unit_id: Option<UnitId>,
    pub resource_id: Option<ResourceId>,
    /// Only bookings starting at or after this instant.
    pub from: Option<Timestamp>,
    /// Only bookings ending at or before this instant.
    pub to: Option<Timestamp>,
}

impl BookingFilter {
    #[must_use]
    pub fn matches(&self, booking: &ProcedureBooking) -> bool {
        self.unit_id.is_none_or(|id| booking.unit_id == id)
            && self.resource_id.is_none_or(|id| booking.resource_id == id)
            && self.from.is_none_or(|from| booking.window.start_at >= from)
            && self.to.is_none_or(|to| booking.window.end_at <= to)
    }
}

/// Repository for [`ProcedureBooking`]s.
pub trait BookingRepository {
    /// Insert a booking after, in the same unit of work, locking its
    /// resource, re-checking that the resource is active, schedulable and
    /// AVAILABLE, and that no SCHEDULED booking overlaps the window.
    fn create_booking_if_free(
        &self,
        booking: ProcedureBooking,
    ) -> impl Future<Output = Result<ProcedureBooking, InfraError>> + Send;

    fn get_booking(
        &self,
        id: BookingId,
    ) -> impl Future<Output = Result<Option<ProcedureBooking>, InfraError>> + Send;

    /// Bookings of the branch ordered by start.
    fn list_bookings(
        &self,
        branch_id: BranchId,
        filter: &BookingFilter,
    ) -> impl Future<Output = Result<Vec<ProcedureBooking>, InfraError>> + Send;

    /// Store the cancelled booking only if it is still SCHEDULED.
    ///
    /// Fails with `ConflictError::NotScheduled` otherwise.
    fn cancel_booking(
        &self,
        booking: ProcedureBooking,
    ) -> impl Future<Output = Result<ProcedureBooking, InfraError>> + Send;
}

/// Repository for per-branch [`BranchPolicy`].
pub trait PolicyRepository {
    fn get_policy(
        &self,
        branch_id: BranchId,
    ) -> impl Future<Output = Result<Option<BranchPolicy>, InfraError>> + Send;

    fn put_policy(
        &self,
        branch_id: BranchId,
        policy: BranchPolicy,
    ) -> impl Future<Output = Result<BranchPolicy, InfraError>> + Send;
}

/// Every repository behind one cloneable handle.
pub trait Store:
    LocationRepository
    + DepartmentRepository
    + UnitTypeRepository
    + UnitRepository
    + RoomRepository
    + ResourceRepository
    + BookingRepository
    + PolicyRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> Store for T where
    T: LocationRepository
        + DepartmentRepository
        + UnitTypeRepository
        + UnitRepository
        + RoomRepository
        + ResourceRepository
        + BookingRepository
        + PolicyRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
