//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`InfraError`]
//! via `#[from]`.

use crate::booking::BookingStatus;
use crate::id::{BookingId, LocationNodeId};
use crate::location::LocationKind;
use crate::policy::PrecheckItem;
use crate::resource::{ResourceState, ResourceType};

/// Top-level error for every infrastructure operation.
#[derive(Debug, thiserror::Error)]
pub enum InfraError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Malformed input or a request the model can never accept as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("invalid code {value:?}: {reason}")]
    InvalidCode { value: String, reason: &'static str },

    #[error("unknown {field} {value:?}")]
    UnknownValue { field: &'static str, value: String },

    #[error("invalid identifier {0:?}")]
    InvalidId(String),

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("effective_to must be after effective_from")]
    InvalidPeriod,

    #[error("{kind} must not have a parent")]
    UnexpectedParent { kind: LocationKind },

    #[error("{kind} requires a {expected} parent")]
    MissingParent {
        kind: LocationKind,
        expected: LocationKind,
    },

    #[error("{kind} requires a {expected} parent, got {actual}")]
    ParentKindMismatch {
        kind: LocationKind,
        expected: LocationKind,
        actual: LocationKind,
    },

    #[error("{attribute} is only allowed on {allowed} nodes")]
    MisplacedAttribute {
        attribute: &'static str,
        allowed: LocationKind,
    },

    #[error("gps latitude and longitude must be provided together")]
    IncompleteGps,

    #[error("gps coordinates out of range")]
    GpsOutOfRange,

    #[error("location {0} has no revision effective at the requested instant")]
    NoEffectiveRevision(LocationNodeId),

    #[error("a new revision must start after the current revision's start")]
    RevisionNotAfterCurrent,

    #[error("location {0} is inactive")]
    LocationInactive(LocationNodeId),

    #[error("units must be placed at FLOOR level or deeper, got {0}")]
    LocationTooShallow(LocationKind),

    #[error("location is outside every location of the department")]
    LocationOutsideDepartment,

    #[error("department must reference at least one location")]
    DepartmentWithoutLocation,

    #[error("{0} is inactive")]
    Inactive(&'static str),

    #[error("unit does not use rooms")]
    RoomNotAllowed,

    #[error("a room is required for {0} in a room-based unit")]
    RoomRequired(ResourceType),

    #[error("room does not belong to the unit")]
    RoomOutsideUnit,

    #[error("resource type {resource_type} is not allowed in {unit_type} units")]
    ResourceTypeNotAllowed {
        resource_type: ResourceType,
        unit_type: String,
    },

    #[error("{0} is not a valid initial state")]
    InvalidInitialState(ResourceState),

    #[error("a reason is required to {0}")]
    ReasonRequired(&'static str),

    #[error("unit active flag is changed through deactivation only")]
    ActiveFlagNotEditable,

    #[error("resource is not schedulable")]
    NotSchedulable,

    #[error("start_at must be before end_at")]
    InvalidWindow,

    #[error("pre-check failed: {}", join_items(.0))]
    PrecheckFailed(Vec<PrecheckItem>),

    #[error("location tree exceeds {limit} nodes")]
    TreeTooLarge { limit: usize },
}

fn join_items(items: &[PrecheckItem]) -> String {
    items
        .iter()
        .map(|item| item.message())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The request is well-formed but contradicts the current state of the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConflictError {
    #[error("code {code} is already in use by location {holder} during the requested period")]
    DuplicateCode { code: String, holder: LocationNodeId },

    #[error("revision overlaps another revision of location {0}")]
    RevisionOverlap(LocationNodeId),

    #[error("{entity} with {field} {value:?} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("transition {from} -> {to} is not allowed")]
    TransitionNotAllowed {
        from: ResourceState,
        to: ResourceState,
    },

    #[error("housekeeping is required before {0} becomes AVAILABLE again")]
    HousekeepingRequired(ResourceType),

    #[error("resource is {0}, not AVAILABLE")]
    ResourceNotAvailable(ResourceState),

    #[error("resource cannot be deactivated while {0}")]
    ResourceBusy(ResourceState),

    #[error("resource is {0}, not INACTIVE")]
    NotInactive(ResourceState),

    #[error("resource state changed concurrently (expected {0})")]
    StaleState(ResourceState),

    #[error("time window overlaps booking {0}")]
    BookingOverlap(BookingId),

    #[error("booking is {0}, not SCHEDULED")]
    NotScheduled(BookingStatus),

    #[error("{entity} still has {dependants}")]
    HasDependants {
        entity: &'static str,
        dependants: &'static str,
    },
}

/// Missing entity, or one owned by another branch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

impl NotFoundError {
    /// Shorthand used by services when a lookup comes back empty.
    #[must_use]
    pub fn new(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self {
            entity,
            id: id.to_string(),
        }
    }
}
