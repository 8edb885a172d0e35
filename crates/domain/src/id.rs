//! Typed identifier newtypes backed by UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Hospital branch. Every operation is scoped to exactly one.
    BranchId
);

define_id!(
    /// Already-authenticated caller, recorded on writes and audit records.
    ActorId
);

define_id!(
    /// Stable identity of a [`LocationNode`](crate::location::LocationNode).
    LocationNodeId
);

define_id!(
    /// One [`LocationRevision`](crate::location::LocationRevision) of a node.
    LocationRevisionId
);

define_id!(
    /// Unique identifier for a [`Department`](crate::department::Department).
    DepartmentId
);

define_id!(
    /// Unique identifier for a [`UnitTypeCatalog`](crate::unit_type::UnitTypeCatalog) entry.
    UnitTypeId
);

define_id!(
    /// Unique identifier for a [`Unit`](crate::unit::Unit).
    UnitId
);

define_id!(
    /// Unique identifier for a [`Room`](crate::unit::Room).
    RoomId
);

define_id!(
    /// Unique identifier for a [`UnitResource`](crate::resource::UnitResource).
    ResourceId
);

define_id!(
    /// Unique identifier for a [`ProcedureBooking`](crate::booking::ProcedureBooking).
    BookingId
);
