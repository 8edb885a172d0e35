//! Units (wards, theatres, clinics) and the rooms they own.

use serde::{Deserialize, Serialize};

use crate::code;
use crate::error::{InfraError, ValidationError};
use crate::id::{BranchId, DepartmentId, LocationNodeId, RoomId, UnitId, UnitTypeId};
use crate::time::{Timestamp, now};
use crate::unit_type::UnitTypeCatalog;

/// A clinical or operational unit placed at FLOOR level or deeper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub branch_id: BranchId,
    pub department_id: DepartmentId,
    pub unit_type_id: UnitTypeId,
    pub location_node_id: LocationNodeId,
    pub code: String,
    pub name: String,
    pub uses_rooms: bool,
    pub schedulable: bool,
    pub bed_based: bool,
    pub is_active: bool,
    pub deactivation_reason: Option<String>,
    pub deactivated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Unit {
    /// Create a builder for constructing a [`Unit`].
    #[must_use]
    pub fn builder() -> UnitBuilder {
        UnitBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] when the name is empty.
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Key used for the case-insensitive name uniqueness within a department.
    #[must_use]
    pub fn name_key(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

/// Step-by-step builder for [`Unit`].
#[derive(Debug, Default)]
pub struct UnitBuilder {
    branch_id: Option<BranchId>,
    department_id: Option<DepartmentId>,
    unit_type: Option<(UnitTypeId, bool, bool, bool)>,
    location_node_id: Option<LocationNodeId>,
    code: Option<String>,
    name: Option<String>,
    created_at: Option<Timestamp>,
}

impl UnitBuilder {
    #[must_use]
    pub fn branch_id(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    #[must_use]
    pub fn department_id(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Capability flags are copied from the catalog entry.
    #[must_use]
    pub fn unit_type(mut self, unit_type: &UnitTypeCatalog) -> Self {
        self.unit_type = Some((
            unit_type.id,
            unit_type.uses_rooms,
            unit_type.schedulable,
            unit_type.bed_based,
        ));
        self
    }

    #[must_use]
    pub fn location_node_id(mut self, location_node_id: LocationNodeId) -> Self {
        self.location_node_id = Some(location_node_id);
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
    pub fn created_at(mut self, at: Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Consume the builder, validate, and return an active [`Unit`].
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] for an invalid code or empty name.
    pub fn build(self) -> Result<Unit, InfraError> {
        let code = code::segment(self.code.as_deref().unwrap_or_default())?;
        let (unit_type_id, uses_rooms, schedulable, bed_based) = self
            .unit_type
            .unwrap_or((UnitTypeId::default(), false, false, false));
        let created_at = self.created_at.unwrap_or_else(now);
        let unit = Unit {
            id: UnitId::new(),
            branch_id: self.branch_id.unwrap_or_default(),
            department_id: self.department_id.unwrap_or_default(),
            unit_type_id,
            location_node_id: self.location_node_id.unwrap_or_default(),
            code,
            name: self.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            uses_rooms,
            schedulable,
            bed_based,
            is_active: true,
            deactivation_reason: None,
            deactivated_at: None,
            created_at,
            updated_at: created_at,
        };
        unit.validate()?;
        Ok(unit)
    }
}

/// A room inside a room-based unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub branch_id: BranchId,
    pub unit_id: UnitId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl Room {
    /// Create an active room in `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] when the unit is inactive or does
    /// not use rooms, the code is invalid or the name is empty.
    pub fn new(unit: &Unit, code: &str, name: &str, created_at: Timestamp) -> Result<Self, InfraError> {
        if !unit.is_active {
            return Err(ValidationError::Inactive("unit").into());
        }
        if !unit.uses_rooms {
            return Err(ValidationError::RoomNotAllowed.into());
        }
        let code = code::segment(code)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(Self {
            id: RoomId::new(),
            branch_id: unit.branch_id,
            unit_id: unit.id,
            code,
            name: name.to_string(),
            is_active: true,
            created_at,
        })
    }
}
