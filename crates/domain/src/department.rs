//! Department: an organisational owner of units, anchored to one or more
//! location subtrees.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::code;
use crate::error::{InfraError, ValidationError};
use crate::id::{BranchId, DepartmentId, LocationNodeId};
use crate::time::{Timestamp, now};

/// A location subtree a department occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentLocation {
    pub location_node_id: LocationNodeId,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub branch_id: BranchId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub locations: Vec<DepartmentLocation>,
    pub created_at: Timestamp,
}

impl Department {
    /// Create a builder for constructing a [`Department`].
    #[must_use]
    pub fn builder() -> DepartmentBuilder {
        DepartmentBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] when the name is empty or no
    /// location is attached.
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.locations.is_empty() {
            return Err(ValidationError::DepartmentWithoutLocation.into());
        }
        Ok(())
    }

    /// Whether one of the department's locations appears in `ancestors`
    /// (the ancestor set of a candidate unit location).
    #[must_use]
    pub fn covers(&self, ancestors: &HashSet<LocationNodeId>) -> bool {
        self.locations
            .iter()
            .any(|loc| ancestors.contains(&loc.location_node_id))
    }
}

/// Step-by-step builder for [`Department`].
#[derive(Debug, Default)]
pub struct DepartmentBuilder {
    branch_id: Option<BranchId>,
    code: Option<String>,
    name: Option<String>,
    locations: Vec<DepartmentLocation>,
    created_at: Option<Timestamp>,
}

impl DepartmentBuilder {
    #[must_use]
    pub fn branch_id(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
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
    pub fn location(mut self, location_node_id: LocationNodeId, is_primary: bool) -> Self {
        if !self
            .locations
            .iter()
            .any(|loc| loc.location_node_id == location_node_id)
        {
            self.locations.push(DepartmentLocation {
                location_node_id,
                is_primary,
            });
        }
        self
    }

    #[must_use]
    pub fn created_at(mut self, at: Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Consume the builder, validate, and return a [`Department`].
    ///
    /// When no location is flagged primary the first one becomes primary;
    /// when several are, only the first keeps the flag.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] for an invalid code, an empty name
    /// or an empty location list.
    pub fn build(mut self) -> Result<Department, InfraError> {
        let code = code::segment(self.code.as_deref().unwrap_or_default())?;
        let primary = self
            .locations
            .iter()
            .position(|loc| loc.is_primary)
            .unwrap_or(0);
        for (index, loc) in self.locations.iter_mut().enumerate() {
            loc.is_primary = index == primary;
        }
        let department = Department {
            id: DepartmentId::new(),
            branch_id: self.branch_id.unwrap_or_default(),
            code,
            name: self.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            is_active: true,
            locations: self.locations,
            created_at: self.created_at.unwrap_or_else(now),
        };
        department.validate()?;
        Ok(department)
    }
}
