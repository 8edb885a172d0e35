//! Unit type catalog: the global list of unit kinds (ICU, OT, OPD, …) and
//! the capabilities units inherit from them.

use serde::{Deserialize, Serialize};

use crate::error::{InfraError, ValidationError};
use crate::id::UnitTypeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTypeCatalog {
    pub id: UnitTypeId,
    pub code: String,
    pub name: String,
    pub uses_rooms: bool,
    pub schedulable: bool,
    pub bed_based: bool,
    pub is_active: bool,
}

/// Unit type codes keep underscores (`RAD_CT`, `IPD_GEN`).
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

impl UnitTypeCatalog {
    /// Build an active catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] when the code or name is empty or
    /// the code contains anything other than `A-Z`, `0-9` and `_`.
    pub fn new(
        code: &str,
        name: &str,
        uses_rooms: bool,
        schedulable: bool,
        bed_based: bool,
    ) -> Result<Self, InfraError> {
        let normalized = normalize_code(code);
        if normalized.is_empty()
            || !normalized
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ValidationError::InvalidCode {
                value: code.to_string(),
                reason: "unit type codes use letters, digits and underscores",
            }
            .into());
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(Self {
            id: UnitTypeId::new(),
            code: normalized,
            name: name.to_string(),
            uses_rooms,
            schedulable,
            bed_based,
            is_active: true,
        })
    }
}
