//! Location revisions: effective-dated snapshots of a node's attributes.

use serde::{Deserialize, Serialize};

use crate::error::{InfraError, ValidationError};
use crate::id::{ActorId, LocationNodeId, LocationRevisionId};
use crate::location::LocationKind;
use crate::time::{EffectivePeriod, Timestamp, now};

/// Campus coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// # Errors
    ///
    /// Returns [`ValidationError::GpsOutOfRange`] outside ±90 / ±180.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::GpsOutOfRange);
        }
        Ok(Self { lat, lng })
    }

    /// Combine separately supplied coordinates: both or neither.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::IncompleteGps`] when only one is given.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Self>, ValidationError> {
        match (lat, lng) {
            (None, None) => Ok(None),
            (Some(lat), Some(lng)) => Self::new(lat, lng).map(Some),
            _ => Err(ValidationError::IncompleteGps),
        }
    }
}

/// Kind-specific and accessibility attributes of a revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAttributes {
    pub gps: Option<GeoPoint>,
    pub floor_number: Option<i32>,
    pub wheelchair_access: bool,
    pub stretcher_access: bool,
    pub emergency_exit: bool,
    pub fire_zone: Option<String>,
}

impl LocationAttributes {
    /// Reject attributes that belong to another kind.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MisplacedAttribute`] for GPS outside a
    /// campus or a floor number outside a floor.
    pub fn validate_for(&self, kind: LocationKind) -> Result<(), ValidationError> {
        if self.gps.is_some() && kind != LocationKind::Campus {
            return Err(ValidationError::MisplacedAttribute {
                attribute: "gps",
                allowed: LocationKind::Campus,
            });
        }
        if self.floor_number.is_some() && kind != LocationKind::Floor {
            return Err(ValidationError::MisplacedAttribute {
                attribute: "floor_number",
                allowed: LocationKind::Floor,
            });
        }
        Ok(())
    }

    /// Overlay the fields present in `patch`.
    #[must_use]
    pub fn apply(&self, patch: &AttributePatch) -> Self {
        Self {
            gps: patch.gps.or(self.gps),
            floor_number: patch.floor_number.or(self.floor_number),
            wheelchair_access: patch.wheelchair_access.unwrap_or(self.wheelchair_access),
            stretcher_access: patch.stretcher_access.unwrap_or(self.stretcher_access),
            emergency_exit: patch.emergency_exit.unwrap_or(self.emergency_exit),
            fire_zone: match &patch.fire_zone {
                Some(zone) => normalize_fire_zone(zone),
                None => self.fire_zone.clone(),
            },
        }
    }
}

/// Fire zones are free-form tags; blank means none.
#[must_use]
pub fn normalize_fire_zone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Partial attribute update carried by a revise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributePatch {
    pub gps: Option<GeoPoint>,
    pub floor_number: Option<i32>,
    pub wheelchair_access: Option<bool>,
    pub stretcher_access: Option<bool>,
    pub emergency_exit: Option<bool>,
    pub fire_zone: Option<String>,
}

/// One version of a node's mutable attributes, valid over [`EffectivePeriod`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRevision {
    pub id: LocationRevisionId,
    pub node_id: LocationNodeId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    #[serde(flatten)]
    pub period: EffectivePeriod,
    pub attributes: LocationAttributes,
    pub created_by: ActorId,
    pub created_at: Timestamp,
}

impl LocationRevision {
    /// Create a builder for constructing a [`LocationRevision`].
    #[must_use]
    pub fn builder() -> LocationRevisionBuilder {
        LocationRevisionBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] when the name or code is empty.
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.code.is_empty() {
            return Err(ValidationError::InvalidCode {
                value: self.code.clone(),
                reason: "code must not be empty",
            }
            .into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`LocationRevision`].
#[derive(Debug, Default)]
pub struct LocationRevisionBuilder {
    id: Option<LocationRevisionId>,
    node_id: Option<LocationNodeId>,
    code: Option<String>,
    name: Option<String>,
    is_active: Option<bool>,
    period: Option<EffectivePeriod>,
    attributes: LocationAttributes,
    created_by: Option<ActorId>,
    created_at: Option<Timestamp>,
}

impl LocationRevisionBuilder {
    #[must_use]
    pub fn id(mut self, id: LocationRevisionId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn node_id(mut self, node_id: LocationNodeId) -> Self {
        self.node_id = Some(node_id);
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
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    #[must_use]
    pub fn period(mut self, period: EffectivePeriod) -> Self {
        self.period = Some(period);
        self
    }

    #[must_use]
    pub fn attributes(mut self, attributes: LocationAttributes) -> Self {
        self.attributes = attributes;
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

    /// Consume the builder, validate, and return a [`LocationRevision`].
    ///
    /// Missing period defaults to open-ended from now.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Validation`] if the name or code is missing.
    pub fn build(self) -> Result<LocationRevision, InfraError> {
        let created_at = self.created_at.unwrap_or_else(now);
        let revision = LocationRevision {
            id: self.id.unwrap_or_default(),
            node_id: self.node_id.unwrap_or_default(),
            code: self.code.unwrap_or_default(),
            name: self.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
            period: self
                .period
                .unwrap_or_else(|| EffectivePeriod::starting(created_at)),
            attributes: self.attributes,
            created_by: self.created_by.unwrap_or_default(),
            created_at,
        };
        revision.validate()?;
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_active_open_ended_revision_by_default() {
        let revision = LocationRevision::builder()
            .code("C01")
            .name(" Main Campus ")
            .build()
            .unwrap();
        assert!(revision.is_active);
        assert!(revision.period.is_open_ended());
        assert_eq!(revision.name, "Main Campus");
    }

    #[test]
    fn should_return_validation_error_when_name_is_blank() {
        let result = LocationRevision::builder().code("C01").name("  ").build();
        assert!(matches!(
            result,
            Err(InfraError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_gps_outside_campus() {
        let attributes = LocationAttributes {
            gps: Some(GeoPoint::new(12.9, 77.6).unwrap()),
            ..LocationAttributes::default()
        };
        assert!(attributes.validate_for(LocationKind::Campus).is_ok());
        assert!(matches!(
            attributes.validate_for(LocationKind::Building),
            Err(ValidationError::MisplacedAttribute {
                attribute: "gps",
                ..
            })
        ));
    }

    #[test]
    fn should_reject_floor_number_outside_floor() {
        let attributes = LocationAttributes {
            floor_number: Some(3),
            ..LocationAttributes::default()
        };
        assert!(attributes.validate_for(LocationKind::Floor).is_ok());
        assert!(attributes.validate_for(LocationKind::Zone).is_err());
    }

    #[test]
    fn should_require_both_gps_parts() {
        assert_eq!(
            GeoPoint::from_parts(Some(1.0), None),
            Err(ValidationError::IncompleteGps)
        );
        assert_eq!(GeoPoint::from_parts(None, None), Ok(None));
        assert_eq!(
            GeoPoint::from_parts(Some(91.0), Some(0.0)),
            Err(ValidationError::GpsOutOfRange)
        );
    }

    #[test]
    fn should_carry_over_fields_missing_from_patch() {
        let current = LocationAttributes {
            floor_number: Some(2),
            wheelchair_access: true,
            fire_zone: Some("FZ-1".to_string()),
            ..LocationAttributes::default()
        };
        let patch = AttributePatch {
            stretcher_access: Some(true),
            fire_zone: Some("  ".to_string()),
            ..AttributePatch::default()
        };
        let next = current.apply(&patch);
        assert_eq!(next.floor_number, Some(2));
        assert!(next.wheelchair_access);
        assert!(next.stretcher_access);
        assert_eq!(next.fire_zone, None);
    }
}
