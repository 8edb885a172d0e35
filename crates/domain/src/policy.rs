//! Branch policy: per-branch overlays on the resource state machine and the
//! scheduling pre-checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::resource::{ResourceState, ResourceType};

/// How a failed pre-check is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrecheckMode {
    #[default]
    Block,
    Warn,
}

impl PrecheckMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "BLOCK",
            Self::Warn => "WARN",
        }
    }
}

impl fmt::Display for PrecheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrecheckMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLOCK" => Ok(Self::Block),
            "WARN" => Ok(Self::Warn),
            _ => Err(ValidationError::UnknownValue {
                field: "precheck mode",
                value: s.to_string(),
            }),
        }
    }
}

/// One of the pre-procedure checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrecheckItem {
    Consent,
    Anesthesia,
    Checklist,
}

impl PrecheckItem {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Consent => "consent is not recorded",
            Self::Anesthesia => "anesthesia clearance is not recorded",
            Self::Checklist => "surgical safety checklist is not complete",
        }
    }
}

/// Flags supplied with a booking request, stored verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckFlags {
    pub consent_ok: bool,
    pub anesthesia_ok: bool,
    pub checklist_ok: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckPolicy {
    pub consent: PrecheckMode,
    pub anesthesia: PrecheckMode,
    pub checklist: PrecheckMode,
}

impl PrecheckPolicy {
    /// Evaluate `flags`, returning WARN-mode violations as warnings.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PrecheckFailed`] listing every BLOCK-mode
    /// violation when there is at least one.
    pub fn evaluate(&self, flags: PrecheckFlags) -> Result<Vec<PrecheckItem>, ValidationError> {
        let checks = [
            (PrecheckItem::Consent, self.consent, flags.consent_ok),
            (PrecheckItem::Anesthesia, self.anesthesia, flags.anesthesia_ok),
            (PrecheckItem::Checklist, self.checklist, flags.checklist_ok),
        ];
        let mut blocking = Vec::new();
        let mut warnings = Vec::new();
        for (item, mode, ok) in checks {
            match (ok, mode) {
                (true, _) => {}
                (false, PrecheckMode::Block) => blocking.push(item),
                (false, PrecheckMode::Warn) => warnings.push(item),
            }
        }
        if blocking.is_empty() {
            Ok(warnings)
        } else {
            Err(ValidationError::PrecheckFailed(blocking))
        }
    }
}

/// Policy in force for one branch. A branch without a stored policy uses
/// [`BranchPolicy::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPolicy {
    pub housekeeping_gate_enabled: bool,
    pub precheck: PrecheckPolicy,
}

impl Default for BranchPolicy {
    fn default() -> Self {
        Self {
            housekeeping_gate_enabled: true,
            precheck: PrecheckPolicy::default(),
        }
    }
}

impl BranchPolicy {
    /// Whether the housekeeping gate forbids `from -> to` for this type.
    #[must_use]
    pub fn housekeeping_blocks(
        &self,
        resource_type: ResourceType,
        from: ResourceState,
        to: ResourceState,
    ) -> bool {
        self.housekeeping_gate_enabled
            && resource_type.is_bed_like()
            && from == ResourceState::Occupied
            && to == ResourceState::Available
    }
}
