//! Resource types, their classifications and unit-type compatibility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Bed,
    GeneralBed,
    IcuBed,
    NicuIncubator,
    Incubator,
    Crib,
    Trolley,
    Stretcher,
    WheelchairPosition,
    OtTable,
    ProcedureTable,
    ExaminationTable,
    DialysisStation,
    ChemotherapyChair,
    ProcedureChair,
    RecoveryBay,
    DentalChair,
    Bay,
    Chair,
    XrayMachineSlot,
    CtScannerSlot,
    MriScannerSlot,
    UsgMachineSlot,
    EcgMachineSlot,
    EchoMachineSlot,
    SampleCollectionCounter,
    ConsultationSlot,
    ExamSlot,
}

/// Coarse grouping used for listings and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceCategory {
    Bed,
    Procedure,
    Diagnostic,
    Consultation,
    Other,
}

impl ResourceType {
    pub const ALL: [Self; 28] = [
        Self::Bed,
        Self::GeneralBed,
        Self::IcuBed,
        Self::NicuIncubator,
        Self::Incubator,
        Self::Crib,
        Self::Trolley,
        Self::Stretcher,
        Self::WheelchairPosition,
        Self::OtTable,
        Self::ProcedureTable,
        Self::ExaminationTable,
        Self::DialysisStation,
        Self::ChemotherapyChair,
        Self::ProcedureChair,
        Self::RecoveryBay,
        Self::DentalChair,
        Self::Bay,
        Self::Chair,
        Self::XrayMachineSlot,
        Self::CtScannerSlot,
        Self::MriScannerSlot,
        Self::UsgMachineSlot,
        Self::EcgMachineSlot,
        Self::EchoMachineSlot,
        Self::SampleCollectionCounter,
        Self::ConsultationSlot,
        Self::ExamSlot,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bed => "BED",
            Self::GeneralBed => "GENERAL_BED",
            Self::IcuBed => "ICU_BED",
            Self::NicuIncubator => "NICU_INCUBATOR",
            Self::Incubator => "INCUBATOR",
            Self::Crib => "CRIB",
            Self::Trolley => "TROLLEY",
            Self::Stretcher => "STRETCHER",
            Self::WheelchairPosition => "WHEELCHAIR_POSITION",
            Self::OtTable => "OT_TABLE",
            Self::ProcedureTable => "PROCEDURE_TABLE",
            Self::ExaminationTable => "EXAMINATION_TABLE",
            Self::DialysisStation => "DIALYSIS_STATION",
            Self::ChemotherapyChair => "CHEMOTHERAPY_CHAIR",
            Self::ProcedureChair => "PROCEDURE_CHAIR",
            Self::RecoveryBay => "RECOVERY_BAY",
            Self::DentalChair => "DENTAL_CHAIR",
            Self::Bay => "BAY",
            Self::Chair => "CHAIR",
            Self::XrayMachineSlot => "XRAY_MACHINE_SLOT",
            Self::CtScannerSlot => "CT_SCANNER_SLOT",
            Self::MriScannerSlot => "MRI_SCANNER_SLOT",
            Self::UsgMachineSlot => "USG_MACHINE_SLOT",
            Self::EcgMachineSlot => "ECG_MACHINE_SLOT",
            Self::EchoMachineSlot => "ECHO_MACHINE_SLOT",
            Self::SampleCollectionCounter => "SAMPLE_COLLECTION_COUNTER",
            Self::ConsultationSlot => "CONSULTATION_SLOT",
            Self::ExamSlot => "EXAM_SLOT",
        }
    }

    /// Beds, incubators and cribs: subject to the housekeeping gate.
    #[must_use]
    pub fn is_bed_like(self) -> bool {
        matches!(
            self,
            Self::Bed
                | Self::GeneralBed
                | Self::IcuBed
                | Self::NicuIncubator
                | Self::Incubator
                | Self::Crib
        )
    }

    /// Mobile resources go anywhere and never need a room.
    #[must_use]
    pub fn is_mobile(self) -> bool {
        matches!(
            self,
            Self::Trolley | Self::Stretcher | Self::WheelchairPosition
        )
    }

    /// Slots and collection counters are bookable unless told otherwise.
    #[must_use]
    pub fn is_schedulable_by_default(self) -> bool {
        self == Self::SampleCollectionCounter || self.as_str().ends_with("_SLOT")
    }

    #[must_use]
    pub fn category(self) -> ResourceCategory {
        if self.is_bed_like() || self.is_mobile() {
            return ResourceCategory::Bed;
        }
        match self {
            Self::ConsultationSlot | Self::ExamSlot => ResourceCategory::Consultation,
            Self::OtTable
            | Self::ProcedureTable
            | Self::ExaminationTable
            | Self::DialysisStation
            | Self::ChemotherapyChair
            | Self::ProcedureChair
            | Self::RecoveryBay
            | Self::DentalChair
            | Self::Bay
            | Self::Chair => ResourceCategory::Procedure,
            other if other.is_schedulable_by_default() => ResourceCategory::Diagnostic,
            _ => ResourceCategory::Other,
        }
    }

    /// Whether this type may be placed in a unit of the given type code.
    ///
    /// Unknown unit type codes impose no restriction.
    #[must_use]
    pub fn is_allowed_in(self, unit_type_code: &str) -> bool {
        if self.is_mobile() {
            return true;
        }
        allowed_for_unit_type(unit_type_code).is_none_or(|allowed| allowed.contains(&self))
    }
}

fn allowed_for_unit_type(code: &str) -> Option<&'static [ResourceType]> {
    use ResourceType as T;

    let code = code.trim().to_ascii_uppercase();
    let allowed: &'static [ResourceType] = match code.as_str() {
        "ICU" | "ICCU" | "HDU" | "NICU" | "PICU" => &[
            T::IcuBed,
            T::GeneralBed,
            T::Bed,
            T::Bay,
            T::RecoveryBay,
            T::NicuIncubator,
            T::Incubator,
            T::Crib,
        ],
        "IPD_GEN" | "IPD_SEMI" | "IPD_PVT" => &[
            T::GeneralBed,
            T::Bed,
            T::Bay,
            T::Chair,
            T::ProcedureChair,
            T::RecoveryBay,
        ],
        "OT" | "ENDO" | "CATH_LAB" => &[
            T::OtTable,
            T::ProcedureTable,
            T::ExaminationTable,
            T::RecoveryBay,
            T::Bay,
        ],
        "DIALYSIS" => &[
            T::DialysisStation,
            T::Chair,
            T::ProcedureChair,
            T::GeneralBed,
            T::Bed,
        ],
        "OPD" | "ER" | "TRIAGE" => &[
            T::ConsultationSlot,
            T::ExamSlot,
            T::Chair,
            T::ProcedureTable,
            T::ExaminationTable,
            T::Bay,
        ],
        "DAYCARE" | "CHEMO" => &[
            T::ChemotherapyChair,
            T::Chair,
            T::ProcedureChair,
            T::GeneralBed,
            T::Bed,
            T::Bay,
            T::ProcedureTable,
        ],
        other if other.starts_with("RAD_") => &[
            T::XrayMachineSlot,
            T::CtScannerSlot,
            T::MriScannerSlot,
            T::UsgMachineSlot,
            T::EcgMachineSlot,
            T::EchoMachineSlot,
            T::SampleCollectionCounter,
            T::ExamSlot,
        ],
        _ => return None,
    };
    Some(allowed)
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "resource type",
                value: s.to_string(),
            })
    }
}
