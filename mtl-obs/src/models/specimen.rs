//! One concrete cube (or core) under test

use super::lenient_text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One physical test specimen
///
/// Serialized with the row keys the report and graph stages read
/// (`cubeId`, `length`, `breadth`, ...). `area_mm2` and `density_kg_m3` are
/// derived; there is no `RowField` for them, so they can only change through
/// the metrics calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecimenRow {
    /// Stable sequence id, never reused within a session (0 = not yet assigned)
    #[serde(default)]
    pub id: u32,

    #[serde(rename = "cubeId", default, deserialize_with = "lenient_text")]
    pub label: String,

    #[serde(rename = "length", default, deserialize_with = "lenient_text")]
    pub length_mm: String,

    #[serde(rename = "breadth", default, deserialize_with = "lenient_text")]
    pub width_mm: String,

    #[serde(rename = "height", default, deserialize_with = "lenient_text")]
    pub height_mm: String,

    #[serde(rename = "area", default, deserialize_with = "lenient_text")]
    pub area_mm2: String,

    #[serde(rename = "weight", default, deserialize_with = "lenient_text")]
    pub weight_kg: String,

    #[serde(rename = "density", default, deserialize_with = "lenient_text")]
    pub density_kg_m3: String,

    #[serde(rename = "crushingLoad", default, deserialize_with = "lenient_text")]
    pub crushing_load_kn: String,

    #[serde(rename = "compressiveStrength", default, deserialize_with = "lenient_text")]
    pub compressive_strength_mpa: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub failure_type: String,
}

impl SpecimenRow {
    /// Empty row labelled `C{id}`
    pub fn empty(id: u32) -> Self {
        Self {
            id,
            label: format!("C{}", id),
            length_mm: String::new(),
            width_mm: String::new(),
            height_mm: String::new(),
            area_mm2: String::new(),
            weight_kg: String::new(),
            density_kg_m3: String::new(),
            crushing_load_kn: String::new(),
            compressive_strength_mpa: String::new(),
            failure_type: String::new(),
        }
    }

    pub fn get(&self, field: RowField) -> &str {
        match field {
            RowField::Label => &self.label,
            RowField::Length => &self.length_mm,
            RowField::Width => &self.width_mm,
            RowField::Height => &self.height_mm,
            RowField::Weight => &self.weight_kg,
            RowField::CrushingLoad => &self.crushing_load_kn,
            RowField::CompressiveStrength => &self.compressive_strength_mpa,
            RowField::FailureType => &self.failure_type,
        }
    }

    pub(crate) fn set(&mut self, field: RowField, value: String) {
        let slot = match field {
            RowField::Label => &mut self.label,
            RowField::Length => &mut self.length_mm,
            RowField::Width => &mut self.width_mm,
            RowField::Height => &mut self.height_mm,
            RowField::Weight => &mut self.weight_kg,
            RowField::CrushingLoad => &mut self.crushing_load_kn,
            RowField::CompressiveStrength => &mut self.compressive_strength_mpa,
            RowField::FailureType => &mut self.failure_type,
        };
        *slot = value;
    }

    /// Required fields that are blank, in form order
    pub fn missing_required(&self) -> Vec<RowField> {
        RowField::REQUIRED
            .iter()
            .copied()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }
}

/// Operator-editable row fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowField {
    Label,
    Length,
    Width,
    Height,
    Weight,
    CrushingLoad,
    CompressiveStrength,
    FailureType,
}

impl RowField {
    /// Fields that must be filled before submission
    pub const REQUIRED: [RowField; 7] = [
        RowField::Label,
        RowField::Weight,
        RowField::Length,
        RowField::Width,
        RowField::Height,
        RowField::CrushingLoad,
        RowField::CompressiveStrength,
    ];

    /// Wire key of the field in a serialized row
    pub fn wire_name(self) -> &'static str {
        match self {
            RowField::Label => "cubeId",
            RowField::Length => "length",
            RowField::Width => "breadth",
            RowField::Height => "height",
            RowField::Weight => "weight",
            RowField::CrushingLoad => "crushingLoad",
            RowField::CompressiveStrength => "compressiveStrength",
            RowField::FailureType => "failureType",
        }
    }

    /// Human label used in validation messages
    pub fn display_name(self) -> &'static str {
        match self {
            RowField::Label => "cube ID",
            RowField::Length => "length (mm)",
            RowField::Width => "breadth (mm)",
            RowField::Height => "height (mm)",
            RowField::Weight => "weight (kg)",
            RowField::CrushingLoad => "crushing load (kN)",
            RowField::CompressiveStrength => "compressive strength (MPa)",
            RowField::FailureType => "failure type",
        }
    }

    pub fn affects_area(self) -> bool {
        matches!(self, RowField::Length | RowField::Width)
    }

    pub fn affects_density(self) -> bool {
        matches!(
            self,
            RowField::Length | RowField::Width | RowField::Height | RowField::Weight
        )
    }
}

impl fmt::Display for RowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for RowField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cubeId" | "label" => Ok(RowField::Label),
            "length" => Ok(RowField::Length),
            "breadth" | "width" => Ok(RowField::Width),
            "height" => Ok(RowField::Height),
            "weight" => Ok(RowField::Weight),
            "crushingLoad" => Ok(RowField::CrushingLoad),
            "compressiveStrength" => Ok(RowField::CompressiveStrength),
            "failureType" => Ok(RowField::FailureType),
            "area" | "density" => Err(format!("'{}' is derived and cannot be edited", s)),
            other => Err(format!("unknown row field '{}'", other)),
        }
    }
}
