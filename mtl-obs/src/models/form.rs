//! Session-level observation metadata

use super::lenient_text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed descriptive values pre-filled on every new form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    pub sample_description: String,
    pub cube_condition: String,
    pub machine_used: String,
    pub test_method: String,
    pub verified_by: String,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            sample_description: "Concrete Cube Specimen".to_string(),
            cube_condition: "Good".to_string(),
            machine_used: "Universal Testing Machine".to_string(),
            test_method: "IS 516 (Part1/Sec1):2021".to_string(),
            verified_by: "Mr. P A Sanghave".to_string(),
        }
    }
}

/// Observation form metadata (`formData` on the wire)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObservationForm {
    #[serde(deserialize_with = "lenient_text")]
    pub sample_description: String,
    #[serde(deserialize_with = "lenient_text")]
    pub cube_condition: String,
    #[serde(deserialize_with = "lenient_text")]
    pub curing_condition: String,
    #[serde(deserialize_with = "lenient_text")]
    pub machine_used: String,
    #[serde(deserialize_with = "lenient_text")]
    pub test_method: String,
    #[serde(deserialize_with = "lenient_text")]
    pub average_strength: String,
    #[serde(deserialize_with = "lenient_text")]
    pub tested_by: String,
    #[serde(deserialize_with = "lenient_text")]
    pub checked_by: String,
    #[serde(deserialize_with = "lenient_text")]
    pub verified_by: String,
    #[serde(deserialize_with = "lenient_text")]
    pub test_remarks: String,
}

impl Default for ObservationForm {
    fn default() -> Self {
        Self::with_defaults(&FormDefaults::default())
    }
}

impl ObservationForm {
    /// Blank form carrying only the fixed descriptive values
    pub fn with_defaults(defaults: &FormDefaults) -> Self {
        Self {
            sample_description: defaults.sample_description.clone(),
            cube_condition: defaults.cube_condition.clone(),
            curing_condition: String::new(),
            machine_used: defaults.machine_used.clone(),
            test_method: defaults.test_method.clone(),
            average_strength: String::new(),
            tested_by: String::new(),
            checked_by: String::new(),
            verified_by: defaults.verified_by.clone(),
            test_remarks: String::new(),
        }
    }

    /// Restore blank descriptive fields from `defaults` (after rehydration)
    pub fn fill_blank_defaults(&mut self, defaults: &FormDefaults) {
        fn fill(slot: &mut String, default: &str) {
            if slot.trim().is_empty() {
                *slot = default.to_string();
            }
        }
        fill(&mut self.sample_description, &defaults.sample_description);
        fill(&mut self.cube_condition, &defaults.cube_condition);
        fill(&mut self.machine_used, &defaults.machine_used);
        fill(&mut self.test_method, &defaults.test_method);
        fill(&mut self.verified_by, &defaults.verified_by);
    }

    pub fn get(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::SampleDescription => &self.sample_description,
            MetadataField::CubeCondition => &self.cube_condition,
            MetadataField::CuringCondition => &self.curing_condition,
            MetadataField::MachineUsed => &self.machine_used,
            MetadataField::TestMethod => &self.test_method,
            MetadataField::AverageStrength => &self.average_strength,
            MetadataField::TestedBy => &self.tested_by,
            MetadataField::CheckedBy => &self.checked_by,
            MetadataField::VerifiedBy => &self.verified_by,
            MetadataField::TestRemarks => &self.test_remarks,
        }
    }

    pub(crate) fn set(&mut self, field: MetadataField, value: String) {
        let slot = match field {
            MetadataField::SampleDescription => &mut self.sample_description,
            MetadataField::CubeCondition => &mut self.cube_condition,
            MetadataField::CuringCondition => &mut self.curing_condition,
            MetadataField::MachineUsed => &mut self.machine_used,
            MetadataField::TestMethod => &mut self.test_method,
            MetadataField::AverageStrength => &mut self.average_strength,
            MetadataField::TestedBy => &mut self.tested_by,
            MetadataField::CheckedBy => &mut self.checked_by,
            MetadataField::VerifiedBy => &mut self.verified_by,
            MetadataField::TestRemarks => &mut self.test_remarks,
        };
        *slot = value;
    }
}

/// Form metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    SampleDescription,
    CubeCondition,
    CuringCondition,
    MachineUsed,
    TestMethod,
    AverageStrength,
    TestedBy,
    CheckedBy,
    VerifiedBy,
    TestRemarks,
}

impl MetadataField {
    /// Fixed fields the operator cannot change
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            MetadataField::MachineUsed | MetadataField::TestMethod | MetadataField::VerifiedBy
        )
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            MetadataField::SampleDescription => "sampleDescription",
            MetadataField::CubeCondition => "cubeCondition",
            MetadataField::CuringCondition => "curingCondition",
            MetadataField::MachineUsed => "machineUsed",
            MetadataField::TestMethod => "testMethod",
            MetadataField::AverageStrength => "averageStrength",
            MetadataField::TestedBy => "testedBy",
            MetadataField::CheckedBy => "checkedBy",
            MetadataField::VerifiedBy => "verifiedBy",
            MetadataField::TestRemarks => "testRemarks",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for MetadataField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "sampleDescription" => MetadataField::SampleDescription,
            "cubeCondition" => MetadataField::CubeCondition,
            "curingCondition" => MetadataField::CuringCondition,
            "machineUsed" => MetadataField::MachineUsed,
            "testMethod" => MetadataField::TestMethod,
            "averageStrength" => MetadataField::AverageStrength,
            "testedBy" => MetadataField::TestedBy,
            "checkedBy" => MetadataField::CheckedBy,
            "verifiedBy" => MetadataField::VerifiedBy,
            "testRemarks" => MetadataField::TestRemarks,
            other => return Err(format!("unknown form field '{}'", other)),
        };
        Ok(field)
    }
}
