//! Row validator
//!
//! Completeness rules gating submission, evaluated in a fixed order:
//! 1. weight text parses as a number (when present)
//! 2. curing condition filled in
//! 3. at least one specimen, every specimen row complete
//! 4. every specimen has all three photos
//! 5. average strength present and numeric
//! 6. tested-by filled in
//! 7. checked-by filled in
//!
//! Validation never performs I/O.

use crate::error::ValidationFailures;
use crate::models::{parse_decimal, ObservationDraft, PhotoAngle, RowField};
use std::fmt;

/// A single reason the draft cannot be submitted
///
/// Row indexes are 0-based positions; messages use 1-based specimen numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    InvalidWeight { row: usize, value: String },
    MissingCuringCondition,
    NoSpecimenRows,
    IncompleteRow { row: usize, missing: Vec<RowField> },
    MissingPhotos { row: usize, missing: Vec<PhotoAngle> },
    MissingAverageStrength,
    InvalidAverageStrength { value: String },
    MissingTestedBy,
    MissingCheckedBy,
}

impl ValidationFailure {
    /// Stable short code for logs and machine consumers
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::InvalidWeight { .. } => "invalid-weight",
            ValidationFailure::MissingCuringCondition => "missing-curing-condition",
            ValidationFailure::NoSpecimenRows => "no-specimen-rows",
            ValidationFailure::IncompleteRow { .. } => "incomplete-row",
            ValidationFailure::MissingPhotos { .. } => "missing-photos",
            ValidationFailure::MissingAverageStrength => "missing-average-strength",
            ValidationFailure::InvalidAverageStrength { .. } => "invalid-average-strength",
            ValidationFailure::MissingTestedBy => "missing-tested-by",
            ValidationFailure::MissingCheckedBy => "missing-checked-by",
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::InvalidWeight { row, value } => write!(
                f,
                "Specimen {}: weight '{}' is not a valid number",
                row + 1,
                value
            ),
            ValidationFailure::MissingCuringCondition => {
                f.write_str("Please enter the curing condition")
            }
            ValidationFailure::NoSpecimenRows => f.write_str("Add at least one specimen"),
            ValidationFailure::IncompleteRow { row, missing } => {
                let fields: Vec<&str> = missing.iter().map(|m| m.display_name()).collect();
                write!(f, "Specimen {}: please fill in {}", row + 1, fields.join(", "))
            }
            ValidationFailure::MissingPhotos { row, missing } => {
                let angles: Vec<&str> = missing.iter().map(|a| a.as_str()).collect();
                write!(f, "Specimen {}: missing photos: {}", row + 1, angles.join(", "))
            }
            ValidationFailure::MissingAverageStrength => {
                f.write_str("Please enter the average strength")
            }
            ValidationFailure::InvalidAverageStrength { value } => {
                write!(f, "Average strength '{}' is not a valid number", value)
            }
            ValidationFailure::MissingTestedBy => f.write_str("Please enter who tested the specimens"),
            ValidationFailure::MissingCheckedBy => f.write_str("Please enter who checked the results"),
        }
    }
}

/// Whether to stop at the first blocking failure or collect all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    FirstFailure,
    FullScan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub ok: bool,
    pub failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self {
            ok: failures.is_empty(),
            failures,
        }
    }

    pub fn into_result(self) -> Result<(), ValidationFailures> {
        if self.ok {
            Ok(())
        } else {
            Err(ValidationFailures(self.failures))
        }
    }
}

/// Validate in single-error mode
pub fn validate(draft: &ObservationDraft) -> ValidationResult {
    validate_with(draft, ValidationMode::FirstFailure)
}

/// Validate and report every failure, in rule order
pub fn validate_all(draft: &ObservationDraft) -> ValidationResult {
    validate_with(draft, ValidationMode::FullScan)
}

pub fn validate_with(draft: &ObservationDraft, mode: ValidationMode) -> ValidationResult {
    let mut failures = collect_failures(draft);
    if mode == ValidationMode::FirstFailure {
        failures.truncate(1);
    }
    ValidationResult::from_failures(failures)
}

fn collect_failures(draft: &ObservationDraft) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let form = &draft.form;

    for (row, specimen) in draft.rows.iter().enumerate() {
        let weight = specimen.weight_kg.trim();
        if !weight.is_empty() && parse_decimal(weight).is_none() {
            failures.push(ValidationFailure::InvalidWeight {
                row,
                value: specimen.weight_kg.clone(),
            });
        }
    }

    if form.curing_condition.trim().is_empty() {
        failures.push(ValidationFailure::MissingCuringCondition);
    }

    if draft.rows.is_empty() {
        failures.push(ValidationFailure::NoSpecimenRows);
    }

    for (row, specimen) in draft.rows.iter().enumerate() {
        let missing = specimen.missing_required();
        if !missing.is_empty() {
            failures.push(ValidationFailure::IncompleteRow { row, missing });
        }
    }

    for row in 0..draft.rows.len() {
        let missing = draft.images.missing_angles(row);
        if !missing.is_empty() {
            failures.push(ValidationFailure::MissingPhotos { row, missing });
        }
    }

    let average = form.average_strength.trim();
    if average.is_empty() {
        failures.push(ValidationFailure::MissingAverageStrength);
    } else if parse_decimal(average).is_none() {
        failures.push(ValidationFailure::InvalidAverageStrength {
            value: form.average_strength.clone(),
        });
    }

    if form.tested_by.trim().is_empty() {
        failures.push(ValidationFailure::MissingTestedBy);
    }

    if form.checked_by.trim().is_empty() {
        failures.push(ValidationFailure::MissingCheckedBy);
    }

    failures
}

/// A weight outside the expected range; informational only
#[derive(Debug, Clone, PartialEq)]
pub struct WeightAdvisory {
    pub row: usize,
    pub weight_kg: f64,
    pub expected: (f64, f64),
}

impl fmt::Display for WeightAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Specimen {}: weight {} kg is outside the usual {}-{} kg",
            self.row + 1,
            self.weight_kg,
            self.expected.0,
            self.expected.1
        )
    }
}

/// Rows whose weight parses but falls outside `expected` (inclusive bounds)
pub fn weight_advisories(draft: &ObservationDraft, expected: (f64, f64)) -> Vec<WeightAdvisory> {
    draft
        .rows
        .iter()
        .enumerate()
        .filter_map(|(row, specimen)| {
            let weight = parse_decimal(&specimen.weight_kg)?;
            if weight < expected.0 || weight > expected.1 {
                Some(WeightAdvisory {
                    row,
                    weight_kg: weight,
                    expected,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormDefaults, ImageKey, OwnerId, SpecimenRow};

    fn complete_row(id: u32) -> SpecimenRow {
        let mut row = SpecimenRow::empty(id);
        row.length_mm = "150".into();
        row.width_mm = "150".into();
        row.height_mm = "150".into();
        row.weight_kg = "8.35".into();
        row.crushing_load_kn = "675.0".into();
        row.compressive_strength_mpa = "30.0".into();
        row
    }

    fn complete_draft(rows: usize) -> ObservationDraft {
        let mut draft = ObservationDraft::empty(Some(OwnerId(1)), &FormDefaults::default());
        for i in 0..rows {
            draft.rows.push(complete_row(i as u32 + 1));
            for angle in PhotoAngle::ALL {
                draft.images.insert(ImageKey::new(i, angle), "data:image/jpeg;base64,AA".into());
            }
        }
        draft.form.curing_condition = "Water curing at 27°C".into();
        draft.form.average_strength = "30.0".into();
        draft.form.tested_by = "R. Kumar".into();
        draft.form.checked_by = "P. Sharma".into();
        draft
    }

    #[test]
    fn test_complete_draft_passes() {
        let result = validate_all(&complete_draft(3));
        assert!(result.ok);
        assert!(result.failures.is_empty());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_missing_curing_condition() {
        let mut draft = complete_draft(3);
        draft.form.curing_condition = "   ".into();

        let result = validate(&draft);
        assert!(!result.ok);
        assert_eq!(result.failures, vec![ValidationFailure::MissingCuringCondition]);
    }

    #[test]
    fn test_missing_back_failure_photo_on_third_specimen() {
        let mut draft = complete_draft(3);
        draft.images.remove(ImageKey::new(2, PhotoAngle::BackFailure));

        let result = validate(&draft);
        assert_eq!(
            result.failures,
            vec![ValidationFailure::MissingPhotos {
                row: 2,
                missing: vec![PhotoAngle::BackFailure],
            }]
        );
    }

    #[test]
    fn test_invalid_weight_reported_before_everything_else() {
        let mut draft = complete_draft(2);
        draft.rows[1].weight_kg = "8,35".into();
        draft.form.curing_condition.clear();

        let result = validate(&draft);
        assert_eq!(
            result.failures,
            vec![ValidationFailure::InvalidWeight {
                row: 1,
                value: "8,35".into()
            }]
        );
    }

    #[test]
    fn test_unusual_but_numeric_weight_is_accepted() {
        let mut draft = complete_draft(1);
        draft.rows[0].weight_kg = "-3".into();
        assert!(validate_all(&draft).ok);
    }

    #[test]
    fn test_full_scan_keeps_rule_order() {
        let mut draft = complete_draft(2);
        draft.rows[0].crushing_load_kn.clear();
        draft.rows[0].label.clear();
        draft.images.remove(ImageKey::new(1, PhotoAngle::FrontFailure));
        draft.form.average_strength.clear();
        draft.form.tested_by.clear();
        draft.form.checked_by.clear();

        let codes: Vec<&str> = validate_all(&draft).failures.iter().map(|f| f.code()).collect();
        assert_eq!(
            codes,
            vec![
                "incomplete-row",
                "missing-photos",
                "missing-average-strength",
                "missing-tested-by",
                "missing-checked-by",
            ]
        );

        let first = validate(&draft).failures;
        assert_eq!(
            first,
            vec![ValidationFailure::IncompleteRow {
                row: 0,
                missing: vec![RowField::Label, RowField::CrushingLoad],
            }]
        );
    }

    #[test]
    fn test_filling_a_field_only_removes_failures() {
        let mut draft = complete_draft(2);
        draft.rows[1].height_mm.clear();
        draft.form.tested_by.clear();
        let before = validate_all(&draft).failures;

        draft.rows[1].height_mm = "150".into();
        let after = validate_all(&draft).failures;

        assert!(after.len() < before.len());
        assert!(after.iter().all(|f| before.contains(f)));
        assert_eq!(after, vec![ValidationFailure::MissingTestedBy]);
    }

    #[test]
    fn test_empty_draft_requires_specimens() {
        let mut draft = complete_draft(0);
        draft.rows.clear();
        let failures = validate_all(&draft).failures;
        assert_eq!(failures, vec![ValidationFailure::NoSpecimenRows]);
    }

    #[test]
    fn test_non_numeric_average_strength() {
        let mut draft = complete_draft(1);
        draft.form.average_strength = "about 30".into();
        assert_eq!(
            validate(&draft).failures,
            vec![ValidationFailure::InvalidAverageStrength {
                value: "about 30".into()
            }]
        );
    }

    #[test]
    fn test_messages_name_the_field() {
        let failure = ValidationFailure::IncompleteRow {
            row: 0,
            missing: vec![RowField::Height, RowField::Weight],
        };
        assert_eq!(
            failure.to_string(),
            "Specimen 1: please fill in height (mm), weight (kg)"
        );

        let failure = ValidationFailure::MissingPhotos {
            row: 2,
            missing: vec![PhotoAngle::BackFailure],
        };
        assert_eq!(failure.to_string(), "Specimen 3: missing photos: back-failure");
    }

    #[test]
    fn test_weight_advisories() {
        let mut draft = complete_draft(3);
        draft.rows[0].weight_kg = "8.35".into();
        draft.rows[1].weight_kg = "9.1".into();
        draft.rows[2].weight_kg = "bad".into();

        let advisories = weight_advisories(&draft, (8.3, 8.4));
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].row, 1);
        // Advisories never block submission on their own
        draft.rows[2].weight_kg = "8.3".into();
        assert!(validate_all(&draft).ok);
    }
}
