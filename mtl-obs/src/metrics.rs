//! Derived metrics calculator
//!
//! Pure functions turning specimen geometry and weight into area and density.
//!
//! - Area (mm²) = length × breadth, recomputed when length or breadth changes
//!   and both are positive.
//! - Density (kg/m³) = weight / (length/1000 × breadth/1000 × height/1000),
//!   recomputed when any of the four inputs changes and all are positive.
//!
//! When a prerequisite is missing the derived value is left as it was
//! (stale) rather than cleared, so partial typing never wipes a result.

use crate::models::{parse_decimal, parse_positive, RowField, SpecimenRow};
use serde::{Deserialize, Serialize};

/// Display precision of derived values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Precision {
    /// Decimals shown for area (mm²)
    pub area_decimals: usize,
    /// Decimals shown for density (kg/m³)
    pub density_decimals: usize,
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            area_decimals: 1,
            density_decimals: 0,
        }
    }
}

/// Recomputes derived row fields after a single-field edit
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator {
    precision: Precision,
}

impl MetricsCalculator {
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Apply `value` to `field` and refresh whatever depends on it
    ///
    /// The raw text is always stored, even when it does not parse. Derived
    /// values read the new text for the edited field and the stored text for
    /// every other input.
    pub fn recompute(&self, row: &SpecimenRow, field: RowField, value: &str) -> SpecimenRow {
        let mut updated = row.clone();
        updated.set(field, value.to_string());

        if field.affects_area() {
            if let Some(area) = area_mm2(&updated) {
                updated.area_mm2 = format_fixed(area, self.precision.area_decimals);
            }
        }

        if field.affects_density() {
            if let Some(density) = density_kg_m3(&updated) {
                updated.density_kg_m3 = format_fixed(density, self.precision.density_decimals);
            }
        }

        updated
    }

    /// Fill both derived fields from the row's current inputs
    ///
    /// Used for rows that arrive from outside (rehydration), where there is no
    /// single edited field.
    pub fn refresh(&self, row: &SpecimenRow) -> SpecimenRow {
        let mut updated = row.clone();
        if let Some(area) = area_mm2(row) {
            updated.area_mm2 = format_fixed(area, self.precision.area_decimals);
        }
        if let Some(density) = density_kg_m3(row) {
            updated.density_kg_m3 = format_fixed(density, self.precision.density_decimals);
        }
        updated
    }
}

/// Loaded area in mm², when length and breadth are both positive
pub fn area_mm2(row: &SpecimenRow) -> Option<f64> {
    let length = parse_positive(&row.length_mm)?;
    let width = parse_positive(&row.width_mm)?;
    Some(length * width)
}

/// Density in kg/m³, when all three dimensions and the weight are positive
pub fn density_kg_m3(row: &SpecimenRow) -> Option<f64> {
    let length_m = parse_positive(&row.length_mm)? / 1000.0;
    let width_m = parse_positive(&row.width_mm)? / 1000.0;
    let height_m = parse_positive(&row.height_mm)? / 1000.0;
    let weight = parse_positive(&row.weight_kg)?;

    let volume_m3 = length_m * width_m * height_m;
    Some(weight / volume_m3)
}

/// Mean compressive strength across rows, one decimal
///
/// Rows without a parseable strength are skipped; `None` when no row has one.
/// Offered as a suggestion only, the form value stays operator-entered.
pub fn average_strength(rows: &[SpecimenRow]) -> Option<String> {
    let strengths: Vec<f64> = rows
        .iter()
        .filter_map(|row| parse_decimal(&row.compressive_strength_mpa))
        .collect();

    if strengths.is_empty() {
        return None;
    }

    let mean = strengths.iter().sum::<f64>() / strengths.len() as f64;
    Some(format_fixed(mean, 1))
}

fn format_fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}
