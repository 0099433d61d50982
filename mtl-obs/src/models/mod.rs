//! Observation data model
//!
//! Field values are kept as the text the operator typed. Numbers are parsed
//! on demand by the calculator and the validator, so a half-typed value is
//! never lost.

pub mod draft;
pub mod form;
pub mod images;
pub mod specimen;

pub use draft::{ObservationDraft, ObservationPayload, OwnerId, SaveKind, SaveRecord};
pub use form::{FormDefaults, MetadataField, ObservationForm};
pub use images::{CapturedImageSet, ImageKey, PhotoAngle};
pub use specimen::{RowField, SpecimenRow};

use serde::{Deserialize, Deserializer};

/// Deserialize a text field that may arrive as a JSON string, number, bool or null
///
/// The backend echoes some fields as numbers (e.g. `failureType: 2`).
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Parse operator text as a finite decimal
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse operator text as a finite decimal greater than zero
pub fn parse_positive(raw: &str) -> Option<f64> {
    parse_decimal(raw).filter(|v| *v > 0.0)
}
