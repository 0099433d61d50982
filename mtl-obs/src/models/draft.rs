//! The observation draft aggregate and its wire payload

use super::{CapturedImageSet, FormDefaults, ObservationForm, SpecimenRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the parent test request a draft belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(OwnerId)
    }
}

/// Where the last successful save landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Remote,
    LocalFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveRecord {
    pub kind: SaveKind,
    pub at: DateTime<Utc>,
}

/// Mutable, not-yet-finalized observation data for one test request
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationDraft {
    pub owner_id: Option<OwnerId>,
    pub form: ObservationForm,
    /// Specimen rows in display order
    pub rows: Vec<SpecimenRow>,
    pub images: CapturedImageSet,
    pub last_modified: DateTime<Utc>,
    pub last_saved: Option<SaveRecord>,
}

impl ObservationDraft {
    /// Draft with no rows and a default form
    pub fn empty(owner_id: Option<OwnerId>, defaults: &FormDefaults) -> Self {
        Self {
            owner_id,
            form: ObservationForm::with_defaults(defaults),
            rows: Vec::new(),
            images: CapturedImageSet::new(),
            last_modified: mtl_common::time::now(),
            last_saved: None,
        }
    }

    pub fn row(&self, index: usize) -> Option<&SpecimenRow> {
        self.rows.get(index)
    }

    /// Wire payload stamped with `timestamp`
    pub fn to_payload(&self, owner_id: OwnerId, timestamp: DateTime<Utc>) -> ObservationPayload {
        ObservationPayload {
            form_data: self.form.clone(),
            test_rows: self.rows.clone(),
            captured_images: self.images.clone(),
            owner_id: Some(owner_id),
            timestamp: Some(timestamp),
            is_empty: false,
        }
    }

    /// Same document shape for a draft that may not have an owner yet
    pub fn to_document(&self) -> ObservationPayload {
        ObservationPayload {
            form_data: self.form.clone(),
            test_rows: self.rows.clone(),
            captured_images: self.images.clone(),
            owner_id: self.owner_id,
            timestamp: Some(self.last_modified),
            is_empty: false,
        }
    }
}

/// JSON document exchanged with the API and kept in the local store
///
/// `POST /test-observations/{ownerId}` sends it; `GET` returns it, possibly
/// with `isEmpty: true` when nothing has been saved yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationPayload {
    #[serde(default)]
    pub form_data: ObservationForm,
    #[serde(default)]
    pub test_rows: Vec<SpecimenRow>,
    #[serde(default)]
    pub captured_images: CapturedImageSet,
    #[serde(default, alias = "testRequestId")]
    pub owner_id: Option<OwnerId>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_empty: bool,
}

impl ObservationPayload {
    /// Rebuild a draft, restoring blank fixed fields from `defaults`
    ///
    /// `fallback_owner` is used when the document does not name its owner.
    pub fn into_draft(self, fallback_owner: Option<OwnerId>, defaults: &FormDefaults) -> ObservationDraft {
        let mut form = self.form_data;
        form.fill_blank_defaults(defaults);

        ObservationDraft {
            owner_id: self.owner_id.or(fallback_owner),
            form,
            rows: self.test_rows,
            images: self.captured_images,
            last_modified: self.timestamp.unwrap_or_else(mtl_common::time::now),
            last_saved: None,
        }
    }
}
