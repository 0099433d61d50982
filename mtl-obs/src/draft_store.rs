//! Observation draft store
//!
//! Sole owner of the active session's [`ObservationDraft`]. Every row edit
//! goes through the [`MetricsCalculator`] so derived fields are never stale
//! relative to the inputs that produced them. Nothing here performs I/O.

use crate::error::DraftError;
use crate::metrics::{self, MetricsCalculator};
use crate::models::{
    FormDefaults, ImageKey, MetadataField, ObservationDraft, OwnerId, PhotoAngle, RowField,
    SaveKind, SaveRecord, SpecimenRow,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Minimum number of rows a draft keeps once seeded
pub const MIN_ROWS: usize = 1;

/// In-memory draft for one session
#[derive(Debug, Clone)]
pub struct DraftStore {
    draft: ObservationDraft,
    calculator: MetricsCalculator,
    defaults: FormDefaults,
    max_rows: usize,
    next_row_id: u32,
    seeded: bool,
    rehydrated: bool,
}

impl DraftStore {
    /// Empty store: no rows, fixed form defaults, no images
    pub fn new(
        owner_id: Option<OwnerId>,
        calculator: MetricsCalculator,
        defaults: FormDefaults,
        max_rows: usize,
    ) -> Self {
        Self {
            draft: ObservationDraft::empty(owner_id, &defaults),
            calculator,
            defaults,
            max_rows: max_rows.max(MIN_ROWS),
            next_row_id: 1,
            seeded: false,
            rehydrated: false,
        }
    }

    pub fn get_draft(&self) -> &ObservationDraft {
        &self.draft
    }

    /// Owned copy for a save attempt
    pub fn snapshot(&self) -> ObservationDraft {
        self.draft.clone()
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.draft.owner_id
    }

    pub fn defaults(&self) -> &FormDefaults {
        &self.defaults
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn is_rehydrated(&self) -> bool {
        self.rehydrated
    }

    /// Edit one row field; area and density follow
    pub fn mutate_row(
        &mut self,
        index: usize,
        field: RowField,
        value: &str,
    ) -> Result<&SpecimenRow, DraftError> {
        let len = self.draft.rows.len();
        let current = self
            .draft
            .rows
            .get(index)
            .ok_or(DraftError::RowOutOfRange { index, len })?;

        let updated = self.calculator.recompute(current, field, value);
        debug!(
            row = index,
            field = field.wire_name(),
            area = %updated.area_mm2,
            density = %updated.density_kg_m3,
            "Row updated"
        );
        self.draft.rows[index] = updated;
        self.touch();
        Ok(&self.draft.rows[index])
    }

    /// Edit a form field; machine, method and verified-by are fixed
    pub fn mutate_metadata(&mut self, field: MetadataField, value: &str) -> Result<(), DraftError> {
        if field.is_read_only() {
            return Err(DraftError::ReadOnlyField(field));
        }
        self.draft.form.set(field, value.to_string());
        debug!(field = field.wire_name(), "Form field updated");
        self.touch();
        Ok(())
    }

    /// Store a photo for an existing row, returning any photo it replaced
    pub fn set_captured_image(
        &mut self,
        specimen: usize,
        angle: PhotoAngle,
        image: String,
    ) -> Result<Option<String>, DraftError> {
        self.check_index(specimen)?;
        let replaced = self.draft.images.insert(ImageKey::new(specimen, angle), image);
        debug!(row = specimen, angle = %angle, replaced = replaced.is_some(), "Photo stored");
        self.touch();
        Ok(replaced)
    }

    pub fn remove_captured_image(&mut self, specimen: usize, angle: PhotoAngle) -> Option<String> {
        let removed = self.draft.images.remove(ImageKey::new(specimen, angle));
        if removed.is_some() {
            debug!(row = specimen, angle = %angle, "Photo removed");
            self.touch();
        }
        removed
    }

    /// Create `count` empty rows, clamped to `1..=max_rows`
    ///
    /// Allowed once per fresh session and never after [`replace_draft`].
    ///
    /// [`replace_draft`]: DraftStore::replace_draft
    pub fn seed_rows(&mut self, count: usize) -> Result<usize, DraftError> {
        if self.rehydrated {
            return Err(DraftError::SeedAfterRehydrate);
        }
        if self.seeded {
            return Err(DraftError::AlreadySeeded);
        }

        let count = count.clamp(MIN_ROWS, self.max_rows);
        for _ in 0..count {
            let row = self.new_row()?;
            self.draft.rows.push(row);
        }
        self.seeded = true;
        self.touch();
        debug!(count, "Rows seeded");
        Ok(count)
    }

    /// Install a previously saved draft
    ///
    /// Rows without an id, or repeating an earlier row's id, get fresh ones;
    /// derived fields are refreshed with the configured precision; blank
    /// fixed fields get their defaults back.
    pub fn replace_draft(&mut self, mut draft: ObservationDraft) {
        draft.form.fill_blank_defaults(&self.defaults);

        let next_id = assign_row_ids(&mut draft.rows);
        for row in &mut draft.rows {
            *row = self.calculator.refresh(row);
        }

        if draft.owner_id.is_none() {
            draft.owner_id = self.draft.owner_id;
        }

        self.next_row_id = self.next_row_id.max(next_id);
        self.draft = draft;
        self.rehydrated = true;
        debug!(rows = self.draft.rows.len(), images = self.draft.images.len(), "Draft replaced");
    }

    /// Append an empty row, returning its index
    pub fn add_row(&mut self) -> Result<usize, DraftError> {
        if self.draft.rows.len() >= self.max_rows {
            return Err(DraftError::RowLimit { max: self.max_rows });
        }
        let row = self.new_row()?;
        self.draft.rows.push(row);
        self.touch();
        Ok(self.draft.rows.len() - 1)
    }

    /// Remove a row and its photos; later photos move down one position
    pub fn remove_row(&mut self, index: usize) -> Result<SpecimenRow, DraftError> {
        self.check_index(index)?;
        if self.draft.rows.len() <= MIN_ROWS {
            return Err(DraftError::LastRow);
        }
        let removed = self.draft.rows.remove(index);
        self.draft.images.remove_specimen(index);
        self.touch();
        debug!(row = index, id = removed.id, "Row removed");
        Ok(removed)
    }

    /// Record a successful save
    pub fn mark_saved(&mut self, kind: SaveKind, at: DateTime<Utc>) {
        self.draft.last_saved = Some(SaveRecord { kind, at });
    }

    /// Mean compressive strength of the current rows, for display only
    pub fn suggest_average_strength(&self) -> Option<String> {
        metrics::average_strength(&self.draft.rows)
    }

    /// Position of the row carrying `id`
    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.draft.rows.iter().position(|r| r.id == id)
    }

    fn new_row(&mut self) -> Result<SpecimenRow, DraftError> {
        let id = self.next_row_id;
        self.next_row_id = id.checked_add(1).ok_or(DraftError::RowIdsExhausted)?;
        Ok(SpecimenRow::empty(id))
    }

    fn check_index(&self, index: usize) -> Result<(), DraftError> {
        let len = self.draft.rows.len();
        if index < len {
            Ok(())
        } else {
            Err(DraftError::RowOutOfRange { index, len })
        }
    }

    fn touch(&mut self) {
        self.draft.last_modified = mtl_common::time::now();
    }
}

/// Give every row a unique non-zero id, returning the next free id
///
/// The first row carrying an id keeps it; blanks and repeats are reissued
/// above the highest kept id. When that would run past `u32::MAX` every row
/// is renumbered from 1.
fn assign_row_ids(rows: &mut [SpecimenRow]) -> u32 {
    let mut seen = HashSet::new();
    let reissue: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.id == 0 || !seen.insert(row.id))
        .map(|(i, _)| i)
        .collect();
    let highest = seen.iter().copied().max().unwrap_or(0);

    let room = u32::try_from(reissue.len())
        .ok()
        .and_then(|n| highest.checked_add(n))
        .and_then(|last| last.checked_add(1));

    match room {
        Some(next_id) => {
            for (offset, &i) in (1u32..).zip(&reissue) {
                rows[i].id = highest + offset;
            }
            next_id
        }
        None => {
            warn!(rows = rows.len(), "Saved row ids out of range, renumbering");
            let mut next_id = 1u32;
            for row in rows.iter_mut() {
                row.id = next_id;
                next_id = next_id.saturating_add(1);
            }
            next_id
        }
    }
}
