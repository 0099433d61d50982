//! Draft and configuration builders

use mtl_obs::config::{ObsConfig, ProgressConfig};
use mtl_obs::models::{FormDefaults, ImageKey, ObservationDraft, OwnerId, PhotoAngle, SpecimenRow};

/// Config with a fast progress ramp and a short request timeout
pub fn test_config() -> ObsConfig {
    let mut config = ObsConfig::default();
    config.api.request_timeout_ms = 5_000;
    config.progress = ProgressConfig {
        tick_ms: 10,
        max_step: 15.0,
        ceiling: 90.0,
    };
    config
}

pub fn complete_row(id: u32) -> SpecimenRow {
    let mut row = SpecimenRow::empty(id);
    row.length_mm = "150".into();
    row.width_mm = "150".into();
    row.height_mm = "150".into();
    row.area_mm2 = "22500.0".into();
    row.weight_kg = "8.5".into();
    row.density_kg_m3 = "2519".into();
    row.crushing_load_kn = "675".into();
    row.compressive_strength_mpa = "30.0".into();
    row
}

/// Draft that passes validation, with `rows` specimens and all photos
pub fn complete_draft(owner_id: Option<OwnerId>, rows: usize) -> ObservationDraft {
    let mut draft = ObservationDraft::empty(owner_id, &FormDefaults::default());
    for i in 0..rows {
        draft.rows.push(complete_row(i as u32 + 1));
        for angle in PhotoAngle::ALL {
            draft
                .images
                .insert(ImageKey::new(i, angle), format!("data:image/jpeg;base64,{}", i));
        }
    }
    draft.form.curing_condition = "Water curing 27±2°C".into();
    draft.form.average_strength = "30.0".into();
    draft.form.tested_by = "R. Kumar".into();
    draft.form.checked_by = "P. Sharma".into();
    draft
}
