//! Configuration for mtl-obs
//!
//! Priority: command line → environment (`MTL_API_URL`, `MTL_API_TIMEOUT_MS`)
//! → `mtl-obs.toml` → compiled defaults. Every section is optional.

use crate::metrics::Precision;
use crate::models::FormDefaults;
use mtl_common::config::LoggingConfig;
use mtl_common::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Module name used for the default TOML path
pub const MODULE_NAME: &str = "mtl-obs";

/// Environment variable overriding `[api] base_url`
pub const API_URL_ENV: &str = "MTL_API_URL";

/// Environment variable overriding `[api] request_timeout_ms`
pub const API_TIMEOUT_ENV: &str = "MTL_API_TIMEOUT_MS";

/// Top-level `mtl-obs.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObsConfig {
    pub root_folder: Option<PathBuf>,
    pub api: ApiConfig,
    pub progress: ProgressConfig,
    pub precision: Precision,
    pub specimens: SpecimenConfig,
    pub form_defaults: FormDefaults,
    pub logging: LoggingConfig,
}

/// `[api]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; `/test-observations/{ownerId}` is appended
    pub base_url: String,
    /// Bound on every remote call
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        mtl_common::time::millis_to_duration(self.request_timeout_ms)
    }
}

/// `[progress]` simulated save ramp
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Interval between ramp steps
    pub tick_ms: u64,
    /// Largest random increment per step, in percent
    pub max_step: f64,
    /// The ramp never passes this value while the remote call is outstanding
    pub ceiling: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            max_step: 15.0,
            ceiling: 90.0,
        }
    }
}

impl ProgressConfig {
    pub fn tick(&self) -> Duration {
        mtl_common::time::millis_to_duration(self.tick_ms.max(1))
    }
}

/// `[specimens]`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpecimenConfig {
    /// Rows seeded when the test request does not state a quantity
    pub default_count: usize,
    pub max_count: usize,
    /// Usual weight range in kg; values outside only produce an advisory
    pub expected_weight_kg: Option<(f64, f64)>,
}

impl Default for SpecimenConfig {
    fn default() -> Self {
        Self {
            default_count: 3,
            max_count: 3,
            expected_weight_kg: None,
        }
    }
}

impl ObsConfig {
    /// Load from `explicit_path` or the default location, then apply env overrides
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config: ObsConfig =
            mtl_common::config::load_toml_config(explicit_path, MODULE_NAME)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MTL_API_URL` and `MTL_API_TIMEOUT_MS`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                info!("API base URL from {}", API_URL_ENV);
                self.api.base_url = url.trim().to_string();
            }
        }

        if let Ok(raw) = std::env::var(API_TIMEOUT_ENV) {
            let timeout = raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("{} must be milliseconds, got '{}'", API_TIMEOUT_ENV, raw))
            })?;
            self.api.request_timeout_ms = timeout;
        }

        Ok(())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("[api] base_url must not be empty".to_string()));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(Error::Config(
                "[api] request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.specimens.max_count == 0 {
            return Err(Error::Config(
                "[specimens] max_count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.progress.ceiling)
            || !self.progress.max_step.is_finite()
            || self.progress.max_step <= 0.0
        {
            return Err(Error::Config(
                "[progress] needs 0 <= ceiling <= 100 and a finite max_step > 0".to_string(),
            ));
        }
        if let Some((min, max)) = self.specimens.expected_weight_kg {
            if min > max {
                warn!(min, max, "expected_weight_kg range is reversed, advisories disabled");
            }
        }
        Ok(())
    }

    /// Weight range for advisories, if configured and well-formed
    pub fn weight_range(&self) -> Option<(f64, f64)> {
        self.specimens
            .expected_weight_kg
            .filter(|(min, max)| min <= max)
    }
}
