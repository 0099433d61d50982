//! Configuration loading and root folder resolution
//!
//! Resolution priority for the root folder (where `mtl.db` lives):
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `MTL_ROOT_FOLDER`
//! 3. `root_folder` key of the module's TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: the module logs a warning and starts
//! with compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MTL_ROOT_FOLDER";

/// SQLite file name inside the root folder
pub const DATABASE_FILE: &str = "mtl.db";

/// Logging configuration shared by every module's TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves the root folder for a module
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Root folder given on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder read from the module's TOML file
    pub fn with_toml_root(mut self, path: Option<PathBuf>) -> Self {
        self.toml_root = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder on first run and hands out paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mtl"))
        .unwrap_or_else(|| PathBuf::from("./mtl_data"))
}

/// Default TOML path for a module: `<config_dir>/mtl/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mtl").join(format!("{}.toml", module_name)))
}

/// Load a module's TOML config
///
/// An explicitly requested file must exist. When no path is given the
/// module's default location is tried, and a missing file falls back to
/// `T::default()` with a warning.
pub fn load_toml_config<T>(explicit_path: Option<&Path>, module_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path(module_name) {
            Some(path) if path.exists() => path,
            Some(path) => {
                warn!(
                    "No config file at {}, using compiled defaults",
                    path.display()
                );
                return Ok(T::default());
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                return Ok(T::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}
