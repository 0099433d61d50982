//! Observation engine configuration: file loading and env overrides
//!
//! Env-touching tests are #[serial].

use mtl_obs::config::{ObsConfig, API_TIMEOUT_ENV, API_URL_ENV};
use serial_test::serial;
use std::time::Duration;

fn clear_env() {
    std::env::remove_var(API_URL_ENV);
    std::env::remove_var(API_TIMEOUT_ENV);
}

#[test]
#[serial]
fn test_load_explicit_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mtl-obs.toml");
    std::fs::write(
        &path,
        r#"
[api]
base_url = "http://lab.local:5000/api"
request_timeout_ms = 2500

[specimens]
default_count = 2
max_count = 6
expected_weight_kg = [7.8, 8.9]
"#,
    )
    .unwrap();

    let config = ObsConfig::load(Some(&path)).unwrap();

    assert_eq!(config.api.base_url, "http://lab.local:5000/api");
    assert_eq!(config.api.request_timeout(), Duration::from_millis(2500));
    assert_eq!(config.specimens.default_count, 2);
    assert_eq!(config.specimens.max_count, 6);
    assert_eq!(config.weight_range(), Some((7.8, 8.9)));
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_env();
    let mut config = ObsConfig::default();
    std::env::set_var(API_URL_ENV, " http://backup.local/api ");
    std::env::set_var(API_TIMEOUT_ENV, "750");

    config.apply_env_overrides().unwrap();
    clear_env();

    assert_eq!(config.api.base_url, "http://backup.local/api");
    assert_eq!(config.api.request_timeout_ms, 750);
}

#[test]
#[serial]
fn test_blank_url_override_ignored() {
    clear_env();
    let mut config = ObsConfig::default();
    let original = config.api.base_url.clone();
    std::env::set_var(API_URL_ENV, "   ");

    config.apply_env_overrides().unwrap();
    clear_env();

    assert_eq!(config.api.base_url, original);
}

#[test]
#[serial]
fn test_malformed_timeout_override_rejected() {
    clear_env();
    let mut config = ObsConfig::default();
    std::env::set_var(API_TIMEOUT_ENV, "soon");

    let result = config.apply_env_overrides();
    clear_env();

    assert!(result.is_err());
}
