//! Configuration resolution and graceful degradation tests
//!
//! Covers:
//! - Priority order: explicit path → PKGMETA_CONFIG → user config dir → defaults
//! - Missing config files fall back to compiled defaults
//! - Malformed config files are reported as configuration errors
//!
//! Note: Uses serial_test to prevent environment variable races.
//! Tests that manipulate PKGMETA_CONFIG are marked with #[serial].

use pkgmeta_common::config::{load_config, resolve_config_path, EngineConfig, CONFIG_ENV_VAR};
use pkgmeta_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_explicit_path_takes_precedence_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/pkgmeta-from-env.toml");

    let explicit = Path::new("/tmp/pkgmeta-explicit.toml");
    let resolved = resolve_config_path(Some(explicit));

    assert_eq!(resolved, Some(PathBuf::from("/tmp/pkgmeta-explicit.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_explicit_path() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/pkgmeta-from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/pkgmeta-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let missing = PathBuf::from(format!("/tmp/pkgmeta-missing-{}.toml", std::process::id()));
    let config = load_config(Some(&missing)).expect("missing file must not be fatal");

    let defaults = EngineConfig::default();
    assert_eq!(
        config.aggregation.default_strategy,
        defaults.aggregation.default_strategy
    );
    assert_eq!(config.providers.reliability("apt"), 0.95);
}

#[test]
#[serial]
fn test_env_var_config_file_loaded() {
    let file = write_config(
        r#"
        [quality]
        min_agreement = 0.5

        [logging]
        level = "debug"
        "#,
    );
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = load_config(None).unwrap();
    assert_eq!(config.quality.min_agreement, 0.5);
    assert_eq!(config.quality.min_field_quality, 0.6);
    assert_eq!(config.logging.level, "debug");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_malformed_config_file_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("[providers.reliability\napt = ");

    let result = load_config(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_negative_half_life_rejected() {
    let result = EngineConfig::from_toml_str(
        r#"
        [quality]
        freshness_half_life_days = -3.0
        "#,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
