//! Build the settings of a sidecar binary
//!
//! ---
//! The configuration is read in layers, each one overriding the previous:
//!
//! 1. the file at the path in `SIDECAR_CONFIG_PATH`, `base_config/config.toml`
//!    by default. Unlike the other layers a missing file here is only
//!    tolerated when the settings type has defaults for every field.
//! 2. the file at the path in `SIDECAR_CONFIG_OVERRIDE_PATH`,
//!    `config/config.toml` by default, if it exists
//! 3. the per-user configuration directory of the application, if it exists
//! 4. environment variables prefixed with `env_prefix` and `_`, nested keys
//!    separated by `__` (`SIDECAR_HEALTH__TOLERANCE=5` sets `health.tolerance`)
//!
//! Command line flags are applied on top by the binary.
use super::constants::{USER_CONFIG_ORGANIZATION, USER_CONFIG_QUALIFIER};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// `config.toml` in the per-user configuration directory of the application
pub fn user_config_path(app_name: &str) -> Option<PathBuf> {
    ProjectDirs::from(USER_CONFIG_QUALIFIER, USER_CONFIG_ORGANIZATION, app_name)
        .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

/// Merge the settings
/// 1. in path specified in `SIDECAR_CONFIG_PATH` environment variable (`base_config/config.toml` by default)
/// 2. in path specified in `SIDECAR_CONFIG_OVERRIDE_PATH` environment variable (`config/config.toml` by default)
/// 3. user configuration directory
/// 4. environment variables
pub fn build_sidecar_settings<T: DeserializeOwned>(
    app_name: &str,
    env_prefix: &str,
) -> Result<T, config::ConfigError> {
    let mut builder = config::Config::builder();
    let config_path = std::env::var("SIDECAR_CONFIG_PATH")
        .unwrap_or_else(|_| "base_config/config.toml".to_string());

    builder = builder.add_source(config::File::with_name(&config_path).required(false));

    let config_override_path = std::env::var("SIDECAR_CONFIG_OVERRIDE_PATH")
        .unwrap_or_else(|_| "config/config.toml".to_string());

    if Path::new(&config_override_path).is_file() {
        builder = builder.add_source(config::File::with_name(&config_override_path));
    }

    // Portable user config loading
    if let Some(user_config_path) = user_config_path(app_name) {
        if user_config_path.is_file() {
            builder = builder.add_source(config::File::from(user_config_path));
        }
    }

    builder
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct HealthSection {
        tolerance: u64,
        min_index_for_alert: u64,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct TestSettings {
        interval: u64,
        tolerance: u64,
        health: HealthSection,
    }

    #[test]
    #[serial]
    fn test_file_then_env_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "interval = 7\ntolerance = 3").unwrap();
        std::env::set_var("SIDECAR_CONFIG_PATH", file.path());
        std::env::set_var("SIDECARTEST_TOLERANCE", "5");

        let settings: TestSettings =
            build_sidecar_settings("sidecar-test", "SIDECARTEST").unwrap();
        assert_eq!(settings.interval, 7);
        assert_eq!(settings.tolerance, 5);

        std::env::remove_var("SIDECAR_CONFIG_PATH");
        std::env::remove_var("SIDECARTEST_TOLERANCE");
    }

    #[test]
    #[serial]
    fn test_env_sets_nested_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[health]\ntolerance = 1\nmin_index_for_alert = 2").unwrap();
        std::env::set_var("SIDECAR_CONFIG_PATH", file.path());
        std::env::set_var("SIDECARTEST_HEALTH__TOLERANCE", "5");
        std::env::set_var("SIDECARTEST_HEALTH__MIN_INDEX_FOR_ALERT", "40");

        let settings: TestSettings =
            build_sidecar_settings("sidecar-test", "SIDECARTEST").unwrap();
        assert_eq!(settings.health.tolerance, 5);
        assert_eq!(settings.health.min_index_for_alert, 40);

        std::env::remove_var("SIDECAR_CONFIG_PATH");
        std::env::remove_var("SIDECARTEST_HEALTH__TOLERANCE");
        std::env::remove_var("SIDECARTEST_HEALTH__MIN_INDEX_FOR_ALERT");
    }

    #[test]
    #[serial]
    fn test_missing_base_file_uses_defaults() {
        std::env::set_var("SIDECAR_CONFIG_PATH", "/nonexistent/sidecar/config.toml");
        let settings: TestSettings =
            build_sidecar_settings("sidecar-test", "SIDECARTEST").unwrap();
        assert_eq!(settings.interval, 0);
        std::env::remove_var("SIDECAR_CONFIG_PATH");
    }

    #[test]
    fn test_user_config_path_is_the_sidecar_own() {
        // no home directory in some sandboxes
        if let Some(path) = user_config_path("sidecar") {
            assert!(path.ends_with("config.toml"));
            let path = path.to_string_lossy().to_lowercase();
            assert!(path.contains("sidecar"));
            assert!(!path.contains("massa"));
        }
    }
}
