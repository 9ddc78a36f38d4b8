// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::env::EnvSource;
use crate::config::model::Settings;
use crate::errors::{FlymigrateError, Result};

/// Load settings from a TOML file.
///
/// This only performs TOML deserialization; required values are checked
/// when the settings are turned into a `RunPlan`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        FlymigrateError::ConfigError(format!("reading config file {:?}: {e}", path))
    })?;

    let settings: Settings = toml::from_str(&contents)?;

    Ok(settings)
}

/// Resolve settings once at startup, falling back to
/// [`default_config_path`] when no path is given.
pub fn load_settings(path: Option<&Path>, env: &dyn EnvSource) -> Result<Settings> {
    resolve_settings(path, &default_config_path(), env)
}

/// - An explicit `path` must exist.
/// - Without one, `default_path` is read if present, otherwise all defaults
///   apply.
/// - The environment is overlaid last.
pub fn resolve_settings(
    path: Option<&Path>,
    default_path: &Path,
    env: &dyn EnvSource,
) -> Result<Settings> {
    let mut settings = match path {
        Some(p) => load_from_path(p)?,
        None if default_path.is_file() => load_from_path(default_path)?,
        None => Settings::default(),
    };

    settings.apply_env(env);
    Ok(settings)
}

/// `Flymigrate.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Flymigrate.toml")
}
