// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{LauncherConfig, RawLauncherConfig};
use crate::errors::Result;

/// Load a settings file from a given path and return the raw
/// `RawLauncherConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawLauncherConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawLauncherConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a settings file from path and run validation.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<LauncherConfig> {
    let raw_config = load_from_path(&path)?;
    let config = LauncherConfig::try_from(raw_config)?;
    Ok(config)
}

/// `Evalrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Evalrun.toml")
}
