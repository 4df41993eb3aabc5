// src/config/validate.rs

use std::path::Path;

use crate::config::model::{LauncherConfig, RawLauncherConfig};
use crate::errors::{EvalrunError, Result};

impl TryFrom<RawLauncherConfig> for LauncherConfig {
    type Error = crate::errors::EvalrunError;

    fn try_from(raw: RawLauncherConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(LauncherConfig::new_unchecked(raw.paths, raw.engine, raw.display))
    }
}

fn validate_raw_config(cfg: &RawLauncherConfig) -> Result<()> {
    validate_paths(cfg)?;
    validate_engine(cfg)?;
    validate_display(cfg)?;
    Ok(())
}

fn ensure_path(field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(EvalrunError::ConfigError(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn validate_paths(cfg: &RawLauncherConfig) -> Result<()> {
    ensure_path("[paths].database_dir", &cfg.paths.database_dir)?;
    ensure_path("[paths].config_template", &cfg.paths.config_template)?;
    if let Some(template) = &cfg.paths.content_template {
        ensure_path("[paths].content_template", template)?;
    }

    let name = cfg.paths.materialized_name.trim();
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return Err(EvalrunError::ConfigError(format!(
            "[paths].materialized_name must be a plain file name (got {:?})",
            cfg.paths.materialized_name
        )));
    }
    Ok(())
}

fn ensure_env_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains('=') || name.contains('\0') {
        return Err(EvalrunError::ConfigError(format!(
            "{field} is not a usable environment variable name: {name:?}"
        )));
    }
    Ok(())
}

fn validate_engine(cfg: &RawLauncherConfig) -> Result<()> {
    ensure_path("[engine].executable", &cfg.engine.executable)?;
    ensure_path("[engine].script", &cfg.engine.script)?;
    ensure_env_name("[engine].config_env", &cfg.engine.config_env)?;
    ensure_env_name("[engine].query_env", &cfg.engine.query_env)?;

    if cfg.engine.grace_period_ms == 0 {
        return Err(EvalrunError::ConfigError(
            "[engine].grace_period_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_display(cfg: &RawLauncherConfig) -> Result<()> {
    if cfg.display.priority.iter().any(|p| p.trim().is_empty()) {
        return Err(EvalrunError::ConfigError(
            "[display].priority entries must not be blank".to_string(),
        ));
    }
    Ok(())
}
