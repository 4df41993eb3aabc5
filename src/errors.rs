// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::exec::SupervisedProcessResult;

#[derive(Error, Debug)]
pub enum EvalrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The engine executable or its entry script is absent. Raised before
    /// anything is spawned.
    #[error("Missing dependency: {what} not found: {}", path.display())]
    MissingDependency { what: &'static str, path: PathBuf },

    /// The engine outlived its wall-clock budget and was reclaimed.
    ///
    /// `partial` holds whatever both streams produced before termination.
    #[error("Engine timed out after {} seconds", after.as_secs())]
    EngineTimeout {
        after: Duration,
        partial: Box<SupervisedProcessResult>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EvalrunError>;
