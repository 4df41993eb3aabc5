// src/config/mod.rs

//! Launcher settings for evalrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a settings file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    DisplaySection, EngineSection, LauncherConfig, PathsSection, RawLauncherConfig,
};
