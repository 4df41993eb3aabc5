// src/exec/backend.rs

//! Pluggable engine backend abstraction.
//!
//! The launcher talks to an `EngineBackend` instead of spawning processes
//! itself. Production uses [`RealEngine`], which wraps [`supervise`]; tests
//! can provide a backend that, for example, drops files into the run's
//! output directory and returns canned stream text.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use crate::config::LauncherConfig;
use crate::errors::Result;

use super::supervisor::{EngineCommand, SupervisedProcessResult, supervise};

/// Trait abstracting how the engine is invoked for one run.
pub trait EngineBackend: Send {
    /// Run the engine against the materialized configuration at
    /// `config_path`, honouring `timeout` if given.
    fn run_engine(
        &mut self,
        config_path: PathBuf,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<SupervisedProcessResult>> + Send + '_>>;
}

/// Real engine backend used in production.
#[derive(Debug, Clone)]
pub struct RealEngine {
    command: EngineCommand,
}

impl RealEngine {
    pub fn new(command: EngineCommand) -> Self {
        Self { command }
    }

    pub fn from_config(cfg: &LauncherConfig) -> Self {
        Self::new(EngineCommand::from_config(cfg))
    }
}

impl EngineBackend for RealEngine {
    fn run_engine(
        &mut self,
        config_path: PathBuf,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<SupervisedProcessResult>> + Send + '_>> {
        Box::pin(async move { supervise(&self.command, &config_path, timeout).await })
    }
}
