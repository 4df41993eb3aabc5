// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the external engine,
//! using `tokio::process::Command`, and handing its captured output back to
//! the launcher.
//!
//! - [`supervisor`] spawns the engine, collects stdout/stderr line by line,
//!   and enforces the timeout with a terminate-then-kill sequence.
//! - [`backend`] provides the `EngineBackend` trait and a concrete
//!   `RealEngine` that the launcher uses in production, and which tests can
//!   replace with a fake implementation.

pub mod backend;
pub mod supervisor;

pub use backend::{EngineBackend, RealEngine};
pub use supervisor::{EngineCommand, SupervisedProcessResult, supervise};
