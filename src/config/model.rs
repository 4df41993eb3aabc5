// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Launcher settings exactly as read from TOML, before validation.
///
/// ```toml
/// [paths]
/// database_dir = "/srv/evalrun/database"
/// config_template = "templates/config_evaluate_property.toml"
/// content_template = "templates/IC_instruction.md"
///
/// [engine]
/// executable = "/opt/engine/.venv/bin/python"
/// script = "/opt/engine/run_flow.py"
/// timeout_secs = 600
///
/// [display]
/// priority = ["IC_report.md", "summary.md"]
/// ```
///
/// `[paths]` and `[engine]` are required; `[display]` falls back to the
/// built-in priority list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLauncherConfig {
    pub paths: PathsSection,
    pub engine: EngineSection,
    #[serde(default)]
    pub display: DisplaySection,
}

/// Validated launcher settings.
///
/// Can only be obtained through `TryFrom<RawLauncherConfig>` (see
/// `validate.rs`), so everything downstream may assume the invariants hold.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub paths: PathsSection,
    pub engine: EngineSection,
    pub display: DisplaySection,
}

impl LauncherConfig {
    pub(crate) fn new_unchecked(
        paths: PathsSection,
        engine: EngineSection,
        display: DisplaySection,
    ) -> Self {
        Self {
            paths,
            engine,
            display,
        }
    }

    /// Wall-clock budget for one engine invocation; `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.engine.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.engine.grace_period_ms)
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Root under which every run gets its own `<run_id>/` tree.
    pub database_dir: PathBuf,

    /// Engine configuration template, copied and patched per run.
    pub config_template: PathBuf,

    /// Document template staged into the run's input directory.
    /// Missing on disk is tolerated.
    #[serde(default)]
    pub content_template: Option<PathBuf>,

    /// File name of the materialized configuration inside `configs/`.
    #[serde(default = "default_materialized_name")]
    pub materialized_name: String,
}

fn default_materialized_name() -> String {
    "config_evaluate_property.toml".to_string()
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Interpreter or binary to spawn.
    pub executable: PathBuf,

    /// Entry script passed as the single argument to `executable`.
    pub script: PathBuf,

    /// Variable set for the engine, pointing at the materialized config.
    #[serde(default = "default_config_env")]
    pub config_env: String,

    /// Variable read by the launcher for the free-text user query.
    #[serde(default = "default_query_env")]
    pub query_env: String,

    /// `0` disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between the graceful termination request and the kill.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Echo each engine output line through `tracing` as it arrives.
    #[serde(default = "default_echo_output")]
    pub echo_output: bool,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_config_env() -> String {
    "OPENMANUS_CONFIG_PATH".to_string()
}

fn default_query_env() -> String {
    "OPENMANUS_QUERY".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_grace_period_ms() -> u64 {
    2000
}

fn default_echo_output() -> bool {
    true
}

/// `[display]` section: canonical report names, most specific first.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySection {
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            priority: default_priority(),
        }
    }
}

pub fn default_priority() -> Vec<String> {
    [
        "IC_report.md",
        "results_overview.md",
        "summary.md",
        "report.md",
        "output.md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
