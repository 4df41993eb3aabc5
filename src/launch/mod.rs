// src/launch/mod.rs

//! One complete run: provision → materialize → supervise → select.
//!
//! [`launch`] never returns an error. Every failure is turned into a
//! displayable markdown document (see [`reports`]); only when even that
//! cannot be written does the caller get exit code 1 and no document.

pub mod reports;

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::LauncherConfig;
use crate::errors::{EvalrunError, Result};
use crate::exec::{EngineBackend, SupervisedProcessResult};
use crate::fs::FileSystem;
use crate::materialize::materialize;
use crate::select::select_display;
use crate::types::RunStatus;
use crate::workspace::{RunContext, create_layout, provision, resolve_layout, stage_inputs};

use reports::{
    ReportKind, critical_error_report, no_output_report, script_error_report, write_report,
};

/// Exit code reported when the engine could not be run to completion
/// (spawn failure, timeout).
pub const ENGINE_FAILURE_EXIT_CODE: i32 = 1;

/// What the caller asks for.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub run_id: Option<String>,
    pub user_query: Option<String>,
    /// Files copied into the run's input directory before the engine starts.
    pub inputs: Vec<PathBuf>,
}

impl LaunchRequest {
    /// Fill `user_query` from the configured environment variable unless one
    /// was given explicitly.
    pub fn with_query_from_env(mut self, cfg: &LauncherConfig) -> Self {
        if self.user_query.is_none() {
            self.user_query = query_from_env(&cfg.engine.query_env);
        }
        self
    }
}

/// Non-UTF-8 values are decoded lossily rather than dropped.
fn query_from_env(var: &str) -> Option<String> {
    let raw = std::env::var_os(var)?;
    match raw.into_string() {
        Ok(query) => Some(query),
        Err(raw) => {
            warn!(var, "user query is not valid UTF-8; decoding lossily");
            Some(raw.to_string_lossy().into_owned())
        }
    }
}

/// Everything the caller gets back from a launch.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    /// Engine exit code, forced to 0 whenever a report was synthesized.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub context: Option<RunContext>,
    pub display_path: Option<PathBuf>,
    pub display_content: String,
    pub status: RunStatus,
    pub timed_out: bool,
}

/// Run one workflow end to end.
pub async fn launch<E>(
    fs: &dyn FileSystem,
    cfg: &LauncherConfig,
    engine: &mut E,
    request: &LaunchRequest,
) -> LaunchOutcome
where
    E: EngineBackend + ?Sized,
{
    let mut known: Option<RunContext> = None;

    match run_pipeline(fs, cfg, engine, request, &mut known).await {
        Ok(outcome) => {
            info!(
                status = %outcome.status,
                exit_code = outcome.exit_code,
                display = ?outcome.display_path,
                "launch finished"
            );
            outcome
        }
        Err(err) => {
            error!(error = %err, "workflow aborted; writing script error report");
            script_error_fallback(fs, cfg, request, known, err)
        }
    }
}

async fn run_pipeline<E>(
    fs: &dyn FileSystem,
    cfg: &LauncherConfig,
    engine: &mut E,
    request: &LaunchRequest,
    known: &mut Option<RunContext>,
) -> Result<LaunchOutcome>
where
    E: EngineBackend + ?Sized,
{
    let ctx = resolve_layout(&cfg.paths.database_dir, request.run_id.as_deref())?;
    *known = Some(ctx.clone());
    create_layout(fs, &ctx)?;

    stage_inputs(fs, &ctx, &request.inputs)?;
    let config_path = materialize(fs, cfg, &ctx, request.user_query.as_deref())?;

    let (result, timed_out) = match engine.run_engine(config_path, cfg.timeout()).await {
        Ok(result) => (result, false),
        Err(EvalrunError::EngineTimeout { after, partial }) => {
            error!(timeout_secs = after.as_secs(), "engine timed out");
            let mut result = *partial;
            append_line(
                &mut result.stderr,
                &format!("Process timed out after {} seconds", after.as_secs()),
            );
            result.exit_code = ENGINE_FAILURE_EXIT_CODE;
            (result, true)
        }
        Err(err @ EvalrunError::MissingDependency { .. }) => return Err(err),
        Err(err) => {
            error!(error = %err, "error running engine");
            let result = SupervisedProcessResult {
                exit_code: ENGINE_FAILURE_EXIT_CODE,
                stdout: String::new(),
                stderr: format!("{err:#}"),
            };
            (result, false)
        }
    };

    if result.exit_code != 0 {
        warn!(exit_code = result.exit_code, "engine reported failure");
    }

    let produced = fs.read_dir(&ctx.workspace_dir)?;
    if produced.is_empty() {
        info!("workflow finished, but no workspace files were generated");
        let content = no_output_report(&result.stdout, &result.stderr);
        return Ok(deliver_report(fs, ctx, ReportKind::NoOutput, content, result, timed_out));
    }

    info!(count = produced.len(), "workspace entries found");
    match select_display(fs, &ctx.workspace_dir, &cfg.display.priority) {
        Some(artifact) => Ok(LaunchOutcome {
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
            context: Some(ctx),
            display_path: Some(artifact.path),
            display_content: artifact.content,
            status: RunStatus::Completed,
            timed_out,
        }),
        None => {
            warn!("workspace files exist, but none is suitable for display");
            let content = critical_error_report(&result.stdout, &result.stderr);
            Ok(deliver_report(fs, ctx, ReportKind::CriticalError, content, result, timed_out))
        }
    }
}

/// Write a synthesized report. Success reports exit code 0; failing to
/// write it reports exit code 1 with no document.
fn deliver_report(
    fs: &dyn FileSystem,
    ctx: RunContext,
    kind: ReportKind,
    content: String,
    result: SupervisedProcessResult,
    timed_out: bool,
) -> LaunchOutcome {
    match write_report(fs, &ctx.workspace_dir, kind, &content) {
        Ok(path) => LaunchOutcome {
            exit_code: 0,
            stdout: result.stdout,
            stderr: result.stderr,
            context: Some(ctx),
            display_path: Some(path),
            display_content: content,
            status: kind.status(),
            timed_out,
        },
        Err(err) => {
            error!(error = %err, report = kind.file_name(), "cannot write fallback report");
            LaunchOutcome {
                exit_code: 1,
                stdout: result.stdout,
                stderr: result.stderr,
                context: Some(ctx),
                display_path: None,
                display_content: kind.failure_message().to_string(),
                status: RunStatus::Unrecoverable,
                timed_out,
            }
        }
    }
}

fn script_error_fallback(
    fs: &dyn FileSystem,
    cfg: &LauncherConfig,
    request: &LaunchRequest,
    known: Option<RunContext>,
    err: EvalrunError,
) -> LaunchOutcome {
    let message = format!("{err:#}");
    let content = script_error_report(&message);

    let written = recover_context(fs, cfg, request, known).and_then(|ctx| {
        let path = write_report(fs, &ctx.workspace_dir, ReportKind::ScriptError, &content)?;
        Ok((ctx, path))
    });

    match written {
        Ok((ctx, path)) => LaunchOutcome {
            exit_code: 0,
            stdout: String::new(),
            stderr: message,
            context: Some(ctx),
            display_path: Some(path),
            display_content: content,
            status: RunStatus::ScriptError,
            timed_out: false,
        },
        Err(inner) => {
            error!(error = %inner, "cannot create script error report");
            LaunchOutcome {
                exit_code: 1,
                stdout: String::new(),
                stderr: message,
                context: None,
                display_path: None,
                display_content: ReportKind::ScriptError.failure_message().to_string(),
                status: RunStatus::Unrecoverable,
                timed_out: false,
            }
        }
    }
}

/// Reuse the layout the failed attempt resolved, or provision one anew.
fn recover_context(
    fs: &dyn FileSystem,
    cfg: &LauncherConfig,
    request: &LaunchRequest,
    known: Option<RunContext>,
) -> Result<RunContext> {
    match known {
        Some(ctx) => {
            create_layout(fs, &ctx)?;
            Ok(ctx)
        }
        None => provision(fs, &cfg.paths.database_dir, request.run_id.as_deref()),
    }
}

fn append_line(buf: &mut String, line: &str) {
    if !buf.is_empty() && !buf.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str(line);
    buf.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn non_utf8_query_env_is_decoded_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let var = "EVALRUN_LAUNCH_UNIT_NON_UTF8_QUERY";
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var(var, OsStr::from_bytes(b"cap rate \xff?")) };

        assert_eq!(query_from_env(var).as_deref(), Some("cap rate \u{FFFD}?"));
        assert_eq!(query_from_env("EVALRUN_LAUNCH_UNIT_UNSET_QUERY"), None);
    }

    #[test]
    fn append_line_keeps_lines_separate() {
        let mut buf = "partial".to_string();
        append_line(&mut buf, "timed out");
        assert_eq!(buf, "partial\ntimed out\n");

        let mut empty = String::new();
        append_line(&mut empty, "x");
        assert_eq!(empty, "x\n");
    }
}
