// src/launch/reports.rs

//! Markdown documents synthesized when the engine leaves nothing to show.

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::RunStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    NoOutput,
    CriticalError,
    ScriptError,
}

impl ReportKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportKind::NoOutput => "no_output_report.md",
            ReportKind::CriticalError => "critical_error_report.md",
            ReportKind::ScriptError => "script_error_report.md",
        }
    }

    pub fn status(&self) -> RunStatus {
        match self {
            ReportKind::NoOutput => RunStatus::NoOutput,
            ReportKind::CriticalError => RunStatus::NoDisplayableOutput,
            ReportKind::ScriptError => RunStatus::ScriptError,
        }
    }

    /// Shown when the report itself cannot be written.
    pub fn failure_message(&self) -> &'static str {
        match self {
            ReportKind::NoOutput => {
                "Workflow finished with no output, and fallback report failed."
            }
            ReportKind::CriticalError => "No display file found, and fallback report failed.",
            ReportKind::ScriptError => {
                "Critical script error and unable to create fallback report."
            }
        }
    }
}

pub fn no_output_report(stdout: &str, stderr: &str) -> String {
    format!(
        "# Workflow Finished Without Output\n\n\
         The workflow script completed without errors, but no workspace files were \
         generated in the workspace directory.\n\n\
         STDOUT:\n```\n{stdout}\n```\n\n\
         STDERR:\n```\n{stderr}\n```"
    )
}

pub fn critical_error_report(stdout: &str, stderr: &str) -> String {
    format!(
        "# Workflow Critical Error\n\n\
         Workspace files were created, but no suitable display file (e.g., .md) was found.\n\
         STDOUT:\n```\n{stdout}\n```\n\
         STDERR:\n```\n{stderr}\n```"
    )
}

pub fn script_error_report(error: &str) -> String {
    format!(
        "# Workflow Script Error Report\n\n\
         The workflow script encountered an unhandled error:\n\n\
         ```\n{error}\n```\n\n\
         Please check the server logs for more details."
    )
}

/// Write `content` as the `kind` report inside `dir`.
pub fn write_report(
    fs: &dyn FileSystem,
    dir: &Path,
    kind: ReportKind,
    content: &str,
) -> Result<PathBuf> {
    let path = dir.join(kind.file_name());
    fs.write(&path, content.as_bytes())?;
    Ok(path)
}
