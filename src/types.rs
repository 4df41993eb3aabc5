use std::fmt;

/// How a launch ended, beyond its exit code.
///
/// Every variant except `Unrecoverable` reports exit code 0 when a report was
/// synthesized, so the caller can always display something. This status is
/// what tells a degraded run apart from a clean one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The engine ran and left a markdown document to display.
    Completed,
    /// The engine left nothing at all in the output directory.
    NoOutput,
    /// Files exist, but none of them is markdown.
    NoDisplayableOutput,
    /// Provisioning, materialization or a missing dependency aborted the run.
    ScriptError,
    /// Even the fallback report could not be written.
    Unrecoverable,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::NoOutput => "no-output",
            RunStatus::NoDisplayableOutput => "no-displayable-output",
            RunStatus::ScriptError => "script-error",
            RunStatus::Unrecoverable => "unrecoverable",
        }
    }

    /// A report was synthesized instead of showing engine output.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, RunStatus::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
