// src/exec/supervisor.rs

//! Engine process supervision.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use crate::config::LauncherConfig;
use crate::errors::{EvalrunError, Result};

/// Upper bound on waiting for the output pipes to close once the engine is
/// gone. Grandchildren that inherited the pipes can keep them open forever.
const DRAIN_LIMIT: Duration = Duration::from_secs(2);

/// Outcome of one engine invocation.
///
/// Each stream is the concatenation of its lines in arrival order; the two
/// streams are not interleaved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisedProcessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Everything needed to start the engine, independent of any one run.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    pub executable: PathBuf,
    pub script: PathBuf,
    /// Variable that receives the materialized configuration path.
    pub config_env: String,
    pub working_dir: Option<PathBuf>,
    pub echo_output: bool,
    pub grace_period: Duration,
}

impl EngineCommand {
    pub fn from_config(cfg: &LauncherConfig) -> Self {
        Self {
            executable: cfg.engine.executable.clone(),
            script: cfg.engine.script.clone(),
            config_env: cfg.engine.config_env.clone(),
            working_dir: cfg.engine.working_dir.clone(),
            echo_output: cfg.engine.echo_output,
            grace_period: cfg.grace_period(),
        }
    }
}

#[derive(Debug)]
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

#[derive(Debug, Default)]
struct OutputCollector {
    echo: bool,
    stdout: String,
    stderr: String,
}

impl OutputCollector {
    fn new(echo: bool) -> Self {
        Self {
            echo,
            ..Self::default()
        }
    }

    fn push(&mut self, line: OutputLine) {
        match line {
            OutputLine::Stdout(line) => {
                if self.echo {
                    info!("STDOUT: {}", line.trim_end());
                }
                self.stdout.push_str(&line);
            }
            OutputLine::Stderr(line) => {
                if self.echo {
                    info!("STDERR: {}", line.trim_end());
                }
                self.stderr.push_str(&line);
            }
        }
    }

    fn finish(self, exit_code: i32) -> SupervisedProcessResult {
        SupervisedProcessResult {
            exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

/// Run the engine once against `config_path`.
///
/// - Fails with [`EvalrunError::MissingDependency`] before spawning if the
///   executable or script is absent.
/// - A non-zero exit status is a normal result, not an error.
/// - When `timeout` expires the engine gets SIGTERM, then a kill after the
///   grace period, and [`EvalrunError::EngineTimeout`] carries the output
///   captured up to that point.
pub async fn supervise(
    engine: &EngineCommand,
    config_path: &Path,
    timeout: Option<Duration>,
) -> Result<SupervisedProcessResult> {
    ensure_present("engine executable", &engine.executable)?;
    ensure_present("engine script", &engine.script)?;

    info!(
        executable = ?engine.executable,
        script = ?engine.script,
        config = ?config_path,
        timeout_secs = ?timeout.map(|t| t.as_secs()),
        "starting engine process"
    );

    let mut command = Command::new(&engine.executable);
    command
        .arg(&engine.script)
        .env(&engine.config_env, config_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &engine.working_dir {
        command.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = command
        .spawn()
        .with_context(|| format!("spawning engine process {:?}", engine.executable))?;

    let (tx, mut rx) = mpsc::channel::<OutputLine>(256);
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, tx.clone(), OutputLine::Stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, tx.clone(), OutputLine::Stderr);
    }
    // Readers hold the only senders: the channel closes once both pipes hit EOF.
    drop(tx);

    let mut collector = OutputCollector::new(engine.echo_output);

    let deadline = async {
        match timeout {
            Some(limit) => sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let status = loop {
        tokio::select! {
            Some(line) = rx.recv() => collector.push(line),
            status = child.wait() => {
                break Some(status.context("waiting for engine process")?);
            }
            _ = &mut deadline => break None,
        }
    };

    match status {
        Some(status) => {
            drain_remaining(&mut rx, &mut collector).await;
            let code = status.code().unwrap_or(-1);
            info!(
                exit_code = code,
                success = status.success(),
                elapsed_secs = started.elapsed().as_secs_f64(),
                "engine process exited"
            );
            Ok(collector.finish(code))
        }
        None => {
            let after = timeout.unwrap_or_default();
            warn!(timeout_secs = after.as_secs(), "engine timed out; terminating");
            let code = terminate_then_kill(&mut child, engine.grace_period).await;
            drain_remaining(&mut rx, &mut collector).await;
            Err(EvalrunError::EngineTimeout {
                after,
                partial: Box::new(collector.finish(code)),
            })
        }
    }
}

fn ensure_present(what: &'static str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(EvalrunError::MissingDependency {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Forward every line of `reader` (newline included) into `tx`.
/// Invalid UTF-8 is replaced rather than ending the stream.
fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<OutputLine>, wrap: fn(String) -> OutputLine)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(wrap(line)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "engine output stream read failed");
                    break;
                }
            }
        }
    });
}

/// Collect what the readers still have, bounded by [`DRAIN_LIMIT`].
async fn drain_remaining(rx: &mut mpsc::Receiver<OutputLine>, collector: &mut OutputCollector) {
    let until = Instant::now() + DRAIN_LIMIT;
    loop {
        match timeout_at(until, rx.recv()).await {
            Ok(Some(line)) => collector.push(line),
            Ok(None) => break,
            Err(_) => {
                warn!("engine output pipes still open; dropping whatever comes later");
                break;
            }
        }
    }
}

/// Ask the engine to stop, then kill it if it is still alive after `grace`.
/// Returns the exit code, `-1` when it ended by signal or is unknown.
async fn terminate_then_kill(child: &mut Child, grace: Duration) -> i32 {
    request_termination(child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => return status.code().unwrap_or(-1),
        Ok(Err(e)) => warn!(error = %e, "waiting for terminated engine failed"),
        Err(_) => warn!(
            grace_ms = grace.as_millis() as u64,
            "engine did not terminate within grace period; killing"
        ),
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill engine process");
    }
    -1
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: sends a signal to a pid we spawned and have not reaped yet.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            warn!(pid, "failed to deliver SIGTERM to engine process");
        }
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "failed to request engine termination");
    }
}
