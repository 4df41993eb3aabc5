use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use evalrun::errors::{EvalrunError, Result};
use evalrun::exec::{EngineBackend, SupervisedProcessResult};
use evalrun::fs::FileSystem;

/// How a [`ScriptedEngine`] run ends.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    Timeout {
        stdout: String,
        stderr: String,
    },
    MissingDependency,
    SpawnFailure(String),
}

impl FakeOutcome {
    pub fn success(stdout: &str) -> Self {
        FakeOutcome::Exit {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }
}

/// One recorded `run_engine` call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub config_path: PathBuf,
    pub config_text: String,
    pub timeout: Option<Duration>,
}

/// A fake engine that:
/// - records every invocation (with the materialized config text)
/// - writes the given files into the `[io].output_dir` of the config
/// - ends with a scripted outcome.
pub struct ScriptedEngine<F: FileSystem + Clone> {
    fs: F,
    outputs: Vec<(String, String)>,
    outcome: FakeOutcome,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl<F: FileSystem + Clone> ScriptedEngine<F> {
    pub fn new(fs: F, outcome: FakeOutcome) -> Self {
        Self {
            fs,
            outputs: Vec::new(),
            outcome,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Produce `relative` (under the output dir) with `content`.
    pub fn producing(mut self, relative: &str, content: &str) -> Self {
        self.outputs.push((relative.to_string(), content.to_string()));
        self
    }

    pub fn invocations(&self) -> Arc<Mutex<Vec<Invocation>>> {
        Arc::clone(&self.invocations)
    }

    fn output_dir(config_text: &str) -> Option<PathBuf> {
        let table: toml::Table = toml::from_str(config_text).ok()?;
        table
            .get("io")?
            .get("output_dir")?
            .as_str()
            .map(PathBuf::from)
    }
}

impl<F: FileSystem + Clone + 'static> EngineBackend for ScriptedEngine<F> {
    fn run_engine(
        &mut self,
        config_path: PathBuf,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Result<SupervisedProcessResult>> + Send + '_>> {
        Box::pin(async move {
            if let FakeOutcome::MissingDependency = self.outcome {
                return Err(EvalrunError::MissingDependency {
                    what: "engine script",
                    path: PathBuf::from("/fake/run_flow.py"),
                });
            }

            let config_text = self.fs.read_to_string(&config_path)?;
            {
                let mut guard = self.invocations.lock().unwrap();
                guard.push(Invocation {
                    config_path: config_path.clone(),
                    config_text: config_text.clone(),
                    timeout,
                });
            }

            if let Some(out_dir) = Self::output_dir(&config_text) {
                for (relative, content) in &self.outputs {
                    self.fs
                        .write(&out_dir.join(Path::new(relative)), content.as_bytes())?;
                }
            }

            match self.outcome.clone() {
                FakeOutcome::Exit {
                    code,
                    stdout,
                    stderr,
                } => Ok(SupervisedProcessResult {
                    exit_code: code,
                    stdout,
                    stderr,
                }),
                FakeOutcome::Timeout { stdout, stderr } => Err(EvalrunError::EngineTimeout {
                    after: timeout.unwrap_or(Duration::from_secs(1)),
                    partial: Box::new(SupervisedProcessResult {
                        exit_code: -1,
                        stdout,
                        stderr,
                    }),
                }),
                FakeOutcome::SpawnFailure(msg) => Err(anyhow::anyhow!(msg).into()),
                FakeOutcome::MissingDependency => unreachable!(),
            }
        })
    }
}
