// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `evalrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "evalrun",
    version,
    about = "Launch one property-evaluation run of an external engine and harvest its report.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the launcher settings file (TOML).
    ///
    /// Default: `Evalrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Evalrun.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EVALRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Provision a run, invoke the engine and print the display document.
    Run {
        /// Run identifier. A random fallback id is generated when omitted.
        #[arg(long, value_name = "ID")]
        run_id: Option<String>,

        /// Free-text query for the engine. Overrides the query env var.
        #[arg(long, value_name = "TEXT")]
        query: Option<String>,

        /// Files to stage into the run's input directory.
        #[arg(long = "input", value_name = "FILE")]
        inputs: Vec<PathBuf>,

        /// Print resolved settings and layout, but don't touch anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// List previous runs, most recent first.
    History,

    /// List the files a run left in its workspace directory.
    Files {
        #[arg(long, value_name = "ID")]
        run_id: String,
    },

    /// Print a file produced by a run.
    Show {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
