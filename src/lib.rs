// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod history;
pub mod launch;
pub mod logging;
pub mod materialize;
pub mod select;
pub mod types;
pub mod workspace;

use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::LauncherConfig;
use crate::config::loader::load_and_validate;
use crate::exec::RealEngine;
use crate::fs::RealFileSystem;
use crate::launch::{LaunchRequest, launch};
use crate::workspace::resolve_layout;

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code for the chosen subcommand.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading launcher settings from {:?}", args.config))?;
    let fs = RealFileSystem;

    match args.command {
        Command::Run {
            run_id,
            query,
            inputs,
            dry_run,
        } => {
            let request = LaunchRequest {
                run_id,
                user_query: query,
                inputs,
            }
            .with_query_from_env(&cfg);

            if dry_run {
                print_dry_run(&cfg, &request)?;
                return Ok(0);
            }

            let mut engine = RealEngine::from_config(&cfg);
            let outcome = launch(&fs, &cfg, &mut engine, &request).await;

            if let Some(ctx) = &outcome.context {
                info!(
                    run_id = %ctx.run_id,
                    status = %outcome.status,
                    timed_out = outcome.timed_out,
                    display = ?outcome.display_path,
                    "run complete"
                );
            }
            println!("{}", outcome.display_content);
            Ok(outcome.exit_code)
        }
        Command::History => {
            let runs = history::list_runs(
                &fs,
                &cfg.paths.database_dir,
                &cfg.paths.materialized_name,
            )?;
            for run in runs {
                let modified = run
                    .modified
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                println!(
                    "{}\t{}\tfiles={}\tresults={}\t{}",
                    run.id,
                    modified,
                    run.files_count,
                    run.has_results,
                    run.query.as_deref().unwrap_or("")
                );
            }
            Ok(0)
        }
        Command::Files { run_id } => {
            for file in history::list_workspace_files(&fs, &cfg.paths.database_dir, &run_id)? {
                println!("{}", file.display());
            }
            Ok(0)
        }
        Command::Show { path } => {
            println!("{}", history::read_file(&fs, &path)?);
            Ok(0)
        }
    }
}

/// Simple dry-run output: print settings and the layout a run would use.
fn print_dry_run(cfg: &LauncherConfig, request: &LaunchRequest) -> Result<()> {
    let ctx = resolve_layout(&cfg.paths.database_dir, request.run_id.as_deref())?;

    println!("evalrun dry-run");
    println!("  engine.executable = {}", cfg.engine.executable.display());
    println!("  engine.script = {}", cfg.engine.script.display());
    println!("  engine.config_env = {}", cfg.engine.config_env);
    match cfg.timeout() {
        Some(t) => println!("  engine.timeout = {}s", t.as_secs()),
        None => println!("  engine.timeout = none"),
    }
    println!("  engine.grace_period = {}ms", cfg.engine.grace_period_ms);
    println!("  paths.config_template = {}", cfg.paths.config_template.display());
    if let Some(ref template) = cfg.paths.content_template {
        println!("  paths.content_template = {}", template.display());
    }
    println!("  display.priority = {:?}", cfg.display.priority);
    println!();

    println!("run {}{}:", ctx.run_id, if ctx.fallback_id { " (fallback id)" } else { "" });
    println!("  input:     {}", ctx.input_dir.display());
    println!("  workspace: {}", ctx.workspace_dir.display());
    println!(
        "  config:    {}",
        ctx.configs_dir.join(&cfg.paths.materialized_name).display()
    );
    if !request.inputs.is_empty() {
        println!("  inputs: {:?}", request.inputs);
    }
    if let Some(ref q) = request.user_query {
        println!("  user_query: {q}");
    }

    debug!("dry-run complete (nothing created or executed)");
    Ok(())
}
