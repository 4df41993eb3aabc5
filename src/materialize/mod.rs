// src/materialize/mod.rs

//! Per-run engine configuration.
//!
//! - [`materialize`] copies the configuration template into the run's
//!   `configs/` directory, stages the content template into `input/`, points
//!   the three path fields at the run's directories and injects the optional
//!   user query.
//! - [`patch`] holds the text-level edits.

pub mod patch;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::LauncherConfig;
use crate::errors::Result;
use crate::fs::{FileSystem, to_forward_slash};
use crate::workspace::RunContext;

use patch::{escape_basic_string, insert_user_query, rewrite_quoted_field};

const QUERY_PREVIEW_CHARS: usize = 50;
const CONFIG_PREVIEW_CHARS: usize = 500;

/// Produce the materialized configuration for `ctx` and return its path.
pub fn materialize(
    fs: &dyn FileSystem,
    cfg: &LauncherConfig,
    ctx: &RunContext,
    user_query: Option<&str>,
) -> Result<PathBuf> {
    let config_path = ctx.configs_dir.join(&cfg.paths.materialized_name);
    fs.copy(&cfg.paths.config_template, &config_path)?;
    info!(
        from = ?cfg.paths.config_template,
        to = ?config_path,
        "copied configuration template"
    );

    if let Some(template) = &cfg.paths.content_template {
        stage_content_template(fs, template, &ctx.input_dir)?;
    }

    let mut content = fs.read_to_string(&config_path)?;

    let fields = [
        ("input_dir", &ctx.input_dir),
        ("output_dir", &ctx.workspace_dir),
        ("workspace_root", &ctx.workspace_dir),
    ];
    for (key, dir) in fields {
        let (rewritten, count) = rewrite_quoted_field(&content, key, &to_forward_slash(dir))?;
        if count == 0 {
            warn!(key, "configuration template has no quoted `{key}` assignment");
        } else {
            debug!(key, count, dir = ?dir, "rewrote path field");
        }
        content = rewritten;
    }

    match user_query.filter(|q| !q.trim().is_empty()) {
        Some(query) => {
            let preview: String = query.chars().take(QUERY_PREVIEW_CHARS).collect();
            let ellipsis = if query.chars().count() > QUERY_PREVIEW_CHARS {
                "..."
            } else {
                ""
            };
            info!("injecting user query: {preview}{ellipsis}");
            content = insert_user_query(&content, &escape_basic_string(query))?;
        }
        None => info!("no user query provided, or query is blank"),
    }

    fs.write(&config_path, content.as_bytes())?;

    let preview: String = content.chars().take(CONFIG_PREVIEW_CHARS).collect();
    debug!(
        path = ?config_path,
        bytes = content.len(),
        "materialized configuration written:\n{preview}"
    );

    Ok(config_path)
}

/// Copy the document template into `input_dir`, keeping its file name.
/// A template missing on disk is skipped with a warning.
fn stage_content_template(fs: &dyn FileSystem, template: &Path, input_dir: &Path) -> Result<()> {
    let Some(name) = template.file_name() else {
        warn!(template = ?template, "content template path has no file name; skipping");
        return Ok(());
    };
    if !fs.is_file(template) {
        warn!(template = ?template, "content template not found; skipping");
        return Ok(());
    }

    let dest = input_dir.join(name);
    fs.copy(template, &dest)?;
    info!(from = ?template, to = ?dest, "copied content template");
    Ok(())
}
