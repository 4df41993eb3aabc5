// src/history.rs

//! Browsing runs left under the database directory.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::materialize::patch::{RUNFLOW_SECTION, USER_QUERY_KEY};
use crate::workspace::{CONFIGS_DIR, WORKSPACE_DIR};

/// One past run, as far as its directory tree tells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub id: String,
    pub modified: SystemTime,
    /// `[runflow].user_query` of the materialized configuration.
    pub query: Option<String>,
    /// Regular files directly inside `workspace_dir/`.
    pub files_count: usize,
    /// Any markdown file directly inside `workspace_dir/`.
    pub has_results: bool,
}

/// Every run under `database_dir` that has a workspace directory, most
/// recent first. A missing database directory yields an empty list.
pub fn list_runs(
    fs: &dyn FileSystem,
    database_dir: &Path,
    materialized_name: &str,
) -> Result<Vec<RunSummary>> {
    if !fs.is_dir(database_dir) {
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    for run_dir in fs.read_dir(database_dir)? {
        if !fs.is_dir(&run_dir) {
            continue;
        }
        let workspace = run_dir.join(WORKSPACE_DIR);
        if !fs.is_dir(&workspace) {
            continue;
        }
        let Some(id) = run_dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let files = list_files(fs, &workspace)?;
        let has_results = files.iter().any(|f| {
            f.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("md"))
        });

        let modified = fs.modified(&run_dir).unwrap_or_else(|e| {
            warn!(run = %id, error = %e, "cannot read run directory mtime");
            SystemTime::UNIX_EPOCH
        });

        let config = run_dir.join(CONFIGS_DIR).join(materialized_name);
        runs.push(RunSummary {
            query: read_query(fs, &config),
            files_count: files.len(),
            has_results,
            modified,
            id,
        });
    }

    runs.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.id.cmp(&b.id)));
    Ok(runs)
}

/// Regular files directly inside a run's workspace directory.
pub fn list_workspace_files(
    fs: &dyn FileSystem,
    database_dir: &Path,
    run_id: &str,
) -> Result<Vec<PathBuf>> {
    let workspace = database_dir.join(run_id).join(WORKSPACE_DIR);
    if !fs.is_dir(&workspace) {
        return Ok(Vec::new());
    }
    list_files(fs, &workspace)
}

/// File content, or a short markdown note when the file does not exist.
pub fn read_file(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    if !fs.exists(path) {
        return Ok(format!(
            "# File Not Found\n\nThe file {} was not found.",
            path.display()
        ));
    }
    Ok(fs.read_to_string(path)?)
}

fn list_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .collect())
}

fn read_query(fs: &dyn FileSystem, config: &Path) -> Option<String> {
    if !fs.is_file(config) {
        return None;
    }
    let text = match fs.read_to_string(config) {
        Ok(text) => text,
        Err(e) => {
            warn!(config = ?config, error = %e, "cannot read materialized config");
            return None;
        }
    };
    match toml::from_str::<toml::Table>(&text) {
        Ok(table) => table
            .get(RUNFLOW_SECTION)
            .and_then(|section| section.get(USER_QUERY_KEY))
            .and_then(|value| value.as_str())
            .map(str::to_string),
        Err(e) => {
            debug!(config = ?config, error = %e, "materialized config is not valid TOML");
            None
        }
    }
}
