// src/select.rs

//! Choosing the markdown document to show for a finished run.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::fs::FileSystem;

/// A markdown file picked for display, with its content at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayArtifact {
    pub path: PathBuf,
    pub content: String,
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn lowercase_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// All markdown files under `dir`, recursively.
///
/// Files of a directory come before those of its subdirectories; within a
/// directory the order is whatever the filesystem reports. Unreadable
/// subdirectories are skipped.
pub fn collect_markdown_files(fs: &dyn FileSystem, dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match fs.read_dir(&current) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = ?current, error = %e, "cannot list directory; skipping");
                continue;
            }
        };

        let mut subdirs = Vec::new();
        for entry in entries {
            if fs.is_dir(&entry) {
                subdirs.push(entry);
            } else if fs.is_file(&entry) && is_markdown(&entry) {
                found.push(entry);
            }
        }
        // Reverse so the first listed subdirectory is visited first.
        pending.extend(subdirs.into_iter().rev());
    }

    found
}

/// Pick the display document from `dir` using `priority` (most specific
/// name first).
///
/// 1. exact, case-insensitive file name match, in priority order;
/// 2. case-insensitive match of a priority name's stem anywhere in a file
///    name, in priority order;
/// 3. the first enumerated file.
///
/// Candidates that fail to read are skipped. If the final fallback cannot
/// be read its path is still returned, with an error note as content.
/// Returns `None` only when there is no markdown file at all.
pub fn select_display(
    fs: &dyn FileSystem,
    dir: &Path,
    priority: &[String],
) -> Option<DisplayArtifact> {
    let files = collect_markdown_files(fs, dir);
    if files.is_empty() {
        info!(dir = ?dir, "no markdown files found in workspace directory");
        return None;
    }

    info!(count = files.len(), "found markdown files in workspace directory");
    for file in &files {
        debug!("  - {}", file.strip_prefix(dir).unwrap_or(file).display());
    }

    let names: Vec<String> = files.iter().map(|f| lowercase_name(f)).collect();

    for wanted in priority {
        let wanted = wanted.to_lowercase();
        for (file, name) in files.iter().zip(&names) {
            if *name == wanted {
                if let Some(artifact) = try_read(fs, file) {
                    info!(file = ?file, "selected priority file");
                    return Some(artifact);
                }
            }
        }
    }

    for wanted in priority {
        let wanted = wanted.to_lowercase();
        let stem = wanted.split('.').next().unwrap_or(&wanted);
        for (file, name) in files.iter().zip(&names) {
            if name.contains(stem) {
                if let Some(artifact) = try_read(fs, file) {
                    info!(file = ?file, "selected partial priority match");
                    return Some(artifact);
                }
            }
        }
    }

    let first = &files[0];
    info!(file = ?first, "using first available markdown file");
    let content = match fs.read_to_string(first) {
        Ok(content) => content,
        Err(e) => {
            warn!(file = ?first, error = %e, "cannot read fallback markdown file");
            format!("Error reading file: {e}")
        }
    };
    Some(DisplayArtifact {
        path: first.clone(),
        content,
    })
}

fn try_read(fs: &dyn FileSystem, path: &Path) -> Option<DisplayArtifact> {
    match fs.read_to_string(path) {
        Ok(content) => Some(DisplayArtifact {
            path: path.to_path_buf(),
            content,
        }),
        Err(e) => {
            warn!(file = ?path, error = %e, "cannot read candidate file; trying next");
            None
        }
    }
}
