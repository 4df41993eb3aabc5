// src/workspace.rs

//! Per-run directory layout.
//!
//! Every run owns `<database_dir>/<run_id>/` with three children:
//!
//! ```text
//! <run_id>/
//!   input/          staged inputs and the content template
//!   workspace_dir/  where the engine deposits its results
//!   configs/        the materialized engine configuration
//! ```

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::{info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

pub const INPUT_DIR: &str = "input";
pub const WORKSPACE_DIR: &str = "workspace_dir";
pub const CONFIGS_DIR: &str = "configs";

/// Identifies one workflow execution and the directories it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: String,
    pub base_dir: PathBuf,
    pub input_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub configs_dir: PathBuf,
    /// The id was generated because the caller supplied none.
    pub fallback_id: bool,
}

impl RunContext {
    /// Derive the layout for `run_id` under `root` without touching disk.
    pub fn layout(root: &Path, run_id: &str, fallback_id: bool) -> Self {
        let base_dir = root.join(run_id);
        Self {
            run_id: run_id.to_string(),
            input_dir: base_dir.join(INPUT_DIR),
            workspace_dir: base_dir.join(WORKSPACE_DIR),
            configs_dir: base_dir.join(CONFIGS_DIR),
            base_dir,
            fallback_id,
        }
    }
}

/// Create (or reuse) the directory tree for a run.
///
/// A missing or blank `run_id` is replaced by a random 12-digit hex token.
/// The id is not sanitized; callers are trusted to pass filesystem-safe
/// tokens. Filesystem errors propagate unchanged.
pub fn provision(
    fs: &dyn FileSystem,
    database_dir: &Path,
    run_id: Option<&str>,
) -> Result<RunContext> {
    let ctx = resolve_layout(database_dir, run_id)?;
    create_layout(fs, &ctx)?;
    Ok(ctx)
}

/// Create the directories of an already resolved layout. Idempotent.
pub fn create_layout(fs: &dyn FileSystem, ctx: &RunContext) -> Result<()> {
    for dir in [&ctx.input_dir, &ctx.workspace_dir, &ctx.configs_dir] {
        fs.create_dir_all(dir)?;
    }

    info!(
        run_id = %ctx.run_id,
        base_dir = ?ctx.base_dir,
        fallback_id = ctx.fallback_id,
        "run directories ready"
    );
    Ok(())
}

/// Copy caller-supplied files into the run's input directory, by file name.
pub fn stage_inputs(fs: &dyn FileSystem, ctx: &RunContext, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(inputs.len());
    for input in inputs {
        let name = input
            .file_name()
            .ok_or_else(|| anyhow!("input path {:?} has no file name", input))?;
        let dest = ctx.input_dir.join(name);
        fs.copy(input, &dest)?;
        info!(from = ?input, to = ?dest, "staged input file");
        staged.push(dest);
    }
    Ok(staged)
}

/// Resolve the absolute layout a run would use, generating a fallback id if
/// needed. Nothing is created.
pub fn resolve_layout(database_dir: &Path, run_id: Option<&str>) -> Result<RunContext> {
    let root = std::path::absolute(database_dir)?;

    match run_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => Ok(RunContext::layout(&root, id, false)),
        None => {
            let id = generate_fallback_run_id()?;
            warn!(run_id = %id, "no run id supplied; using generated fallback id");
            Ok(RunContext::layout(&root, &id, true))
        }
    }
}

/// Twelve lowercase hex digits from the OS RNG.
pub fn generate_fallback_run_id() -> Result<String> {
    let mut bytes = [0_u8; 6];
    getrandom::getrandom(&mut bytes)
        .map_err(|err| anyhow!("failed to generate fallback run id randomness: {err}"))?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn provision_is_idempotent() {
        let fs = MockFileSystem::new();
        let first = provision(&fs, Path::new("/db"), Some("r1")).unwrap();
        let second = provision(&fs, Path::new("/db"), Some("r1")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.workspace_dir, PathBuf::from("/db/r1/workspace_dir"));
        assert!(fs.is_dir(&first.input_dir));
        assert!(fs.is_dir(&first.configs_dir));
    }

    #[test]
    fn blank_run_id_gets_fallback() {
        let fs = MockFileSystem::new();
        for id in [None, Some(""), Some("   ")] {
            let ctx = provision(&fs, Path::new("/db"), id).unwrap();
            assert!(ctx.fallback_id);
            assert_eq!(ctx.run_id.len(), 12);
            assert!(ctx.run_id.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(fs.is_dir(&ctx.workspace_dir));
        }
    }

    #[test]
    fn padded_run_id_is_kept_verbatim() {
        let fs = MockFileSystem::new();
        let ctx = provision(&fs, Path::new("/db"), Some(" r1 ")).unwrap();

        assert!(!ctx.fallback_id);
        assert_eq!(ctx.run_id, " r1 ");
        assert_eq!(ctx.base_dir, PathBuf::from("/db/ r1 "));
        assert!(fs.is_dir(&ctx.workspace_dir));
    }

    #[test]
    fn inputs_are_staged_by_file_name() {
        let fs = MockFileSystem::new();
        fs.add_file("/uploads/deal/rent_roll.csv", "unit,rent");
        let ctx = provision(&fs, Path::new("/db"), Some("r1")).unwrap();

        let staged = stage_inputs(&fs, &ctx, &[PathBuf::from("/uploads/deal/rent_roll.csv")]).unwrap();
        assert_eq!(staged, vec![PathBuf::from("/db/r1/input/rent_roll.csv")]);
        assert_eq!(fs.read_to_string(&staged[0]).unwrap(), "unit,rent");

        assert!(stage_inputs(&fs, &ctx, &[PathBuf::from("/uploads/missing.pdf")]).is_err());
    }

    #[test]
    fn all_directories_share_the_run_segment() {
        let ctx = RunContext::layout(Path::new("/db"), "abc", false);
        for dir in [&ctx.input_dir, &ctx.workspace_dir, &ctx.configs_dir] {
            assert_eq!(dir.parent(), Some(ctx.base_dir.as_path()));
        }
    }
}
