//! Output directories and output artifacts.
//!
//! Only rank 0 touches the file system. Every function here is collective: all ranks call it,
//! and all ranks return an error if rank 0 failed.
use crate::comm::ExecutionContext;
use crate::process::ProcessKind;
use eyre::{eyre, Context};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the VTK field file inside a job's output directory.
pub const FIELDS_FILE: &str = "fields.vtk";
/// Name of the per-grain archive inside a job's output directory.
pub const GRAIN_ARCHIVE_FILE: &str = "grain-averages.json";

/// `<root>/Outputs/<suite>/<process>/<name_0>-<name_1>-...[-<options>]`
pub fn output_directory(
    root: impl AsRef<Path>,
    suite: &str,
    process: ProcessKind,
    names: &[&str],
    options: Option<&str>,
) -> PathBuf {
    let mut leaf = names.join("-");
    if let Some(options) = options {
        leaf.push('-');
        leaf.push_str(options);
    }
    root.as_ref()
        .join("Outputs")
        .join(suite)
        .join(process.name())
        .join(leaf)
}

/// Runs `action` on rank 0 and makes its success or failure known to every rank.
fn on_root<T>(ctx: &ExecutionContext, action: impl FnOnce() -> eyre::Result<T>) -> eyre::Result<Option<T>> {
    let result = if ctx.is_root() { action().map(Some) } else { Ok(None) };
    ctx.agree(result, || eyre!("rank 0 failed to write outputs"))
}

/// Creates `directory` on rank 0 while the other ranks wait.
pub fn prepare_output_directory(ctx: &ExecutionContext, directory: &Path) -> eyre::Result<()> {
    ctx.sync_to_root();
    let result = on_root(ctx, || {
        std::fs::create_dir_all(directory)
            .wrap_err_with(|| format!("failed to create output directory {}", directory.display()))?;
        info!("Writing outputs to {}", directory.display());
        Ok(())
    });
    ctx.sync_from_root();
    result.map(|_| ())
}

/// Writes `archive` as pretty-printed JSON to the grain archive file of `directory`.
pub fn write_grain_archive<A: Serialize>(ctx: &ExecutionContext, directory: &Path, archive: &A) -> eyre::Result<PathBuf> {
    let path = directory.join(GRAIN_ARCHIVE_FILE);
    on_root(ctx, || {
        let json = serde_json::to_string_pretty(archive).wrap_err("failed to serialize grain archive")?;
        std::fs::write(&path, json).wrap_err_with(|| format!("failed to write {}", path.display()))?;
        Ok(())
    })?;
    Ok(path)
}

/// Exports a VTK field file on rank 0. `export` is only called on rank 0.
pub fn write_fields(
    ctx: &ExecutionContext,
    directory: &Path,
    export: impl FnOnce(&Path) -> eyre::Result<()>,
) -> eyre::Result<PathBuf> {
    let path = directory.join(FIELDS_FILE);
    on_root(ctx, || export(&path).wrap_err_with(|| format!("failed to write {}", path.display())))?;
    Ok(path)
}
