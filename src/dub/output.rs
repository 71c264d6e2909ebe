//! Destination handling shared by every file the crate hands back to the
//! caller: the composed video and the rescaled subtitle sidecar.

use std::fs;
use std::io;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use super::error::{DubError, DubResult};

/// Refuse an existing destination unless `force` is set.
pub fn check_destination(output: &Path, force: bool) -> DubResult<()> {
    if output.is_dir() {
        return Err(DubError::Composition(format!(
            "output path {} is a directory",
            output.display()
        )));
    }
    if output.exists() && !force {
        return Err(DubError::OutputExists(output.to_path_buf()));
    }
    Ok(())
}

/// Whether two paths name the same existing file, however they are spelled.
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// A temp file beside `output`, removed on drop unless persisted.
pub fn staging_file(output: &Path) -> DubResult<NamedTempFile> {
    let dir = output_dir(output);
    fs::create_dir_all(dir)?;

    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let suffix = output
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    Ok(Builder::new()
        .prefix(&format!(".{stem}.partial-"))
        .suffix(&suffix)
        .tempfile_in(dir)?)
}

/// Rename a finished staging file onto `output`.
pub fn persist(staging: NamedTempFile, output: &Path, force: bool) -> DubResult<()> {
    let result = if force {
        staging.persist(output)
    } else {
        staging.persist_noclobber(output)
    };

    match result {
        Ok(_) => Ok(()),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
            Err(DubError::OutputExists(output.to_path_buf()))
        }
        Err(err) => Err(DubError::Io(err.error)),
    }
}
