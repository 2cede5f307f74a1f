//! Atomic, permission-strict file writes.
//!
//! Grounded on the temp-file-then-rename pattern used as a real (not just
//! dev) dependency in `NiklasRosenstein-rise/rise-cli` — write to a temp
//! path in the same directory, fsync, set the final mode, then rename.
//! A crash or error mid-write leaves the previous file (or no file)
//! intact; it never leaves a half-written target in place.

use admgr_core::Error;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// A fully written, fsynced, permission-set temp file waiting to be
/// renamed into place. Staging is split from committing so a caller that
/// writes several related files (e.g. a certificate's key/cert/metadata
/// trio) can stage all of them first and only rename any of them once
/// every write has succeeded — a failure partway through staging then
/// never touches a single final path, leaving whatever was there before
/// untouched.
pub struct StagedWrite {
    tmp: tempfile::NamedTempFile,
    dest: PathBuf,
}

/// Writes `contents` to a temp file in `path`'s parent directory, fsyncs
/// it and sets its permissions to `mode`, but does not yet rename it to
/// `path`. Call `commit_staged` (or `StagedWrite::commit`) once every
/// sibling write in the same logical operation has staged successfully.
pub async fn stage_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<StagedWrite, Error> {
    let parent = path.parent().ok_or_else(|| {
        Error::storage("stage_atomic", "destination path has no parent directory")
            .with_resource(path.display().to_string())
    })?;
    tokio::fs::create_dir_all(parent).await.map_err(|e| {
        Error::storage("stage_atomic", format!("failed to create directory: {e}"))
            .with_resource(parent.display().to_string())
    })?;

    let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
        Error::storage("stage_atomic", format!("failed to create temp file: {e}"))
            .with_resource(parent.display().to_string())
    })?;

    {
        use std::io::Write;
        let mut file = tmp.as_file();
        file.write_all(contents).map_err(|e| {
            Error::storage("stage_atomic", format!("failed to write temp file: {e}"))
                .with_resource(path.display().to_string())
        })?;
        file.sync_all().map_err(|e| {
            Error::storage("stage_atomic", format!("failed to fsync temp file: {e}"))
                .with_resource(path.display().to_string())
        })?;
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(|e| {
                Error::storage("stage_atomic", format!("failed to set permissions: {e}"))
                    .with_resource(path.display().to_string())
            })?;
    }

    Ok(StagedWrite { tmp, dest: path.to_path_buf() })
}

impl StagedWrite {
    /// Renames this staged file into place. Each rename is itself atomic
    /// (same-filesystem `rename(2)`), so this is only ever called after
    /// every sibling in the same operation has staged without error.
    pub fn commit(self) -> Result<(), Error> {
        self.tmp.persist(&self.dest).map_err(|e| {
            Error::storage("commit_staged", format!("failed to rename into place: {e}"))
                .with_resource(self.dest.display().to_string())
        })?;
        Ok(())
    }
}

/// Commits every staged write in order. Intended to run only after every
/// write in a multi-file operation has staged successfully; renaming is
/// the last, least-likely-to-fail step of the operation.
pub fn commit_staged(staged: Vec<StagedWrite>) -> Result<(), Error> {
    for s in staged {
        s.commit()?;
    }
    Ok(())
}

/// Writes `contents` to `path` atomically with file mode `mode` (e.g.
/// `0o600` for secrets, `0o644` for public material). A single-file
/// convenience wrapper around `stage_atomic` + `commit` for call sites
/// that don't need to coordinate several files' renames together.
pub async fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<(), Error> {
    stage_atomic(path, contents, mode).await?.commit()
}

/// Ensures `dir` exists with the given mode, creating parents as needed.
pub async fn ensure_dir(dir: &Path, mode: u32) -> Result<(), Error> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        Error::storage("ensure_dir", format!("failed to create directory: {e}"))
            .with_resource(dir.display().to_string())
    })?;
    tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| {
            Error::storage("ensure_dir", format!("failed to set directory permissions: {e}"))
                .with_resource(dir.display().to_string())
        })?;
    Ok(())
}

/// Checks the mode of an existing file against `expected`, returning a
/// non-fatal warning message if looser. Per spec, loose permissions on
/// read are reported, not failed.
pub fn check_mode(path: &Path, expected: u32) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    let actual = meta.permissions().mode() & 0o777;
    if actual != expected {
        Some(format!(
            "{} has mode {:o}, expected {:o}",
            path.display(),
            actual,
            expected
        ))
    } else {
        None
    }
}
