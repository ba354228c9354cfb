//! File and directory mirroring
//!
//! The copy primitives both pipelines are built on. A mirror never mutates
//! its source; destinations are replaced wholesale, with ancestor
//! directories created on demand.

use crate::error::{BurrowError, Result};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::trace;
use walkdir::WalkDir;

/// Copy a single file, creating any missing ancestor directories.
///
/// An existing destination is replaced. When `mode` is given the new
/// file's permission bits are set to it; otherwise the platform default
/// applies and the copy is flushed durably before returning.
///
/// # Errors
///
/// Returns [`BurrowError::Io`] carrying the offending path on any read,
/// write, or create failure.
pub fn copy_file(src: &Path, dst: &Path, mode: Option<u32>) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| BurrowError::io(parent, e))?;
    }

    let mut reader = File::open(src).map_err(|e| BurrowError::io(src, e))?;
    let mut writer = File::create(dst).map_err(|e| BurrowError::io(dst, e))?;
    io::copy(&mut reader, &mut writer).map_err(|e| BurrowError::io(dst, e))?;

    match mode {
        Some(bits) => set_mode(dst, bits)?,
        None => writer.sync_all().map_err(|e| BurrowError::io(dst, e))?,
    }

    trace!("copied {:?} -> {:?}", src, dst);
    Ok(())
}

/// Recursively mirror a directory tree.
///
/// Entries whose first path segment relative to `src` matches a name in
/// `exclude` are skipped entirely (whole subtree for directories).
/// Directories are recreated with matching permission bits before their
/// descendants are written; files go through [`copy_file`] with the source
/// file's mode.
pub fn copy_tree(src: &Path, dst: &Path, exclude: Option<&HashSet<OsString>>) -> Result<()> {
    let walker = WalkDir::new(src).into_iter().filter_entry(|entry| {
        // Top-level exclusions prune the whole subtree.
        if entry.depth() == 1 {
            if let Some(names) = exclude {
                return !names.contains(entry.file_name());
            }
        }
        true
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(src).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"));
                return Err(BurrowError::io(path, source));
            }
        };

        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| BurrowError::io(&target, e))?;
            let meta = entry.metadata().map_err(|e| {
                BurrowError::io(
                    entry.path(),
                    e.into_io_error()
                        .unwrap_or_else(|| io::Error::other("metadata unavailable")),
                )
            })?;
            set_mode(&target, file_mode(&meta))?;
        } else {
            let meta = fs::metadata(entry.path())
                .map_err(|e| BurrowError::io(entry.path(), e))?;
            copy_file(entry.path(), &target, Some(file_mode(&meta)))?;
        }
    }

    Ok(())
}

/// Unix permission bits from metadata
#[cfg(unix)]
pub fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

/// Permission bits from metadata (non-Unix fallback)
#[cfg(not(unix))]
pub fn file_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Set Unix permission bits
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| BurrowError::io(path, e))
}

/// Set permission bits (non-Unix fallback: only the readonly flag)
#[cfg(not(unix))]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| BurrowError::io(path, e))?;
    let mut perms = metadata.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms).map_err(|e| BurrowError::io(path, e))
}
