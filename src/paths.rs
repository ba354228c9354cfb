//! Home-relative path resolution
//!
//! Manifest entries are written in the `~` shorthand so the same table
//! works on any machine. Resolution happens once, at the point a path is
//! actually mirrored or restored.

use crate::error::{BurrowError, Result};
use std::path::{Path, PathBuf};

/// Determine the absolute path to the user's home directory.
///
/// Does not check that the returned path exists.
///
/// # Errors
///
/// Returns [`BurrowError::HomeDirectory`] if the platform cannot name a
/// home directory for the current user.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(BurrowError::HomeDirectory)
}

/// Expand the `~` shorthand against the current user's home directory.
///
/// Paths that do not start with `~` are returned unchanged. Pure apart
/// from the home lookup; see [`resolve_with_home`] for the testable core.
///
/// # Errors
///
/// Returns [`BurrowError::HomeDirectory`] if the shorthand is present but
/// the home directory cannot be determined.
pub fn resolve(path: &str) -> Result<PathBuf> {
    if path.starts_with('~') {
        Ok(resolve_with_home(path, &home_dir()?))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Expand the `~` shorthand against an explicit home directory.
pub fn resolve_with_home(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => home.join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}

/// Root-anchored relative form of an absolute path.
///
/// `/home/alice/.zshrc` becomes `home/alice/.zshrc` — the position the
/// path occupies inside a staging tree treated as the filesystem root.
pub fn root_relative(path: &Path) -> PathBuf {
    let mut rel = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::RootDir | Component::Prefix(_) => {}
            other => rel.push(other),
        }
    }
    rel
}
