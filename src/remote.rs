//! Remote archive storage
//!
//! Archives live in a blob store addressed by hierarchical relative paths
//! (the backups folder of a cloud drive). The core only needs three
//! operations — list, upload, download — expressed by [`RemoteStore`] so
//! tests can run against a plain directory. [`DirStore`] is that
//! directory-backed implementation and also serves a locally synced drive
//! mount directly.

use crate::archive::is_archive_name;
use crate::error::{BurrowError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Metadata of one stored artifact
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    /// File name of the artifact inside its folder
    pub name: String,
    /// Last modification time
    pub modified: SystemTime,
}

/// Blob store keyed by hierarchical path
pub trait RemoteStore {
    /// List artifacts directly under `folder`.
    fn list(&self, folder: &str) -> Result<Vec<RemoteEntry>>;

    /// Upload a local file to `remote`, replacing any existing artifact.
    fn upload(&self, local: &Path, remote: &str) -> Result<()>;

    /// Download `remote` to a local path, replacing any stale copy.
    fn download(&self, remote: &str, local: &Path) -> Result<()>;
}

/// Filesystem-directory blob store
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Create a store rooted at `root`. The directory may not exist yet;
    /// it is created on first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RemoteStore for DirStore {
    fn list(&self, folder: &str) -> Result<Vec<RemoteEntry>> {
        let dir = self.root.join(folder);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let listing = fs::read_dir(&dir)
            .map_err(|e| BurrowError::remote(format!("listing {:?}: {}", dir, e)))?;
        for entry in listing {
            let entry =
                entry.map_err(|e| BurrowError::remote(format!("listing {:?}: {}", dir, e)))?;
            let metadata = entry
                .metadata()
                .map_err(|e| BurrowError::remote(format!("stat {:?}: {}", entry.path(), e)))?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        debug!("{} artifacts under {:?}", entries.len(), dir);
        Ok(entries)
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let target = self.root.join(remote);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BurrowError::remote(format!("creating {:?}: {}", parent, e)))?;
        }
        fs::copy(local, &target)
            .map_err(|e| BurrowError::remote(format!("uploading to {:?}: {}", target, e)))?;
        info!("uploaded {:?} as {}", local, remote);
        Ok(())
    }

    fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let source = self.root.join(remote);
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| BurrowError::io(parent, e))?;
        }
        fs::copy(&source, local)
            .map_err(|e| BurrowError::remote(format!("downloading {:?}: {}", source, e)))?;
        info!("downloaded {} to {:?}", remote, local);
        Ok(())
    }
}

/// Name of the most recently modified archive under `folder`.
///
/// # Errors
///
/// Returns [`BurrowError::NoBackupFound`] when the folder holds no
/// artifact with the archive extension.
pub fn latest_archive(store: &dyn RemoteStore, folder: &str) -> Result<String> {
    store
        .list(folder)?
        .into_iter()
        .filter(|entry| is_archive_name(&entry.name))
        .max_by_key(|entry| entry.modified)
        .map(|entry| entry.name)
        .ok_or(BurrowError::NoBackupFound)
}
