//! Ephemeral staging directory
//!
//! Both pipelines funnel through one scratch directory that stands in for
//! the filesystem root: `create` mirrors live paths into it before
//! compression, `apply` extracts the downloaded archive into it before
//! restoration. The directory is recreated empty for every operation and
//! removed when the operation finishes, with a drop backstop so an early
//! error return cannot leak it.

use crate::error::{BurrowError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reserved sub-area for pre-overwrite snapshots of live files
pub const ORIGINALS_DIR: &str = "originals";

/// Names under the staging root that are internal bookkeeping and must
/// never be applied to the live filesystem.
pub const RESERVED_DIRS: &[&str] = &[ORIGINALS_DIR];

/// Exclusively-owned scratch directory for one operation
#[derive(Debug)]
pub struct StagingRoot {
    path: PathBuf,
    removed: bool,
}

impl StagingRoot {
    /// Create a fresh staging root, clearing any stale copy first.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Io`] if the stale directory cannot be
    /// removed or the fresh one cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            debug!("removing stale staging root {:?}", path);
            fs::remove_dir_all(&path).map_err(|e| BurrowError::io(&path, e))?;
        }
        fs::create_dir_all(&path).map_err(|e| BurrowError::io(&path, e))?;

        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Location of the staging root
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The reserved snapshot area for this staging root
    pub fn originals_dir(&self) -> PathBuf {
        self.path.join(ORIGINALS_DIR)
    }

    /// Remove the staging root and everything under it.
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        fs::remove_dir_all(&self.path).map_err(|e| BurrowError::io(&self.path, e))
    }
}

impl Drop for StagingRoot {
    fn drop(&mut self) {
        if !self.removed && self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                warn!("failed to clean up staging root {:?}: {}", self.path, e);
            }
        }
    }
}
