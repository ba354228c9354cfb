//! Error types for the burrow library
//!
//! One error enum covers both pipelines. Variants follow the two-tier
//! policy used throughout the crate: structural failures (staging setup,
//! archive codec, remote fetch, manifest conflicts) are returned as errors
//! and abort the operation, while per-item copy failures inside bulk loops
//! are accumulated as report warnings and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the burrow library
pub type Result<T> = std::result::Result<T, BurrowError>;

/// Main error type for all burrow operations
#[derive(Debug, Error)]
pub enum BurrowError {
    /// The user's home directory cannot be determined
    #[error("cannot determine the user's home directory")]
    HomeDirectory,

    /// I/O failure carrying the path that was being touched
    #[error("io error at {path:?}: {source}")]
    Io {
        /// Path the failed operation was addressing
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Archive compression or decompression failed
    #[error("archive error: {0}")]
    Archive(String),

    /// A path appears more than once across the active backup sets
    #[error("duplicate manifest path {path:?} (seen again in {category})")]
    DuplicateManifestPath {
        /// Normalized form of the colliding path
        path: String,
        /// Category ("folders", "adds", "removes") of the repeated entry
        category: &'static str,
    },

    /// The remote backups folder holds no archive to apply
    #[error("no backup archive found in the remote backups folder")]
    NoBackupFound,

    /// Remote blob store operation failed
    #[error("remote store error: {0}")]
    Remote(String),

    /// Repository cloning failed
    #[error("clone error: {0}")]
    CloneFailed(String),
}

impl BurrowError {
    /// Create a [`BurrowError::Io`] from a path and an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BurrowError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an archive error with a custom message
    pub fn archive(msg: impl Into<String>) -> Self {
        BurrowError::Archive(msg.into())
    }

    /// Create a remote store error with a custom message
    pub fn remote(msg: impl Into<String>) -> Self {
        BurrowError::Remote(msg.into())
    }

    /// Create a clone error with a custom message
    pub fn clone_failed(msg: impl Into<String>) -> Self {
        BurrowError::CloneFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BurrowError::NoBackupFound;
        assert_eq!(
            err.to_string(),
            "no backup archive found in the remote backups folder"
        );

        let err = BurrowError::DuplicateManifestPath {
            path: "~/.zshrc".to_string(),
            category: "adds",
        };
        assert!(err.to_string().contains("~/.zshrc"));
        assert!(err.to_string().contains("adds"));
    }

    #[test]
    fn test_io_carries_path() {
        let err = BurrowError::io(
            "/tmp/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing"));
    }
}
