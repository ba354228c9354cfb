//! Archive artifact codec
//!
//! The staging tree is flattened into a single gzip-compressed tar file
//! named after the operator and the moment of creation. The codec sits
//! behind the [`Archiver`] trait so the pipelines can be exercised with a
//! fake in tests.

use crate::error::{BurrowError, Result};
use chrono::{DateTime, Local};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// File extension of the archive artifact
pub const ARCHIVE_EXT: &str = "tar.gz";

/// Compress and extract staging trees
pub trait Archiver {
    /// Compress the *contents* of `dir` (not the directory itself) into
    /// the archive file at `archive`.
    fn compress(&self, dir: &Path, archive: &Path) -> Result<()>;

    /// Extract an archive into `dir`, treating `dir` as filesystem root.
    fn extract(&self, archive: &Path, dir: &Path) -> Result<()>;
}

/// Gzip-compressed tar codec
#[derive(Debug, Default)]
pub struct TarGzArchiver;

impl Archiver for TarGzArchiver {
    fn compress(&self, dir: &Path, archive: &Path) -> Result<()> {
        let file = File::create(archive).map_err(|e| BurrowError::io(archive, e))?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);

        builder
            .append_dir_all(".", dir)
            .map_err(|e| BurrowError::archive(format!("packing {:?}: {}", dir, e)))?;

        builder
            .into_inner()
            .map_err(|e| BurrowError::archive(format!("finalizing tar: {}", e)))?
            .finish()
            .map_err(|e| BurrowError::archive(format!("finalizing gzip: {}", e)))?;

        debug!("compressed {:?} into {:?}", dir, archive);
        Ok(())
    }

    fn extract(&self, archive: &Path, dir: &Path) -> Result<()> {
        let file = File::open(archive).map_err(|e| BurrowError::io(archive, e))?;
        let mut reader = tar::Archive::new(GzDecoder::new(file));
        reader.set_preserve_permissions(true);
        reader
            .unpack(dir)
            .map_err(|e| BurrowError::archive(format!("unpacking {:?}: {}", archive, e)))?;

        debug!("extracted {:?} into {:?}", archive, dir);
        Ok(())
    }
}

/// Deterministic artifact name for one create run.
pub fn archive_file_name(user: &str, when: DateTime<Local>) -> String {
    format!(
        "home-{}-backup-{}.{}",
        user,
        when.format("%Y%m%d-%H%M%S"),
        ARCHIVE_EXT
    )
}

/// Whether a remote entry name looks like one of our artifacts.
pub fn is_archive_name(name: &str) -> bool {
    name.ends_with(&format!(".{}", ARCHIVE_EXT))
}

/// Name of the operator the archive is attributed to.
///
/// `$USER` when set, otherwise the home directory's file name.
pub fn operator_name(home: &Path) -> String {
    std::env::var("USER")
        .ok()
        .filter(|user| !user.is_empty())
        .or_else(|| {
            home.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "user".to_string())
}
