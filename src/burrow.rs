//! Main burrow implementation
//!
//! [`Burrow`] owns the paths and capabilities both pipelines need and is
//! built through [`BurrowBuilder`]. The two operations mirror each other
//! around the archive artifact: `create` mirrors live paths into a
//! staging tree and compresses it; `apply` extracts an archive into a
//! staging tree and restores it step by step.
//!
//! Failures follow a two-tier policy. Setup, compression, extraction,
//! remote fetch, and the clone step are fatal. Per-item copy, snapshot,
//! and removal failures inside the bulk loops are recorded as report
//! warnings and the loop continues: a partial backup or restore beats
//! none at all.

use crate::archive::{archive_file_name, operator_name, Archiver, TarGzArchiver};
use crate::cloner::{GitCloner, RepoCloner};
use crate::error::{BurrowError, Result};
use crate::manifest::FlatManifest;
use crate::mirror::{self, file_mode};
use crate::paths::{resolve_with_home, root_relative};
use crate::remote::{latest_archive, DirStore, RemoteStore};
use crate::staging::{StagingRoot, RESERVED_DIRS};
use crate::steps::{builtin_steps, select_steps, FileRule, AFTER_CLONE};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Remote folder archives are uploaded to and fetched from
pub const REMOTE_BACKUPS_FOLDER: &str = "linux/backups";

/// Outcome of one `create` run
#[derive(Debug, Clone)]
pub struct CreateReport {
    /// File name of the produced archive
    pub archive: String,
    /// Where the archive was written locally
    pub archive_path: PathBuf,
    /// Manifest entries successfully mirrored into the archive
    pub entries_copied: usize,
    /// Per-entry failures (tier-2): logged, not fatal
    pub warnings: Vec<String>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Outcome of one `apply` run
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// File name of the applied archive
    pub archive: String,
    /// Names of the steps that ran, in order
    pub steps_run: Vec<String>,
    /// Staged files copied onto the live filesystem
    pub files_restored: usize,
    /// Live files snapshotted into the originals area before overwrite
    pub originals_snapshotted: usize,
    /// Staged files skipped because a preserve-marked live copy exists
    pub preserved: usize,
    /// Live paths deleted by manifest removals
    pub removed: usize,
    /// Per-item failures (tier-2): logged, not fatal
    pub warnings: Vec<String>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Personal configuration backup/restore handle
pub struct Burrow {
    home: PathBuf,
    live_root: PathBuf,
    staging_dir: PathBuf,
    archive_dir: PathBuf,
    remote_folder: String,
    archiver: Box<dyn Archiver>,
    remote: Box<dyn RemoteStore>,
    cloner: Box<dyn RepoCloner>,
}

impl Burrow {
    /// Start building a `Burrow` with default capabilities.
    pub fn builder() -> BurrowBuilder {
        BurrowBuilder::new()
    }

    /// The home directory backups are expressed against.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Create a backup archive from the flattened manifest.
    ///
    /// Mirrors every folder-selection entry and every path addition into
    /// a fresh staging tree at its root-anchored position, compresses the
    /// tree into `home-<user>-backup-<timestamp>` in the archive output
    /// directory, and removes the staging tree.
    ///
    /// Individual sources that are missing or unreadable become report
    /// warnings; the archive still captures everything else.
    ///
    /// # Errors
    ///
    /// Staging setup, compression, and cleanup failures are fatal.
    #[instrument(skip(self, manifest))]
    pub fn create(&self, manifest: &FlatManifest) -> Result<CreateReport> {
        let start = Instant::now();
        let staging = StagingRoot::create(&self.staging_dir)?;
        info!("staging backup under {:?}", staging.path());

        let mut entries_copied = 0;
        let mut warnings = Vec::new();
        let mut mirror_entry = |source: &str| {
            match self.mirror_into_staging(source, staging.path()) {
                Ok(()) => entries_copied += 1,
                Err(e) => {
                    warn!("failed to back up {}: {}", source, e);
                    warnings.push(format!("{}: {}", source, e));
                }
            }
        };

        for folder in &manifest.folders {
            for name in &folder.contents {
                mirror_entry(&format!("{}/{}", folder.base.trim_end_matches('/'), name));
            }
        }
        for add in &manifest.adds {
            mirror_entry(&add.path);
        }

        fs::create_dir_all(&self.archive_dir)
            .map_err(|e| BurrowError::io(&self.archive_dir, e))?;
        let archive = archive_file_name(&operator_name(&self.home), Local::now());
        let archive_path = self.archive_dir.join(&archive);
        self.archiver.compress(staging.path(), &archive_path)?;
        staging.remove()?;

        info!(
            "created {} ({} entries, {} warnings)",
            archive,
            entries_copied,
            warnings.len()
        );
        Ok(CreateReport {
            archive,
            archive_path,
            entries_copied,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Upload a previously created archive to the remote backups folder.
    ///
    /// Returns the remote path the artifact now lives at.
    pub fn upload_archive(&self, archive: &str) -> Result<String> {
        let local = self.archive_dir.join(archive);
        let remote_path = format!("{}/{}", self.remote_folder, archive);
        self.remote.upload(&local, &remote_path)?;
        Ok(remote_path)
    }

    /// Apply a backup archive to the live filesystem.
    ///
    /// With no archive name, the most recently modified archive in the
    /// remote backups folder is used. The archive is downloaded,
    /// extracted into a fresh staging tree, and restored through the
    /// built-in steps (optionally narrowed to `requested_steps`,
    /// case-insensitively, in defined order). Live files about to be
    /// overwritten are first snapshotted into the staging tree's
    /// originals area, best-effort. Manifest removals run after the final
    /// file step. The staging tree is removed before returning.
    ///
    /// # Errors
    ///
    /// Resolution, download, extraction, the clone step, and cleanup
    /// failures are fatal; [`BurrowError::NoBackupFound`] when the remote
    /// folder has no archive to offer.
    #[instrument(skip(self, manifest, requested_steps))]
    pub fn apply<S: AsRef<str>>(
        &self,
        manifest: &FlatManifest,
        archive: Option<&str>,
        requested_steps: &[S],
    ) -> Result<ApplyReport> {
        let start = Instant::now();

        let archive = match archive {
            Some(name) => name.to_string(),
            None => latest_archive(self.remote.as_ref(), &self.remote_folder)?,
        };
        info!("applying backup {}", archive);

        fs::create_dir_all(&self.archive_dir)
            .map_err(|e| BurrowError::io(&self.archive_dir, e))?;
        let local = self.archive_dir.join(&archive);
        self.remote
            .download(&format!("{}/{}", self.remote_folder, archive), &local)?;

        let staging = StagingRoot::create(&self.staging_dir)?;
        self.archiver.extract(&local, staging.path())?;

        let steps = builtin_steps(&self.home);
        let selected = select_steps(&steps, requested_steps);

        let mut report = ApplyReport {
            archive,
            ..ApplyReport::default()
        };
        let preserve_roots = self.preserve_roots(manifest);

        for step in &selected {
            report.steps_run.push(step.name.to_string());
            match &step.rule {
                // The clone step is the one fatal stage inside the loop:
                // a broken clone leaves repositories half-provisioned and
                // the after-clone restore would scribble over them.
                None => {
                    info!("running step {:?}", step.name);
                    self.cloner.ensure_all()?;
                }
                Some(rule) => {
                    self.apply_file_step(step.name, rule, &staging, &preserve_roots, &mut report)
                }
            }
        }

        if selected.iter().any(|step| step.name == AFTER_CLONE) {
            self.apply_removals(manifest, &mut report);
        }

        staging.remove()?;
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "applied {} ({} files, {} snapshots, {} warnings)",
            report.archive,
            report.files_restored,
            report.originals_snapshotted,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Mirror one manifest entry into the staging tree.
    fn mirror_into_staging(&self, source: &str, staging_root: &Path) -> Result<()> {
        let resolved = resolve_with_home(source, &self.home);
        let metadata =
            fs::metadata(&resolved).map_err(|e| BurrowError::io(&resolved, e))?;
        let dest = staging_root.join(root_relative(&resolved));

        if metadata.is_dir() {
            mirror::copy_tree(&resolved, &dest, None)
        } else {
            mirror::copy_file(&resolved, &dest, Some(file_mode(&metadata)))
        }
    }

    /// Walk the staging tree and restore every path the step selects.
    fn apply_file_step(
        &self,
        step_name: &str,
        rule: &FileRule,
        staging: &StagingRoot,
        preserve_roots: &[PathBuf],
        report: &mut ApplyReport,
    ) {
        info!("running step {:?}", step_name);
        let root = staging.path();
        let mut walker = WalkDir::new(root).min_depth(1).into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("walk error under {:?}: {}", root, e);
                    report.warnings.push(format!("walk: {}", e));
                    continue;
                }
            };
            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };

            // Internal bookkeeping areas are never applied to the live
            // system.
            if let Some(first) = rel.iter().next() {
                if RESERVED_DIRS.iter().any(|name| first == *name) {
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
            }

            if entry.file_type().is_dir() {
                if rule.prunes(&rel) {
                    walker.skip_current_dir();
                    continue;
                }
                if rule.includes(&rel) {
                    self.restore_directory(entry.path(), &rel, report);
                }
                continue;
            }

            if !rule.includes(&rel) {
                continue;
            }
            self.restore_file(entry.path(), &rel, staging, preserve_roots, report);
        }
    }

    /// Ensure a live directory exists, with the staged permission bits
    /// when it has to be created. Directories that already exist keep
    /// their current permissions.
    fn restore_directory(&self, staged: &Path, rel: &Path, report: &mut ApplyReport) {
        let target = self.live_root.join(rel);
        if target.is_dir() {
            return;
        }
        let result = fs::create_dir_all(&target)
            .map_err(|e| BurrowError::io(&target, e))
            .and_then(|_| match fs::metadata(staged) {
                Ok(meta) => mirror::set_mode(&target, file_mode(&meta)),
                Err(e) => Err(BurrowError::io(staged, e)),
            });
        if let Err(e) = result {
            warn!("failed to restore directory {:?}: {}", rel, e);
            report.warnings.push(format!("{}: {}", rel.display(), e));
        }
    }

    /// Restore one staged file over its live location.
    fn restore_file(
        &self,
        staged: &Path,
        rel: &Path,
        staging: &StagingRoot,
        preserve_roots: &[PathBuf],
        report: &mut ApplyReport,
    ) {
        let target = self.live_root.join(rel);

        let target_exists = target.is_file();
        if target_exists && preserve_roots.iter().any(|root| target.starts_with(root)) {
            debug!("preserving existing {:?}", target);
            report.preserved += 1;
            return;
        }

        if target_exists {
            let snapshot = staging.originals_dir().join(rel);
            match mirror::copy_file(&target, &snapshot, None) {
                Ok(()) => report.originals_snapshotted += 1,
                // Snapshot failures do not block the restore itself.
                Err(e) => {
                    warn!("failed to snapshot {:?}: {}", target, e);
                    report
                        .warnings
                        .push(format!("snapshot {}: {}", rel.display(), e));
                }
            }
        }

        let result = fs::metadata(staged)
            .map_err(|e| BurrowError::io(staged, e))
            .and_then(|meta| mirror::copy_file(staged, &target, Some(file_mode(&meta))));
        match result {
            Ok(()) => report.files_restored += 1,
            Err(e) => {
                warn!("failed to restore {:?}: {}", rel, e);
                report.warnings.push(format!("{}: {}", rel.display(), e));
            }
        }
    }

    /// Delete every manifest removal path from the live filesystem.
    fn apply_removals(&self, manifest: &FlatManifest, report: &mut ApplyReport) {
        for removal in &manifest.removes {
            let resolved = resolve_with_home(&removal.path, &self.home);
            let target = self.live_root.join(root_relative(&resolved));
            let result = match fs::symlink_metadata(&target) {
                Err(_) => continue,
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(&target),
                Ok(_) => fs::remove_file(&target),
            };
            match result {
                Ok(()) => {
                    info!("removed {:?}", target);
                    report.removed += 1;
                }
                Err(e) => {
                    warn!("failed to remove {:?}: {}", target, e);
                    report
                        .warnings
                        .push(format!("remove {}: {}", removal.path, e));
                }
            }
        }
    }

    /// Live-filesystem roots that must not be overwritten when present.
    fn preserve_roots(&self, manifest: &FlatManifest) -> Vec<PathBuf> {
        manifest
            .adds
            .iter()
            .filter(|add| add.preserve_existing)
            .map(|add| {
                let resolved = resolve_with_home(&add.path, &self.home);
                self.live_root.join(root_relative(&resolved))
            })
            .collect()
    }
}

/// Builder for [`Burrow`]
///
/// Every path and capability can be overridden; defaults target the real
/// machine (home from the platform, live root `/`, staging and archives
/// under the user data directory, a directory-backed remote store).
#[derive(Default)]
pub struct BurrowBuilder {
    home: Option<PathBuf>,
    live_root: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
    remote_folder: Option<String>,
    archiver: Option<Box<dyn Archiver>>,
    remote: Option<Box<dyn RemoteStore>>,
    cloner: Option<Box<dyn RepoCloner>>,
}

impl BurrowBuilder {
    /// Create a builder with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the home directory manifest paths resolve against.
    pub fn home(mut self, path: impl Into<PathBuf>) -> Self {
        self.home = Some(path.into());
        self
    }

    /// Override the live filesystem root restores write under.
    pub fn live_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.live_root = Some(path.into());
        self
    }

    /// Override the staging scratch directory.
    pub fn staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    /// Override where archives are written and downloaded.
    pub fn archive_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(path.into());
        self
    }

    /// Override the remote backups folder path.
    pub fn remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.remote_folder = Some(folder.into());
        self
    }

    /// Use a custom archive codec.
    pub fn archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Use a custom remote blob store.
    pub fn remote_store(mut self, remote: Box<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Use a custom repository cloner.
    pub fn cloner(mut self, cloner: Box<dyn RepoCloner>) -> Self {
        self.cloner = Some(cloner);
        self
    }

    /// Resolve defaults and build the handle.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::HomeDirectory`] if no home override is set
    /// and the platform cannot name one.
    pub fn build(self) -> Result<Burrow> {
        let home = match self.home {
            Some(home) => home,
            None => crate::paths::home_dir()?,
        };
        let data_base = dirs::data_dir()
            .map(|dir| dir.join("burrow"))
            .unwrap_or_else(|| home.join(".burrow"));

        Ok(Burrow {
            live_root: self.live_root.unwrap_or_else(|| PathBuf::from("/")),
            staging_dir: self
                .staging_dir
                .unwrap_or_else(|| data_base.join("staging")),
            archive_dir: self
                .archive_dir
                .unwrap_or_else(|| data_base.join("archives")),
            remote_folder: self
                .remote_folder
                .unwrap_or_else(|| REMOTE_BACKUPS_FOLDER.to_string()),
            archiver: self.archiver.unwrap_or_else(|| Box::new(TarGzArchiver)),
            remote: self
                .remote
                .unwrap_or_else(|| Box::new(DirStore::new(data_base.join("remote")))),
            cloner: self
                .cloner
                .unwrap_or_else(|| Box::new(GitCloner::new(Vec::new()))),
            home,
        })
    }
}
