//! # Burrow - personal configuration backup and restore
//!
//! Burrow copies a hand-curated set of files and directories out of a
//! home directory into a single compressed archive, ships the archive to
//! a remote backups folder, and later restores it onto a freshly
//! installed machine — including re-cloning the git repositories that
//! must not be restored as flat file copies.
//!
//! ## Overview
//!
//! The two pipelines meet at the archive artifact:
//!
//! - **create**: mirror every path the active [`manifest`] selects into a
//!   staging tree laid out as if it were the filesystem root, then
//!   compress the tree into `home-<user>-backup-<timestamp>.tar.gz`.
//! - **apply**: download an archive (the latest one by default), extract
//!   it into a staging tree, and restore it in ordered steps — plain
//!   files first, then repository cloning, then the files that live
//!   inside clone-managed trees. Live files about to be overwritten are
//!   snapshotted into the staging tree's `originals/` area first.
//!
//! Execution is strictly sequential; the staging directory is owned by
//! the one operation in flight and removed when it finishes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use burrow::{Burrow, SetRegistry, BackupSet, PathAddition};
//!
//! # fn main() -> burrow::Result<()> {
//! let mut registry = SetRegistry::new();
//! registry.register(BackupSet {
//!     name: "shell".into(),
//!     description: "shell configuration".into(),
//!     folders: Vec::new(),
//!     adds: vec![PathAddition {
//!         path: "~/.zshrc".into(),
//!         preserve_existing: false,
//!     }],
//!     removes: Vec::new(),
//! });
//! registry.activate(&["shell"]);
//!
//! let burrow = Burrow::builder().build()?;
//! let manifest = registry.flatten()?;
//!
//! let report = burrow.create(&manifest)?;
//! println!("created {}", report.archive);
//!
//! burrow.apply::<&str>(&manifest, Some(&report.archive), &[])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Policy
//!
//! Structural failures (staging setup, archive codec, remote fetch,
//! manifest path collisions, the clone step) abort the operation and
//! surface as [`BurrowError`]. Per-item failures inside the bulk copy
//! loops are collected into the operation report's `warnings` instead:
//! a backup that is missing one unreadable file is still worth having.

pub mod archive;
pub mod burrow;
pub mod cloner;
pub mod error;
pub mod manifest;
pub mod mirror;
pub mod paths;
pub mod remote;
pub mod staging;
pub mod steps;

pub use crate::archive::{Archiver, TarGzArchiver, ARCHIVE_EXT};
pub use crate::burrow::{ApplyReport, Burrow, BurrowBuilder, CreateReport, REMOTE_BACKUPS_FOLDER};
pub use crate::cloner::{CloneTarget, GitCloner, RepoCloner};
pub use crate::error::{BurrowError, Result};
pub use crate::manifest::{
    BackupSet, FlatManifest, FolderSelection, PathAddition, PathRemoval, SetRegistry,
};
pub use crate::remote::{DirStore, RemoteEntry, RemoteStore};
pub use crate::staging::{StagingRoot, ORIGINALS_DIR};
pub use crate::steps::{builtin_step_names, builtin_steps, BackupStep, AFTER_CLONE, BEFORE_CLONE, CLONE_ALL};
