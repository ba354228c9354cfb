//! Integration tests for the full create/apply pipelines
//!
//! Every test runs against a throwaway live tree inside a TempDir: the
//! temp paths are absolute, so restoring under the default `/` live root
//! lands the files back where they were mirrored from.

use ::burrow::*;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Counts how often the clone step ran
struct RecordingCloner(Arc<AtomicUsize>);

impl RepoCloner for RecordingCloner {
    fn ensure_all(&self) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always fails, standing in for a broken git environment
struct FailingCloner;

impl RepoCloner for FailingCloner {
    fn ensure_all(&self) -> Result<()> {
        Err(BurrowError::clone_failed("git unavailable"))
    }
}

struct Harness {
    tmp: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    fn home(&self) -> std::path::PathBuf {
        self.tmp.path().join("home/alice")
    }

    fn staging(&self) -> std::path::PathBuf {
        self.tmp.path().join("staging")
    }

    fn burrow(&self) -> Burrow {
        self.burrow_with_cloner(Box::new(RecordingCloner(Arc::new(AtomicUsize::new(0)))))
    }

    fn burrow_with_cloner(&self, cloner: Box<dyn RepoCloner>) -> Burrow {
        Burrow::builder()
            .home(self.home())
            .staging_dir(self.staging())
            .archive_dir(self.tmp.path().join("archives"))
            .remote_store(Box::new(DirStore::new(self.tmp.path().join("remote"))))
            .cloner(cloner)
            .build()
            .unwrap()
    }

    fn write_live(&self, rel: &str, content: &str) -> std::path::PathBuf {
        let path = self.home().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn manifest(&self, rels: &[&str]) -> FlatManifest {
        FlatManifest {
            adds: rels
                .iter()
                .map(|rel| PathAddition {
                    path: self.home().join(rel).to_string_lossy().into_owned(),
                    preserve_existing: false,
                })
                .collect(),
            ..FlatManifest::default()
        }
    }
}

#[test]
fn test_round_trip_restores_content_and_permissions() {
    let harness = Harness::new();
    let zshrc = harness.write_live(".zshrc", "export EDITOR=zed\n");
    let script = harness.write_live("bin/sync.sh", "#!/bin/sh\n");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();
    }

    let manifest = harness.manifest(&[".zshrc", "bin"]);
    let burrow = harness.burrow();
    let report = burrow.create(&manifest).unwrap();
    assert!(report.warnings.is_empty());
    burrow.upload_archive(&report.archive).unwrap();

    // Damage the live tree, then restore the latest remote archive.
    fs::write(&zshrc, "clobbered").unwrap();
    fs::remove_file(&script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&zshrc, fs::Permissions::from_mode(0o600)).unwrap();
    }

    let applied = burrow.apply::<&str>(&manifest, None, &[]).unwrap();
    assert_eq!(applied.archive, report.archive);
    assert_eq!(fs::read_to_string(&zshrc).unwrap(), "export EDITOR=zed\n");
    assert_eq!(fs::read_to_string(&script).unwrap(), "#!/bin/sh\n");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&script).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }
    assert!(!harness.staging().exists());
}

#[test]
fn test_apply_twice_is_idempotent_and_snapshots_originals() {
    let harness = Harness::new();
    harness.write_live(".zshrc", "export EDITOR=zed\n");

    let manifest = harness.manifest(&[".zshrc"]);
    let burrow = harness.burrow();
    let report = burrow.create(&manifest).unwrap();
    burrow.upload_archive(&report.archive).unwrap();

    let first = burrow
        .apply::<&str>(&manifest, Some(&report.archive), &[])
        .unwrap();
    let second = burrow
        .apply::<&str>(&manifest, Some(&report.archive), &[])
        .unwrap();

    assert_eq!(first.files_restored, 1);
    assert_eq!(second.files_restored, 1);
    // The target exists on the second run, so it gets snapshotted
    // before being overwritten with identical bytes.
    assert_eq!(second.originals_snapshotted, 1);
    assert_eq!(
        fs::read_to_string(harness.home().join(".zshrc")).unwrap(),
        "export EDITOR=zed\n"
    );
}

#[test]
fn test_step_selection_splits_plain_and_hosting_trees() {
    let harness = Harness::new();
    let plain = harness.write_live(".zshrc", "plain");
    let hosted = harness.write_live("github.com/alice-bnuy/alicebot/.env", "TOKEN=x");

    let manifest = harness.manifest(&[".zshrc", "github.com"]);
    let burrow = harness.burrow();
    let report = burrow.create(&manifest).unwrap();
    burrow.upload_archive(&report.archive).unwrap();

    fs::remove_file(&plain).unwrap();
    fs::remove_file(&hosted).unwrap();

    // "before clone" restores the plain dotfile but not the clone-managed
    // tree.
    let before = burrow
        .apply(
            &manifest,
            Some(&report.archive),
            &["before clone".to_string()],
        )
        .unwrap();
    assert_eq!(before.steps_run, vec!["before clone"]);
    assert!(plain.exists());
    assert!(!hosted.exists());

    // "after clone" restores exactly what "before clone" left out.
    let after = burrow
        .apply(
            &manifest,
            Some(&report.archive),
            &["After Clone".to_string()],
        )
        .unwrap();
    assert_eq!(after.steps_run, vec!["after clone"]);
    assert!(hosted.exists());
    assert_eq!(fs::read_to_string(&hosted).unwrap(), "TOKEN=x");
}

#[test]
fn test_full_apply_invokes_cloner_once() {
    let harness = Harness::new();
    harness.write_live(".zshrc", "plain");

    let manifest = harness.manifest(&[".zshrc"]);
    let calls = Arc::new(AtomicUsize::new(0));
    let burrow = harness.burrow_with_cloner(Box::new(RecordingCloner(calls.clone())));
    let report = burrow.create(&manifest).unwrap();
    burrow.upload_archive(&report.archive).unwrap();

    let applied = burrow
        .apply::<&str>(&manifest, Some(&report.archive), &[])
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        applied.steps_run,
        vec!["before clone", "clone all", "after clone"]
    );
}

#[test]
fn test_clone_failure_aborts_and_cleans_staging() {
    let harness = Harness::new();
    harness.write_live(".zshrc", "plain");

    let manifest = harness.manifest(&[".zshrc"]);
    let burrow = harness.burrow_with_cloner(Box::new(FailingCloner));
    let report = burrow.create(&manifest).unwrap();
    burrow.upload_archive(&report.archive).unwrap();

    let result = burrow.apply::<&str>(&manifest, Some(&report.archive), &[]);
    assert!(matches!(result, Err(BurrowError::CloneFailed(_))));
    assert!(!harness.staging().exists());
}

#[test]
fn test_preserve_existing_skips_live_copies() {
    let harness = Harness::new();
    let ssh_key = harness.write_live(".ssh/id_ed25519", "old key");

    let mut manifest = harness.manifest(&[]);
    manifest.adds.push(PathAddition {
        path: harness.home().join(".ssh").to_string_lossy().into_owned(),
        preserve_existing: true,
    });

    let burrow = harness.burrow();
    let report = burrow.create(&manifest).unwrap();
    burrow.upload_archive(&report.archive).unwrap();

    // The live key changes after the backup; apply must not clobber it.
    fs::write(&ssh_key, "new key").unwrap();
    let applied = burrow
        .apply::<&str>(&manifest, Some(&report.archive), &[])
        .unwrap();

    assert_eq!(applied.preserved, 1);
    assert_eq!(applied.files_restored, 0);
    assert_eq!(fs::read_to_string(&ssh_key).unwrap(), "new key");
}

#[test]
fn test_manifest_removals_delete_live_paths() {
    let harness = Harness::new();
    harness.write_live(".zshrc", "keep");
    let bashrc = harness.write_live(".bashrc", "legacy");

    let mut manifest = harness.manifest(&[".zshrc"]);
    manifest.removes.push(PathRemoval {
        path: bashrc.to_string_lossy().into_owned(),
    });

    let burrow = harness.burrow();
    let report = burrow.create(&manifest).unwrap();
    burrow.upload_archive(&report.archive).unwrap();

    let applied = burrow
        .apply::<&str>(&manifest, Some(&report.archive), &[])
        .unwrap();
    assert_eq!(applied.removed, 1);
    assert!(!bashrc.exists());
    assert!(harness.home().join(".zshrc").exists());

    // Removals are tied to the final step: a before-clone-only run
    // leaves other live paths alone.
    let recreated = harness.write_live(".bashrc", "back again");
    burrow
        .apply(
            &manifest,
            Some(&report.archive),
            &["before clone".to_string()],
        )
        .unwrap();
    assert!(recreated.exists());
}

#[test]
fn test_folder_selections_only_capture_named_entries() {
    let harness = Harness::new();
    harness.write_live(".config/zed/settings.json", "{}");
    harness.write_live(".config/zed/scratch.txt", "not selected");

    let manifest = FlatManifest {
        folders: vec![FolderSelection {
            base: harness
                .home()
                .join(".config/zed")
                .to_string_lossy()
                .into_owned(),
            contents: vec!["settings.json".to_string()],
        }],
        ..FlatManifest::default()
    };

    let burrow = harness.burrow();
    let report = burrow.create(&manifest).unwrap();
    burrow.upload_archive(&report.archive).unwrap();

    fs::remove_dir_all(harness.home().join(".config")).unwrap();
    burrow
        .apply::<&str>(&manifest, Some(&report.archive), &[])
        .unwrap();

    assert!(harness.home().join(".config/zed/settings.json").exists());
    assert!(!harness.home().join(".config/zed/scratch.txt").exists());
}
