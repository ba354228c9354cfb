//! Git repository provisioning
//!
//! Clone-managed trees are never restored as flat file copies; the
//! restore pipeline hands them to a [`RepoCloner`] instead. The real
//! implementation shells out to `git`, which keeps authentication with
//! the operator's existing ssh setup. Already-present checkouts are left
//! untouched — no fetch, no pull — so the operation is safe to repeat.

use crate::error::{BurrowError, Result};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// Ensure a fixed set of repositories exist locally
pub trait RepoCloner {
    /// Ensure every configured repository is present, cloning as needed.
    ///
    /// Idempotent: targets that already exist are skipped.
    fn ensure_all(&self) -> Result<()>;
}

/// One repository to provision
#[derive(Debug, Clone)]
pub struct CloneTarget {
    /// Directory the repository is cloned under
    pub base_dir: PathBuf,
    /// Repository owner on the hosting site
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch to end up on
    pub branch: String,
}

impl CloneTarget {
    /// Describe one repository to clone under `base_dir`.
    pub fn new(
        base_dir: impl Into<PathBuf>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// ssh clone URL
    pub fn url(&self) -> String {
        format!("git@github.com:{}/{}.git", self.owner, self.repo)
    }

    /// Directory the checkout will live in
    pub fn checkout_dir(&self) -> PathBuf {
        self.base_dir.join(&self.repo)
    }
}

/// [`RepoCloner`] backed by the `git` binary
#[derive(Debug)]
pub struct GitCloner {
    targets: Vec<CloneTarget>,
}

impl GitCloner {
    /// Build a cloner over a fixed target table.
    pub fn new(targets: Vec<CloneTarget>) -> Self {
        Self { targets }
    }
}

impl RepoCloner for GitCloner {
    fn ensure_all(&self) -> Result<()> {
        // git availability is only checked once a clone is actually
        // needed, so a run over fully-present targets needs no git.
        let mut git_checked = false;

        for target in &self.targets {
            fs::create_dir_all(&target.base_dir).map_err(|e| {
                BurrowError::clone_failed(format!(
                    "creating base directory {:?}: {}",
                    target.base_dir, e
                ))
            })?;

            let checkout = target.checkout_dir();
            if checkout.exists() {
                debug!("{:?} already present, skipping", checkout);
                continue;
            }

            if !git_checked {
                check_git_available()?;
                git_checked = true;
            }
            clone_one(target)?;
        }

        Ok(())
    }
}

fn check_git_available() -> Result<()> {
    let found = Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false);
    if found {
        Ok(())
    } else {
        Err(BurrowError::clone_failed("git not found in PATH"))
    }
}

/// Whether `branch` exists on the remote at `url`.
fn remote_branch_exists(url: &str, branch: &str) -> bool {
    Command::new("git")
        .args(["ls-remote", "--heads", url, branch])
        .output()
        .map(|out| out.status.success() && !out.stdout.is_empty())
        .unwrap_or(false)
}

fn clone_one(target: &CloneTarget) -> Result<()> {
    let url = target.url();
    let checkout = target.checkout_dir();

    if remote_branch_exists(&url, &target.branch) {
        info!("cloning {} (branch {}) into {:?}", url, target.branch, checkout);
        run_git(
            Command::new("git")
                .args(["clone", "--branch", &target.branch, &url])
                .arg(&checkout),
            &format!("clone {} (branch {})", url, target.branch),
        )
    } else {
        // The requested branch is not on the remote yet: clone the
        // default branch and create the branch locally.
        info!(
            "branch {} missing on {}, cloning default branch instead",
            target.branch, url
        );
        run_git(
            Command::new("git").args(["clone", &url]).arg(&checkout),
            &format!("clone {}", url),
        )?;
        run_git(
            Command::new("git")
                .args(["switch", "-c", &target.branch])
                .current_dir(&checkout),
            &format!("create branch {} in {:?}", target.branch, checkout),
        )
    }
}

fn run_git(command: &mut Command, what: &str) -> Result<()> {
    let status = command
        .status()
        .map_err(|e| BurrowError::clone_failed(format!("{}: {}", what, e)))?;
    if status.success() {
        Ok(())
    } else {
        Err(BurrowError::clone_failed(format!(
            "{}: git exited with {}",
            what, status
        )))
    }
}
