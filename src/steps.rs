//! Restore steps
//!
//! Applying a backup is partitioned into ordered steps. File steps select
//! staged paths by predicate; the predicate-less clone step hands control
//! to the repository cloner instead. The split exists because git-managed
//! trees must not be restored as flat file copies — they need real clones
//! to end up as valid repositories — while everything else is a safe
//! direct restore.

use crate::paths::root_relative;
use std::path::{Component, Path};
use tracing::warn;

/// Name of the step restoring plain files ahead of cloning
pub const BEFORE_CLONE: &str = "before clone";
/// Name of the repository-cloning step
pub const CLONE_ALL: &str = "clone all";
/// Name of the step restoring files inside clone-managed trees
pub const AFTER_CLONE: &str = "after clone";

/// Directory names that mark a git-clone-managed subtree
pub const HOSTING_SEGMENTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

/// Home-relative location of this tool's own checkout
pub const TOOL_CHECKOUT_DIR: &str = "burrow";

/// Path selection rule of a file step
///
/// `includes` decides per staged path; `prunes` marks directories whose
/// entire subtree is excluded, so the walk can skip them outright.
/// (`includes` alone cannot drive pruning: the after-clone step includes
/// paths whose ancestors it does not.)
pub struct FileRule {
    includes: Box<dyn Fn(&Path) -> bool + Send + Sync>,
    prunes: Box<dyn Fn(&Path) -> bool + Send + Sync>,
}

impl FileRule {
    /// Whether a staged path (relative to the staging root) is restored
    /// by this step.
    pub fn includes(&self, rel: &Path) -> bool {
        (self.includes)(rel)
    }

    /// Whether a staged directory's whole subtree can be skipped.
    pub fn prunes(&self, rel: &Path) -> bool {
        (self.prunes)(rel)
    }
}

/// One ordered phase of the restore pipeline
pub struct BackupStep {
    /// Step name, matched case-insensitively on selection
    pub name: &'static str,
    /// File selection rule; absent for the external clone step
    pub rule: Option<FileRule>,
}

/// Whether any path segment marks a source-hosting checkout tree.
fn has_hosting_segment(rel: &Path) -> bool {
    rel.components().any(|component| match component {
        Component::Normal(name) => HOSTING_SEGMENTS
            .iter()
            .any(|segment| name.eq_ignore_ascii_case(segment)),
        _ => false,
    })
}

/// Whether a staged path belongs to a clone-managed tree: a
/// source-hosting subtree or this tool's own checkout.
fn clone_managed(rel: &Path, tool_checkout: &Path) -> bool {
    has_hosting_segment(rel) || rel.starts_with(tool_checkout)
}

/// The built-in steps in their fixed order, parameterized by the home
/// directory the staged tree will be restored under.
pub fn builtin_steps(home: &Path) -> Vec<BackupStep> {
    let home_rel = root_relative(home);
    let gitconfig = home_rel.join(".gitconfig");
    let tool_checkout = home_rel.join(TOOL_CHECKOUT_DIR);

    let before = FileRule {
        includes: {
            let gitconfig = gitconfig.clone();
            let tool_checkout = tool_checkout.clone();
            Box::new(move |rel: &Path| {
                rel == gitconfig.as_path() || !clone_managed(rel, &tool_checkout)
            })
        },
        prunes: {
            let tool_checkout = tool_checkout.clone();
            Box::new(move |rel: &Path| clone_managed(rel, &tool_checkout))
        },
    };

    // Exact complement of the before-clone rule. Nothing is pruned: a
    // directory outside a hosting tree can still contain one deeper down.
    let after = FileRule {
        includes: Box::new(move |rel: &Path| {
            rel != gitconfig.as_path() && clone_managed(rel, &tool_checkout)
        }),
        prunes: Box::new(|_: &Path| false),
    };

    vec![
        BackupStep {
            name: BEFORE_CLONE,
            rule: Some(before),
        },
        BackupStep {
            name: CLONE_ALL,
            rule: None,
        },
        BackupStep {
            name: AFTER_CLONE,
            rule: Some(after),
        },
    ]
}

/// Names of the built-in steps in order.
pub fn builtin_step_names() -> Vec<&'static str> {
    vec![BEFORE_CLONE, CLONE_ALL, AFTER_CLONE]
}

/// Pick the steps to run.
///
/// An empty request selects every step. Otherwise only steps whose name
/// matches a requested entry (case-insensitively) run, in *defined*
/// order, not request order. Requested names matching no step warn.
pub fn select_steps<'a, S: AsRef<str>>(
    steps: &'a [BackupStep],
    requested: &[S],
) -> Vec<&'a BackupStep> {
    if requested.is_empty() {
        return steps.iter().collect();
    }

    for name in requested {
        let known = steps
            .iter()
            .any(|step| step.name.eq_ignore_ascii_case(name.as_ref().trim()));
        if !known {
            warn!("unknown step {:?}, ignoring", name.as_ref());
        }
    }

    steps
        .iter()
        .filter(|step| {
            requested
                .iter()
                .any(|name| step.name.eq_ignore_ascii_case(name.as_ref().trim()))
        })
        .collect()
}
