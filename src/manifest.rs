//! Backup set model and the active-selection registry
//!
//! A [`BackupSet`] is an immutable, named description of what to back up:
//! folders with hand-picked contents, individually added paths, and paths
//! to delete on apply. Sets are registered once and combined into a flat
//! working manifest per operation; the flattened value is handed to the
//! pipelines explicitly, so there is no process-wide selection state to
//! race against.

use crate::error::{BurrowError, Result};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A folder whose named entries (not the whole subtree) are eligible
#[derive(Debug, Clone)]
pub struct FolderSelection {
    /// Base directory, in `~` shorthand or absolute form
    pub base: String,
    /// Entries under `base` to include, in declaration order
    pub contents: Vec<String>,
}

/// A single file or whole directory tree, eligible in full
#[derive(Debug, Clone)]
pub struct PathAddition {
    /// Path in `~` shorthand or absolute form
    pub path: String,
    /// When true, an existing live copy is never overwritten on apply
    pub preserve_existing: bool,
}

/// A path deleted (not copied) during apply
#[derive(Debug, Clone)]
pub struct PathRemoval {
    /// Path in `~` shorthand or absolute form
    pub path: String,
}

/// A named, immutable backup selection
#[derive(Debug, Clone)]
pub struct BackupSet {
    /// Unique name, compared case-insensitively
    pub name: String,
    /// One-line human description
    pub description: String,
    /// Folder selections
    pub folders: Vec<FolderSelection>,
    /// Individually added paths
    pub adds: Vec<PathAddition>,
    /// Paths removed during apply
    pub removes: Vec<PathRemoval>,
}

/// The flattened working manifest for one operation
///
/// Concatenation of the active sets' three lists in selection order,
/// guaranteed collision-free by [`SetRegistry::flatten`].
#[derive(Debug, Clone, Default)]
pub struct FlatManifest {
    /// All folder selections
    pub folders: Vec<FolderSelection>,
    /// All path additions
    pub adds: Vec<PathAddition>,
    /// All path removals
    pub removes: Vec<PathRemoval>,
}

/// Registry of known backup sets plus the current activation order
#[derive(Debug, Default)]
pub struct SetRegistry {
    sets: HashMap<String, BackupSet>,
    active: Vec<String>,
}

impl SetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set under its lowercase name; re-registering replaces.
    pub fn register(&mut self, set: BackupSet) {
        self.sets.insert(set.name.to_lowercase(), set);
    }

    /// Replace the activation order with the named sets.
    ///
    /// Unknown names are ignored with a warning. If none of the names
    /// resolve, the previous selection is left unchanged — long-standing
    /// behavior callers rely on; the returned count lets them notice.
    pub fn activate<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let mut resolved = Vec::new();
        for name in names {
            let key = name.as_ref().to_lowercase();
            if self.sets.contains_key(&key) {
                resolved.push(key);
            } else {
                warn!("unknown backup set {:?}, ignoring", name.as_ref());
            }
        }

        if resolved.is_empty() {
            warn!("no requested backup set resolved; keeping previous selection");
            return 0;
        }

        let count = resolved.len();
        self.active = resolved;
        count
    }

    /// The active sets in activation order.
    pub fn active_sets(&self) -> Vec<&BackupSet> {
        self.active
            .iter()
            .filter_map(|name| self.sets.get(name))
            .collect()
    }

    /// Flatten the active selection into one working manifest.
    ///
    /// Every entry is checked, as it accumulates, against everything seen
    /// so far across all three categories (case-insensitive, trailing
    /// slashes ignored). The first repeat aborts: which of the colliding
    /// entries would win is undefined, so partial recovery is not offered.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::DuplicateManifestPath`] naming the repeated
    /// path and the category it reappeared in.
    pub fn flatten(&self) -> Result<FlatManifest> {
        let mut seen = HashSet::new();
        let mut flat = FlatManifest::default();

        for set in self.active_sets() {
            for folder in &set.folders {
                for entry in &folder.contents {
                    let joined = format!("{}/{}", folder.base.trim_end_matches('/'), entry);
                    claim(&mut seen, &joined, "folders")?;
                }
                flat.folders.push(folder.clone());
            }
            for add in &set.adds {
                claim(&mut seen, &add.path, "adds")?;
                flat.adds.push(add.clone());
            }
            for remove in &set.removes {
                claim(&mut seen, &remove.path, "removes")?;
                flat.removes.push(remove.clone());
            }
        }

        Ok(flat)
    }
}

/// Normalize a manifest path for collision detection.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
    trimmed.to_lowercase()
}

/// Record a normalized path, failing on the first repeat.
fn claim(seen: &mut HashSet<String>, path: &str, category: &'static str) -> Result<()> {
    if !seen.insert(normalize(path)) {
        return Err(BurrowError::DuplicateManifestPath {
            path: path.to_string(),
            category,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(name: &str, adds: &[&str], removes: &[&str]) -> BackupSet {
        BackupSet {
            name: name.to_string(),
            description: String::new(),
            folders: Vec::new(),
            adds: adds
                .iter()
                .map(|p| PathAddition {
                    path: p.to_string(),
                    preserve_existing: false,
                })
                .collect(),
            removes: removes
                .iter()
                .map(|p| PathRemoval {
                    path: p.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_flatten_concatenates_in_selection_order() {
        let mut registry = SetRegistry::new();
        registry.register(set("shell", &["~/.zshrc", "~/.profile"], &[]));
        registry.register(set("editor", &["~/.config/zed"], &["~/.vimrc"]));

        assert_eq!(registry.activate(&["editor", "shell"]), 2);
        let flat = registry.flatten().unwrap();
        let order: Vec<_> = flat.adds.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(order, vec!["~/.config/zed", "~/.zshrc", "~/.profile"]);
        assert_eq!(flat.removes.len(), 1);
    }

    #[test]
    fn test_flatten_rejects_cross_set_duplicates() {
        let mut registry = SetRegistry::new();
        registry.register(set("a", &["~/.zshrc"], &[]));
        registry.register(set("b", &["~/.ZSHRC"], &[]));
        registry.activate(&["a", "b"]);

        match registry.flatten() {
            Err(BurrowError::DuplicateManifestPath { path, category }) => {
                assert_eq!(path, "~/.ZSHRC");
                assert_eq!(category, "adds");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_flatten_rejects_cross_category_duplicates() {
        let mut registry = SetRegistry::new();
        registry.register(set("a", &["~/.bashrc"], &["~/.bashrc"]));
        registry.activate(&["a"]);

        match registry.flatten() {
            Err(BurrowError::DuplicateManifestPath { category, .. }) => {
                assert_eq!(category, "removes");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_folder_entries_collide_with_adds() {
        let mut registry = SetRegistry::new();
        let mut folders = set("a", &["~/.config/zed/settings.json"], &[]);
        folders.folders.push(FolderSelection {
            base: "~/.config/zed".to_string(),
            contents: vec!["settings.json".to_string()],
        });
        registry.register(folders);
        registry.activate(&["a"]);
        assert!(registry.flatten().is_err());
    }

    #[test]
    fn test_activate_ignores_unknown_and_keeps_previous_on_total_miss() {
        let mut registry = SetRegistry::new();
        registry.register(set("core", &["~/.zshrc"], &[]));
        assert_eq!(registry.activate(&["core", "nope"]), 1);
        assert_eq!(registry.active_sets().len(), 1);

        // A selection where nothing resolves is a no-op.
        assert_eq!(registry.activate(&["missing"]), 0);
        assert_eq!(registry.active_sets().len(), 1);
        assert_eq!(registry.active_sets()[0].name, "core");
    }

    #[test]
    fn test_register_overwrites_case_insensitively() {
        let mut registry = SetRegistry::new();
        registry.register(set("Core", &["~/.zshrc"], &[]));
        registry.register(set("core", &["~/.profile"], &[]));
        registry.activate(&["CORE"]);
        let flat = registry.flatten().unwrap();
        assert_eq!(flat.adds[0].path, "~/.profile");
    }
}
