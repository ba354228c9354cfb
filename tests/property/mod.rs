//! Property-based tests for the restore step partition
//!
//! The two file steps must form a total, non-overlapping cover of every
//! path that can appear under a staging root: each path is restored by
//! exactly one of "before clone" and "after clone".

use burrow::builtin_steps;
use proptest::prelude::*;
use std::path::{Path, PathBuf};

/// Generate one path segment, biased towards interesting names
fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z][a-z0-9_.-]{0,10}".prop_map(|s| s),
        1 => Just("github.com".to_string()),
        1 => Just("gitlab.com".to_string()),
        1 => Just("Desktop".to_string()),
        1 => Just("burrow".to_string()),
    ]
}

/// Generate a staging-relative path, usually under the home prefix
fn rel_path_strategy() -> impl Strategy<Value = PathBuf> {
    let segments = prop::collection::vec(segment_strategy(), 1..=5);
    (any::<bool>(), segments).prop_map(|(under_home, segments)| {
        let mut path = if under_home {
            PathBuf::from("home/alice")
        } else {
            PathBuf::new()
        };
        for segment in segments {
            path.push(segment);
        }
        path
    })
}

proptest! {
    #[test]
    fn step_partition_is_total_and_non_overlapping(rel in rel_path_strategy()) {
        let steps = builtin_steps(Path::new("/home/alice"));
        let before = steps[0].rule.as_ref().unwrap();
        let after = steps[2].rule.as_ref().unwrap();

        let in_before = before.includes(&rel);
        let in_after = after.includes(&rel);
        prop_assert!(
            in_before ^ in_after,
            "path {:?} covered by {} steps",
            rel,
            if in_before && in_after { "both" } else { "no" }
        );
    }

    #[test]
    fn hosting_segments_always_restore_after_cloning(
        prefix in prop::collection::vec("[a-z]{1,6}", 0..3),
        suffix in prop::collection::vec("[a-z]{1,6}", 0..3),
    ) {
        let mut rel = PathBuf::from("home/alice");
        for segment in &prefix {
            rel.push(segment);
        }
        rel.push("github.com");
        for segment in &suffix {
            rel.push(segment);
        }

        let steps = builtin_steps(Path::new("/home/alice"));
        prop_assert!(!steps[0].rule.as_ref().unwrap().includes(&rel));
        prop_assert!(steps[2].rule.as_ref().unwrap().includes(&rel));
    }

    #[test]
    fn pruned_directories_contain_no_before_clone_paths(
        dir in rel_path_strategy(),
        below in prop::collection::vec("[a-z]{1,6}", 1..4),
    ) {
        let steps = builtin_steps(Path::new("/home/alice"));
        let before = steps[0].rule.as_ref().unwrap();
        prop_assume!(before.prunes(&dir));

        // Pruning a subtree must never hide a path the step would have
        // restored.
        let mut descendant = dir.clone();
        for segment in &below {
            descendant.push(segment);
        }
        prop_assert!(!before.includes(&descendant));
    }
}
