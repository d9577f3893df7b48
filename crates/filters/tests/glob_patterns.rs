//! Integration tests for exclusion pattern matching.
//!
//! These tests exercise the glob syntax accepted by `--exclude`: single-segment
//! wildcards, the recursive `**` wildcard, anchoring, and the segment-boundary
//! semantics that let a bare directory name exclude a whole subtree.

use filters::{ExclusionRule, ExclusionSet};

// ============================================================================
// Single Star Wildcard Tests (*)
// ============================================================================

/// Verifies `*` matches any filename characters.
#[test]
fn star_matches_any_filename() {
    let set = ExclusionSet::compile(["file*"]).unwrap();

    assert!(set.is_excluded("file"));
    assert!(set.is_excluded("file.txt"));
    assert!(set.is_excluded("filename"));
    assert!(set.is_excluded("file.tar.gz"));
    assert!(!set.is_excluded("profile"));
}

/// Verifies multiple `*` in pattern.
#[test]
fn multiple_stars() {
    let set = ExclusionSet::compile(["*_*_*.txt"]).unwrap();

    assert!(set.is_excluded("a_b_c.txt"));
    assert!(set.is_excluded("foo_bar_baz.txt"));
    assert!(!set.is_excluded("a_b.txt"));
}

/// A star pattern matching a directory excludes its contents too.
#[test]
fn star_directory_excludes_contents() {
    let set = ExclusionSet::compile(["cache-*"]).unwrap();

    assert!(set.is_excluded("cache-v1"));
    assert!(set.is_excluded("cache-v1/blob/0001"));
    assert!(set.is_excluded("app/cache-v2/index"));
}

// ============================================================================
// Recursive Wildcard Tests (**)
// ============================================================================

/// Verifies `**` between segments matches zero or more directories.
#[test]
fn double_star_between_segments() {
    let set = ExclusionSet::compile(["/assets/**/raw"]).unwrap();

    assert!(set.is_excluded("assets/raw"));
    assert!(set.is_excluded("assets/img/raw"));
    assert!(set.is_excluded("assets/img/2024/raw/a.psd"));
    assert!(!set.is_excluded("other/assets/raw"));
}

/// Verifies a trailing `**` excludes the subtree but not a sibling prefix.
#[test]
fn trailing_double_star() {
    let set = ExclusionSet::compile(["/build/**"]).unwrap();

    assert!(set.is_excluded("build/out.bin"));
    assert!(set.is_excluded("build/a/b/c"));
    assert!(!set.is_excluded("builds/out.bin"));
}

// ============================================================================
// Anchoring
// ============================================================================

/// Anchored patterns only match from the synchronization root.
#[test]
fn anchored_pattern_matches_only_at_root() {
    let set = ExclusionSet::compile(["/foo/bar"]).unwrap();

    assert!(set.is_excluded("foo/bar"));
    assert!(set.is_excluded("foo/bar/baz.txt"));
    assert!(!set.is_excluded("a/foo/bar"));
}

/// Leading separators on the candidate path are ignored.
#[test]
fn leading_separator_on_path_is_ignored() {
    let set = ExclusionSet::compile(["/site/private"]).unwrap();

    assert!(set.is_excluded("/site/private"));
    assert!(set.is_excluded(r"\site\private\key.pem"));
}

// ============================================================================
// Rule Introspection
// ============================================================================

/// Rules keep the pattern text for skip reasons.
#[test]
fn rules_report_original_pattern() {
    let set = ExclusionSet::compile([r"logs\", "/Cache/"]).unwrap();
    let patterns: Vec<_> = set.rules().iter().map(ExclusionRule::pattern).collect();

    assert_eq!(patterns, [r"logs\", "/Cache/"]);
    assert!(!set.rules()[0].is_anchored());
    assert!(set.rules()[1].is_anchored());
}

/// Excluding with a pattern that only matches by extension leaves other files alone.
#[test]
fn extension_pattern_leaves_other_files() {
    let set = ExclusionSet::compile(["*.bak"]).unwrap();

    assert!(set.is_excluded("db.bak"));
    assert!(set.is_excluded("a/b/db.BAK"));
    assert!(!set.is_excluded("db.bak.txt"));
    assert!(!set.is_excluded("bak"));
}
