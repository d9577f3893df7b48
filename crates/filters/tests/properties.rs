//! Property tests for exclusion matching invariants.

use filters::ExclusionSet;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,8}"
}

fn relative_path() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..5)
}

proptest! {
    /// A bare segment name excludes every path that contains that segment.
    #[test]
    fn bare_segment_excludes_any_path_containing_it(path in relative_path(), index in any::<prop::sample::Index>()) {
        let needle = path[index.index(path.len())].clone();
        let set = ExclusionSet::compile([needle.as_str()]).unwrap();
        prop_assert!(set.is_excluded(&path.join("/")));
    }

    /// Case never changes the outcome.
    #[test]
    fn matching_is_case_insensitive(path in relative_path(), index in any::<prop::sample::Index>()) {
        let needle = path[index.index(path.len())].to_uppercase();
        let set = ExclusionSet::compile([needle.as_str()]).unwrap();
        prop_assert!(set.is_excluded(&path.join("/").to_lowercase()));
    }

    /// Backslash and slash separators produce the same decision.
    #[test]
    fn separators_are_interchangeable(path in relative_path(), pattern in segment()) {
        let set = ExclusionSet::compile([pattern.as_str()]).unwrap();
        prop_assert_eq!(
            set.is_excluded(&path.join("/")),
            set.is_excluded(&path.join("\\"))
        );
    }

    /// A name that appears in no segment of the path never excludes it.
    #[test]
    fn absent_segment_never_excludes(path in relative_path()) {
        let set = ExclusionSet::compile(["zz-not-generated"]).unwrap();
        prop_assert!(!set.is_excluded(&path.join("/")));
    }
}
