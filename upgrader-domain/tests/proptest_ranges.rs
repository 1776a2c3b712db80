//! Property-based tests for version ranges and repository ordering.
//!
//! These tests verify that:
//! - Ranges derived from a current version never contain it
//! - Major ranges skip later minors of the current major
//! - `find` returns ascending collections that all satisfy the range

use camino::Utf8PathBuf;
use fs_err as fs;
use proptest::prelude::*;
use semver::Version;
use tempfile::TempDir;
use upgrader_domain::version::{range_from_release_type, range_from_target};
use upgrader_domain::{CodemodRepository, DomainError, FindQuery, Range, ReleaseType, Target};

fn arb_version() -> impl Strategy<Value = Version> {
    (0u64..20, 0u64..20, 0u64..20).prop_map(|(a, b, c)| Version::new(a, b, c))
}

fn arb_release_type() -> impl Strategy<Value = ReleaseType> {
    prop_oneof![
        Just(ReleaseType::Major),
        Just(ReleaseType::Minor),
        Just(ReleaseType::Patch),
        Just(ReleaseType::Latest),
    ]
}

proptest! {
    #[test]
    fn derived_ranges_exclude_current(current in arb_version(), kind in arb_release_type()) {
        let range = range_from_release_type(&current, kind);
        prop_assert!(!range.contains(&current));
    }

    #[test]
    fn major_range_targets_next_major_only(current in arb_version(), bump in 1u64..5, patch in 0u64..5) {
        let range = range_from_release_type(&current, ReleaseType::Major);
        let later_minor = Version::new(current.major, current.minor + bump, patch);
        let next_major = Version::new(current.major + 1, 0, 0);
        let after_next = Version::new(current.major + 1, 0, 1);

        prop_assert!(!range.contains(&later_minor));
        prop_assert!(range.contains(&next_major));
        prop_assert!(!range.contains(&after_next));
    }

    #[test]
    fn exact_target_range_is_half_open(current in arb_version(), target in arb_version()) {
        match range_from_target(&current, &Target::Exact(target.clone())) {
            Ok(range) => {
                prop_assert!(target > current);
                prop_assert!(range.contains(&target));
                prop_assert!(!range.contains(&current));
            }
            Err(err) => {
                prop_assert!(target <= current);
                let is_invalid_target = matches!(err, DomainError::InvalidTarget { .. });
                prop_assert!(is_invalid_target);
            }
        }
    }

    #[test]
    fn find_is_ascending_and_filtered(
        versions in prop::collection::btree_set(arb_version(), 1..8),
        lower in arb_version(),
        upper in arb_version(),
    ) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        for v in &versions {
            let dir = root.join(v.to_string());
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("step.code.ts"), "").unwrap();
            fs::write(dir.join("deps.document.json"), "[]").unwrap();
        }

        let repo = CodemodRepository::open(&root).unwrap();
        let range = Range::between(lower, upper);
        let found = repo.find(&FindQuery::in_range(range.clone()));

        let found_versions: Vec<Version> = found.iter().map(|c| c.version.clone()).collect();
        let mut sorted = found_versions.clone();
        sorted.sort();
        prop_assert_eq!(&found_versions, &sorted);

        for collection in &found {
            prop_assert!(range.contains(&collection.version));
            prop_assert_eq!(collection.len(), 2);
        }

        let expected = versions.iter().filter(|v| range.contains(v)).count();
        prop_assert_eq!(found.len(), expected);
        prop_assert_eq!(repo.count_range(&range), expected * 2);
    }
}
