//! Integration test: checked-in fixture suite
//!
//! Validates that:
//! 1. Every fixture file under tests/fixtures parses.
//! 2. Case names are unique within a family.
//! 3. Every applicable case passes under both check levels.
//!
//! Run: cargo test -p tinyarena-harness --test fixture_suite_test

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tinyarena_core::CheckLevel;
use tinyarena_harness::{FixtureSet, TestRunner, VerificationSummary};

fn workspace_root() -> PathBuf {
    let manifest = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn load_suite() -> Vec<FixtureSet> {
    FixtureSet::load_dir(&workspace_root().join("tests/fixtures"))
        .expect("fixture suite should load")
}

#[test]
fn suite_loads_and_covers_each_family() {
    let sets = load_suite();
    let families: HashSet<_> = sets.iter().map(|set| set.family.as_str()).collect();
    for family in ["arena/basic", "arena/resize", "arena/release"] {
        assert!(families.contains(family), "missing family {family}");
    }
    for set in &sets {
        assert_eq!(set.version, "v1", "{}", set.family);
        assert!(!set.cases.is_empty(), "{} has no cases", set.family);
    }
}

#[test]
fn case_names_are_unique_per_family() {
    for set in load_suite() {
        let mut seen = HashSet::new();
        for case in &set.cases {
            assert!(
                seen.insert(case.name.as_str()),
                "{}: duplicate case {}",
                set.family,
                case.name
            );
        }
    }
}

#[test]
fn suite_passes_under_both_check_levels() {
    let sets = load_suite();
    let mut results = Vec::new();
    for level in [CheckLevel::Strict, CheckLevel::Off] {
        let runner = TestRunner::new("suite", level);
        for set in &sets {
            results.extend(runner.run(set));
        }
    }
    let summary = VerificationSummary::from_results(results);
    let failures: Vec<_> = summary
        .results
        .iter()
        .filter(|r| !r.passed && !r.skipped)
        .map(|r| format!("{}: {}", r.case_name, r.failure.as_deref().unwrap_or("?")))
        .collect();
    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
    assert!(summary.passed > 0);
}

#[test]
fn strict_only_cases_do_not_run_without_checks() {
    let sets = load_suite();
    let off = TestRunner::new("suite", CheckLevel::Off);
    let names: Vec<String> = sets
        .iter()
        .flat_map(|set| off.run(set))
        .map(|r| r.case_name)
        .collect();
    assert!(!names.iter().any(|name| name == "double_release_of_sole_block"));
    assert!(names.iter().all(|name| !name.ends_with("[strict]")));
}
