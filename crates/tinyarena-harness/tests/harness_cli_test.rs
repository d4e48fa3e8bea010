//! Integration test: harness binary
//!
//! Drives the `harness` binary end to end and checks the artifacts it
//! writes: markdown + JSON reports, JSONL logs and storm reports.
//!
//! Run: cargo test -p tinyarena-harness --test harness_cli_test

use std::path::{Path, PathBuf};
use std::process::Command;

use tinyarena_harness::structured_log::validate_log_line;

fn workspace_root() -> PathBuf {
    let manifest = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn out_dir(name: &str) -> PathBuf {
    let dir = workspace_root()
        .join("target/harness_cli_test")
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn harness() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_harness"));
    cmd.current_dir(workspace_root());
    cmd
}

#[test]
fn verify_writes_reports_and_log() {
    let dir = out_dir("verify");
    let report = dir.join("report.md");
    let log = dir.join("verify.jsonl");

    let output = harness()
        .args(["verify", "--fixture", "tests/fixtures", "--timestamp", "fixed"])
        .arg("--report")
        .arg(&report)
        .arg("--log")
        .arg(&log)
        .output()
        .expect("failed to run harness verify");
    assert!(
        output.status.success(),
        "verify failed:\nstderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let md = std::fs::read_to_string(&report).unwrap();
    assert!(md.starts_with("# tinyarena Fixture Report"));
    assert!(md.contains("- Timestamp: fixed"));
    assert!(!md.contains("| FAIL |"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report.with_extension("json")).unwrap())
            .unwrap();
    assert_eq!(json["mode"], "strict+off");
    assert_eq!(json["summary"]["failed"], 0);

    let lines = std::fs::read_to_string(&log).unwrap();
    let entries: Vec<_> = lines
        .lines()
        .map(|line| validate_log_line(line).expect("valid log line"))
        .collect();
    let total = json["summary"]["total"].as_u64().unwrap() as usize;
    assert_eq!(entries.len(), total + 1);
    assert_eq!(entries.last().unwrap().event, "verify_done");
    assert!(entries.iter().all(|e| e.run_id.as_deref() == Some("verify")));
}

#[test]
fn storm_report_is_reproducible() {
    let dir = out_dir("storm");
    let run = |path: &Path| {
        let output = harness()
            .args([
                "storm",
                "--kind",
                "random-churn",
                "--seed",
                "0x1234",
                "--region-size",
                "4096",
                "--ops",
                "400",
                "--slots",
                "16",
                "--max-size",
                "128",
            ])
            .arg("--output")
            .arg(path)
            .output()
            .expect("failed to run harness storm");
        assert!(
            output.status.success(),
            "storm failed:\nstderr={}",
            String::from_utf8_lossy(&output.stderr)
        );
        std::fs::read_to_string(path).unwrap()
    };

    let first = run(&dir.join("first.json"));
    let second = run(&dir.join("second.json"));
    assert_eq!(first, second);

    let reports: serde_json::Value = serde_json::from_str(&first).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["storm"], "random_churn");
    assert_eq!(reports[0]["seed"], 0x1234);
    assert_eq!(reports[0]["integrity_check_passed"], true);
}

#[test]
fn storm_rejects_unknown_kind_and_bad_seed() {
    let output = harness()
        .args(["storm", "--kind", "avalanche", "--ops", "1"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown storm kind"));

    let output = harness()
        .args(["storm", "--kind", "sawtooth", "--seed", "0xZZ", "--ops", "1"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid seed"));
}

#[test]
fn stats_prints_final_arena_state() {
    let output = harness()
        .args([
            "stats",
            "--fixture",
            "tests/fixtures/arena_resize.json",
            "--case",
            "shrink_grow_relocate",
        ])
        .output()
        .expect("failed to run harness stats");
    assert!(
        output.status.success(),
        "stats failed:\nstderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let run: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(run["case_name"], "shrink_grow_relocate");
    assert!(run["failure"].is_null());
    assert_eq!(run["stats"]["allocated_blocks"], 3);
    assert_eq!(run["metrics"]["relocations"], 1);
    assert!(
        run["lifecycle"]
            .as_array()
            .unwrap()
            .iter()
            .any(|record| record["event"] == "relocate")
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines().filter(|line| line.starts_with('{')) {
        validate_log_line(line).expect("lifecycle line should validate");
    }
}

#[test]
fn stats_reports_unknown_case() {
    let output = harness()
        .args(["stats", "--fixture", "tests/fixtures", "--case", "nope"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no fixture case named `nope`"));
}
