//! CLI entrypoint for the tinyarena harness.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tinyarena_core::CheckLevel;
use tinyarena_harness::structured_log::{
    LogEmitter, LogEntry, LogLevel, Outcome, from_arena_record,
};
use tinyarena_harness::verify::VerificationSummary;
use tinyarena_harness::{
    ArenaReport, FixtureSet, HarnessError, StormConfig, StormKind, TestRunner, run_storm,
};

/// Verification tooling for tinyarena.
#[derive(Debug, Parser)]
#[command(name = "tinyarena-harness")]
#[command(about = "Fixture replay and workload storms for tinyarena")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay fixture scripts under both check levels.
    Verify {
        /// Fixture JSON file or directory of fixture files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown); JSON goes next to it.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Run seeded allocation storms and report occupancy and fragmentation.
    Storm {
        /// Storm pattern, or `all`.
        #[arg(long, default_value = "all")]
        kind: String,
        /// Root seed (decimal or 0x...).
        #[arg(long, default_value = "0xDEAD_BEEF")]
        seed: String,
        #[arg(long, default_value_t = 64 * 1024)]
        region_size: usize,
        #[arg(long, default_value_t = 10_000)]
        ops: usize,
        #[arg(long, default_value_t = 256)]
        slots: usize,
        #[arg(long, default_value_t = 512)]
        max_size: usize,
        /// Check level (`strict` or `off`).
        #[arg(long, default_value = "strict")]
        checks: String,
        /// Output JSON path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Replay one fixture case and print its final arena state.
    Stats {
        /// Fixture JSON file or directory of fixture files.
        #[arg(long)]
        fixture: PathBuf,
        /// Case name.
        #[arg(long)]
        case: String,
        /// Check level (`strict` or `off`).
        #[arg(long, default_value = "strict")]
        checks: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            report,
            log,
            timestamp,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let fixture_sets = FixtureSet::load_dir(&fixture)?;
            let mut emitter = log.as_deref().map(open_log("verify")).transpose()?;

            let started = Instant::now();
            let mut results = Vec::new();
            for level in [CheckLevel::Strict, CheckLevel::Off] {
                let runner = TestRunner::new("fixture-verify", level);
                for set in &fixture_sets {
                    results.extend(runner.run(set));
                }
            }
            results.sort_by(|a, b| {
                a.family
                    .cmp(&b.family)
                    .then_with(|| a.mode.cmp(&b.mode))
                    .then_with(|| a.case_name.cmp(&b.case_name))
            });

            if let Some(emitter) = emitter.as_mut() {
                for result in &results {
                    let (level, outcome) = match (result.skipped, result.passed) {
                        (true, _) => (LogLevel::Info, Outcome::Skip),
                        (false, true) => (LogLevel::Info, Outcome::Pass),
                        (false, false) => (LogLevel::Error, Outcome::Fail),
                    };
                    let mut entry = LogEntry::new("", level, "case_result")
                        .with_case(result.case_name.as_str())
                        .with_mode(result.mode.as_str())
                        .with_outcome(outcome);
                    if let Some(failure) = &result.failure {
                        entry = entry.with_details(serde_json::json!({ "failure": failure }));
                    }
                    emitter.emit_entry(entry)?;
                }
            }

            let summary = VerificationSummary::from_results(results);
            let report_doc = ArenaReport {
                title: String::from("tinyarena Fixture Report"),
                mode: String::from("strict+off"),
                timestamp: timestamp
                    .unwrap_or_else(|| format!("{:?}", std::time::SystemTime::now())),
                summary,
            };

            eprintln!(
                "Verification complete: total={}, passed={}, failed={}, skipped={}",
                report_doc.summary.total,
                report_doc.summary.passed,
                report_doc.summary.failed,
                report_doc.summary.skipped
            );

            if let Some(emitter) = emitter.as_mut() {
                let outcome = if report_doc.summary.all_passed() {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                };
                emitter.emit_entry(
                    LogEntry::new("", LogLevel::Info, "verify_done")
                        .with_outcome(outcome)
                        .with_duration_ms(elapsed_ms(started)),
                )?;
                emitter.flush()?;
            }

            if let Some(report_path) = report {
                create_parent(&report_path)?;
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                std::fs::write(report_path.with_extension("json"), report_doc.to_json())?;
            }

            if !report_doc.summary.all_passed() {
                return Err("Fixture verification failed".into());
            }
        }
        Command::Storm {
            kind,
            seed,
            region_size,
            ops,
            slots,
            max_size,
            checks,
            output,
            log,
        } => {
            let seed = parse_seed(&seed).map_err(|err| err.to_string())?;
            let kinds = if kind.eq_ignore_ascii_case("all") {
                StormKind::all().to_vec()
            } else {
                let parsed = StormKind::from_str_loose(&kind)
                    .ok_or_else(|| HarnessError::UnknownStorm(kind).to_string())?;
                vec![parsed]
            };
            let check_level = CheckLevel::from_str_loose(&checks);
            let mut emitter = log.as_deref().map(open_log("storm")).transpose()?;

            let mut reports = Vec::new();
            for kind in kinds {
                let config = StormConfig {
                    region_size,
                    ops,
                    slots,
                    max_size,
                    check_level,
                    ..StormConfig::new(kind, seed)
                };
                let started = Instant::now();
                let report = run_storm(&config)?;
                eprintln!(
                    "[{}] allocations={} failures={} peak_used={} max_fragmentation={} intact={}",
                    report.storm,
                    report.allocations,
                    report.allocation_failures,
                    report.peak_used_size,
                    report.max_fragmentation_bytes,
                    report.integrity_check_passed
                );
                if let Some(emitter) = emitter.as_mut() {
                    let outcome = if report.integrity_check_passed {
                        Outcome::Pass
                    } else {
                        Outcome::Fail
                    };
                    emitter.emit_entry(
                        LogEntry::new("", LogLevel::Info, "storm_done")
                            .with_case(report.storm)
                            .with_mode(check_level.as_str())
                            .with_seed(seed)
                            .with_outcome(outcome)
                            .with_duration_ms(elapsed_ms(started))
                            .with_details(serde_json::to_value(&report.final_stats)?),
                    )?;
                }
                reports.push(report);
            }
            if let Some(emitter) = emitter.as_mut() {
                emitter.flush()?;
            }

            let body = serde_json::to_string_pretty(&reports)?;
            if let Some(path) = output {
                create_parent(&path)?;
                std::fs::write(&path, body)?;
                eprintln!("Wrote storm report to {}", path.display());
            } else {
                println!("{body}");
            }

            if reports.iter().any(|report| !report.integrity_check_passed) {
                return Err("Storm left the block list inconsistent".into());
            }
        }
        Command::Stats {
            fixture,
            case,
            checks,
        } => {
            let fixture_sets = FixtureSet::load_dir(&fixture)?;
            let found = fixture_sets
                .iter()
                .find_map(|set| set.case(&case))
                .ok_or_else(|| HarnessError::UnknownCase(case.clone()).to_string())?;
            let run = TestRunner::new("stats", CheckLevel::from_str_loose(&checks))
                .with_lifecycle_log(true)
                .replay(found);

            for record in &run.lifecycle {
                eprintln!("{}", from_arena_record(record).to_jsonl()?);
            }
            println!("{}", serde_json::to_string_pretty(&run)?);
            if let Some(failure) = run.failure {
                return Err(format!("case `{case}` failed: {failure}").into());
            }
        }
    }

    Ok(())
}

fn open_log(
    run_id: &'static str,
) -> impl Fn(&Path) -> std::io::Result<LogEmitter<std::io::BufWriter<std::fs::File>>> {
    move |path| {
        create_parent(path)?;
        LogEmitter::to_file(path, run_id)
    }
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn parse_seed(raw: &str) -> Result<u64, HarnessError> {
    let s = raw.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(&hex.replace('_', ""), 16)
    } else {
        s.replace('_', "").parse::<u64>()
    };
    parsed.map_err(|_| HarnessError::InvalidSeed(raw.to_string()))
}
