//! End-to-end scenarios over on-disk CSV fixtures: ingestion, both
//! validators, parameter handling, and full orchestrated runs.

use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;

use exodus::cli::Cli;
use exodus::data::{
    DataValidator, HardViolationPolicy, PipelineError, RawRecordSet, TimestampValidator,
    ValidationPolicy,
};
use exodus::system::Checkpoint;
use exodus::{Mode, Orchestrator};

fn write_fixture(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "timestamp,open,high,low,close,volume").expect("header");
    for line in lines {
        writeln!(file, "{line}").expect("row");
    }
    file
}

fn clean_rows(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            format!(
                "2024-01-01 {:02}:{:02}:00,{}.0,{}.5,{}.5,{}.0,100",
                i / 60,
                i % 60,
                100 + i, // open
                102 + i, // high
                98 + i,  // low
                101 + i, // close
            )
        })
        .collect()
}

fn cli_request(args: &[&str]) -> exodus::RunRequest {
    Cli::parse_from(args).into_request()
}

#[test]
fn scenario_a_duplicate_and_unparseable_timestamps() {
    // 100 rows: 98 clean, one exact duplicate timestamp, one unparseable.
    let mut rows = clean_rows(98);
    rows.push("2024-01-01 00:00:00,100.0,102.5,98.5,101.0,100".to_string());
    rows.push("not-a-timestamp,100.0,102.5,98.5,101.0,100".to_string());
    assert_eq!(rows.len(), 100);
    let file = write_fixture(&rows);

    let raw = RawRecordSet::from_csv(file.path()).expect("read");
    assert_eq!(raw.len(), 100);

    let table = TimestampValidator::new().validate(raw).expect("validates");
    assert_eq!(table.len(), 98);
    assert_eq!(table.diagnostics.parsed, 99);
    assert_eq!(table.diagnostics.rejected, 1);
    assert_eq!(table.diagnostics.deduplicated, 1);

    // Strictly ascending, no duplicates.
    for pair in table.rows.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
}

#[test]
fn scenario_b_high_below_low_rejected_and_reported() {
    let mut rows = clean_rows(10);
    // high < low in one row
    rows[4] = "2024-01-01 00:04:00,100.0,95.0,98.0,96.0,100".to_string();
    let file = write_fixture(&rows);

    let raw = RawRecordSet::from_csv(file.path()).expect("read");
    let table = TimestampValidator::new().validate(raw).expect("time ok");
    let validated = DataValidator::new().validate(table).expect("validates");

    assert_eq!(validated.len(), 9);
    assert_eq!(validated.report.relational_rejections, 1);
    assert_eq!(validated.report.rejections, 1);
}

#[test]
fn scenario_b_fails_when_rejection_disabled() {
    let mut rows = clean_rows(10);
    rows[4] = "2024-01-01 00:04:00,100.0,95.0,98.0,96.0,100".to_string();
    let file = write_fixture(&rows);

    let raw = RawRecordSet::from_csv(file.path()).expect("read");
    let table = TimestampValidator::new().validate(raw).expect("time ok");
    let policy = ValidationPolicy {
        hard_policy: HardViolationPolicy::Fail,
        ..Default::default()
    };
    let err = DataValidator::with_policy(policy).validate(table).unwrap_err();
    assert!(matches!(err, PipelineError::ValueDomain { .. }));
}

#[test]
fn scenario_c_invalid_fee_aborts_before_optimizer_dispatch() {
    let file = write_fixture(&clean_rows(50));
    let path = file.path().to_str().expect("utf8 path");

    let request = cli_request(&[
        "exodus",
        "--mode",
        "optimize",
        "--n-trials",
        "5",
        "--fee",
        "-1",
        "--data",
        path,
        "--output",
        out_dir().to_str().expect("utf8"),
    ]);

    let err = Orchestrator::new().run(request).unwrap_err();
    match err {
        PipelineError::Configuration { field, .. } => assert_eq!(field, "fee_rate"),
        other => panic!("expected configuration error, got {other}"),
    }
}

#[test]
fn scenario_d_backtest_succeeds_with_all_checkpoints() {
    let file = write_fixture(&clean_rows(60));
    let path = file.path().to_str().expect("utf8 path");

    let request = cli_request(&[
        "exodus",
        "--mode",
        "backtest",
        "--data",
        path,
        "--output",
        out_dir().to_str().expect("utf8"),
    ]);

    let outcome = Orchestrator::new().run(request).expect("run succeeds");
    assert!(outcome.success);
    assert_eq!(outcome.mode, Mode::Backtest);
    assert_eq!(outcome.rows, 60);
    assert_eq!(outcome.result.mode, "backtest");

    let checkpoints: Vec<Checkpoint> = outcome.snapshots.iter().map(|(c, _)| *c).collect();
    assert_eq!(
        checkpoints,
        vec![
            Checkpoint::Initial,
            Checkpoint::PreMode,
            Checkpoint::PostMode,
            Checkpoint::Final
        ]
    );
}

#[test]
fn full_pipeline_runs_every_mode() {
    let file = write_fixture(&clean_rows(60));
    let path = file.path().to_str().expect("utf8 path");

    for mode in ["train", "predict", "backtest", "optimize"] {
        let request = cli_request(&[
            "exodus",
            "--mode",
            mode,
            "--data",
            path,
            "--output",
            out_dir().to_str().expect("utf8"),
        ]);
        let outcome = Orchestrator::new().run(request).expect("run succeeds");
        assert!(outcome.success);
        assert_eq!(outcome.result.mode, mode);
    }
}

#[test]
fn empty_source_file_aborts_with_integrity_error() {
    let file = write_fixture(&[]);
    let raw = RawRecordSet::from_csv(file.path()).expect("read");
    let err = TimestampValidator::new().validate(raw).unwrap_err();
    assert!(matches!(err, PipelineError::DataIntegrity { .. }));
}

#[test]
fn missing_required_column_aborts_with_schema_violation() {
    // No volume column.
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "timestamp,open,high,low,close").expect("header");
    for i in 0..5 {
        writeln!(file, "2024-01-01 00:0{i}:00,100,102,98,101").expect("row");
    }

    let raw = RawRecordSet::from_csv(file.path()).expect("read");
    let table = TimestampValidator::new().validate(raw).expect("time ok");
    let err = DataValidator::new().validate(table).unwrap_err();
    match err {
        PipelineError::SchemaViolation { column } => assert_eq!(column, "volume"),
        other => panic!("expected schema violation, got {other}"),
    }
}

#[test]
fn revalidation_of_validated_table_is_noop() {
    let file = write_fixture(&clean_rows(20));
    let raw = RawRecordSet::from_csv(file.path()).expect("read");
    let table = TimestampValidator::new().validate(raw).expect("time ok");

    let validator = DataValidator::new();
    let first = validator.validate(table).expect("validates");
    let second = validator.revalidate(&first).expect("still valid");

    assert_eq!(second.report.corrections, 0);
    assert_eq!(second.report.rejections, 0);
    assert_eq!(second.rows, first.rows);
}

fn out_dir() -> std::path::PathBuf {
    // Created by the orchestrator on demand.
    std::env::temp_dir().join("exodus-integration-output")
}
