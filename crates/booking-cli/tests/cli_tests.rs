//! Integration tests for the `booking` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the expand, check,
//! and free subcommands through the actual binary, including stdin input,
//! layered configuration, exit codes, and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper: path to the calendar.json fixture.
fn calendar_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/calendar.json")
}

fn config_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/booking.toml")
}

fn bad_timezone_config_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/bad_timezone.toml")
}

/// Helper: a `booking` command isolated from any `BOOKING_*` / `RUST_LOG` in the
/// test environment.
fn booking() -> Command {
    let mut cmd = Command::cargo_bin("booking").unwrap();
    for var in [
        "BOOKING_TIMEZONE",
        "BOOKING_MAX_INSTANCES",
        "BOOKING_DST_POLICY",
        "BOOKING_LOG_LEVEL",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout must be valid JSON")
}

const MARCH: [&str; 4] = [
    "--from",
    "2026-03-01T00:00:00Z",
    "--to",
    "2026-04-01T00:00:00Z",
];

// ─────────────────────────────────────────────────────────────────────────────
// expand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_renders_parents_and_virtual_instances() {
    let output = booking()
        .args(["expand", "-i", calendar_path()])
        .args(MARCH)
        .output()
        .unwrap();
    assert!(output.status.success());

    let occurrences = stdout_json(&output);
    let ids: Vec<&str> = occurrences
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();

    // standup: parent + 3 weekly instances (repeat_until is inclusive)
    // yoga: parent + 03-17 (03-10 is excluded)
    assert_eq!(
        ids,
        vec![
            "standup",
            "yoga",
            "standup_2026-03-09",
            "standup_2026-03-16",
            "lunch",
            "yoga_2026-03-17",
            "standup_2026-03-23",
        ]
    );
}

#[test]
fn expand_marks_virtual_instances() {
    let output = booking()
        .args(["expand", "-i", calendar_path()])
        .args(MARCH)
        .output()
        .unwrap();
    let occurrences = stdout_json(&output);

    let instance = occurrences
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["id"] == "standup_2026-03-16")
        .expect("instance must be rendered");
    assert_eq!(instance["is_virtual_instance"], true);
    assert_eq!(instance["parent_event_id"], "standup");
    assert_eq!(instance["start"], "2026-03-16T09:00:00Z");
    assert_eq!(instance["end"], "2026-03-16T10:00:00Z");
}

#[test]
fn expand_reads_calendar_from_stdin() {
    let json = std::fs::read_to_string(calendar_path()).unwrap();

    booking()
        .arg("expand")
        .args(MARCH)
        .write_stdin(json)
        .assert()
        .success()
        .stdout(predicate::str::contains("standup_2026-03-09"));
}

#[test]
fn expand_window_excludes_out_of_range_rows() {
    let output = booking()
        .args(["expand", "-i", calendar_path()])
        .args(["--from", "2026-03-16T00:00:00Z", "--to", "2026-03-17T00:00:00Z"])
        .output()
        .unwrap();
    let occurrences = stdout_json(&output);
    assert_eq!(occurrences.as_array().unwrap().len(), 2);
}

#[test]
fn expand_rejects_inverted_window() {
    booking()
        .args(["expand", "-i", calendar_path()])
        .args(["--from", "2026-04-01T00:00:00Z", "--to", "2026-03-01T00:00:00Z"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Window start must be before window end"));
}

// ─────────────────────────────────────────────────────────────────────────────
// check
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_reports_overlapping_event_and_exits_nonzero() {
    let output = booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T14:00:00Z", "--end", "2026-03-16T15:00:00Z"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let result = stdout_json(&output);
    assert_eq!(result["available"], false);
    assert_eq!(result["conflict"]["source_id"], "lunch");
    assert_eq!(result["conflict"]["start"], "2026-03-16T13:00:00Z");
    assert_eq!(result["conflict"]["end"], "2026-03-16T14:30:00Z");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Lunch with Nino"));
}

#[test]
fn check_touching_endpoints_are_free() {
    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T10:00:00Z", "--end", "2026-03-16T11:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"available\": true"));
}

#[test]
fn check_conflicts_with_virtual_instance() {
    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-23T09:30:00Z", "--end", "2026-03-23T10:30:00Z"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("standup_2026-03-23"));
}

#[test]
fn check_excludes_the_occurrence_being_moved() {
    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T09:30:00Z", "--end", "2026-03-16T10:30:00Z"])
        .args(["--exclude", "standup_2026-03-16"])
        .assert()
        .success();
}

#[test]
fn excluding_the_parent_row_still_conflicts_with_its_instances() {
    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T09:30:00Z", "--end", "2026-03-16T10:30:00Z"])
        .args(["--exclude", "standup"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("standup_2026-03-16"));
}

#[test]
fn check_excludes_the_series_being_rescheduled() {
    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T09:30:00Z", "--end", "2026-03-16T10:30:00Z"])
        .args(["--exclude-series", "standup"])
        .assert()
        .success();
}

#[test]
fn check_ignores_pending_bookings_but_not_approved_ones() {
    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T11:00:00Z", "--end", "2026-03-16T12:00:00Z"])
        .assert()
        .success();

    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T16:30:00Z", "--end", "2026-03-16T17:30:00Z"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("req-approved"))
        .stdout(predicate::str::contains("booking_request"));
}

#[test]
fn check_all_lists_every_conflict_in_order() {
    let output = booking()
        .args(["check", "-i", calendar_path(), "--all"])
        .args(["--start", "2026-03-16T09:00:00Z", "--end", "2026-03-16T15:00:00Z"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output);
    assert_eq!(report["available"], false);
    let ids: Vec<&str> = report["conflicts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["source_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["standup_2026-03-16", "lunch"]);
}

#[test]
fn check_rejects_end_before_start() {
    booking()
        .args(["check", "-i", calendar_path()])
        .args(["--start", "2026-03-16T15:00:00Z", "--end", "2026-03-16T14:00:00Z"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));
}

#[test]
fn check_requires_start_and_end() {
    booking()
        .args(["check", "-i", calendar_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--start"));
}

// ─────────────────────────────────────────────────────────────────────────────
// free
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn free_lists_gaps_between_committed_intervals() {
    let output = booking()
        .args(["free", "-i", calendar_path()])
        .args(["--from", "2026-03-16T08:00:00Z", "--to", "2026-03-16T18:00:00Z"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let slots = stdout_json(&output);
    let minutes: Vec<i64> = slots
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["duration_minutes"].as_i64().unwrap())
        .collect();
    // 08-09, 10-13 (pending request ignored), 14:30-16, 17-18
    assert_eq!(minutes, vec![60, 180, 90, 60]);
}

#[test]
fn free_filters_short_slots() {
    let output = booking()
        .args(["free", "-i", calendar_path(), "--min-minutes", "90"])
        .args(["--from", "2026-03-16T08:00:00Z", "--to", "2026-03-16T18:00:00Z"])
        .output()
        .unwrap();

    let slots = stdout_json(&output);
    let starts: Vec<&str> = slots
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["2026-03-16T10:00:00Z", "2026-03-16T14:30:00Z"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn config_file_caps_instances() {
    let output = booking()
        .args(["--config", config_path(), "expand", "-i", calendar_path()])
        .args(MARCH)
        .output()
        .unwrap();
    assert!(output.status.success());
    // standup: parent + 2 steps; lunch; yoga: parent + 03-17 (step 1 excluded)
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 6);
}

#[test]
fn env_overrides_config_file() {
    let output = booking()
        .env("BOOKING_MAX_INSTANCES", "1")
        .args(["--config", config_path(), "expand", "-i", calendar_path()])
        .args(MARCH)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 4);
}

#[test]
fn invalid_timezone_in_config_fails() {
    booking()
        .args(["--config", bad_timezone_config_path(), "expand", "-i", calendar_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mars/Olympus_Mons"));
}

#[test]
fn timezone_flag_overrides_config() {
    booking()
        .args(["--timezone", "Not/A_Zone", "expand", "-i", calendar_path()])
        .args(MARCH)
        .assert()
        .failure();
}

#[test]
fn missing_config_file_is_reported() {
    booking()
        .args(["--config", "/nonexistent/booking.toml", "expand", "-i", calendar_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Error handling
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn invalid_calendar_json_fails() {
    booking()
        .arg("expand")
        .args(MARCH)
        .write_stdin("{ not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse calendar JSON"));
}

#[test]
fn missing_input_file_fails() {
    booking()
        .args(["expand", "-i", "/nonexistent/calendar.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn no_subcommand_shows_usage() {
    booking()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
