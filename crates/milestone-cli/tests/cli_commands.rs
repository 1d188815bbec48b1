// crates/milestone-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: End-to-end tests for the milestone binary over a SQLite store.
// Purpose: Ensure commands emit JSON and map failures to exit codes.
// Dependencies: milestone-cli binary
// ============================================================================
//! ## Overview
//! Runs the `milestone` binary against a temporary `SQLite` store and checks
//! stdout JSON, stderr messages, and exit codes.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const REQUEST_A: &str = "5b1f3c1e-8f0a-4d52-9a3e-6c2b7d4e1f90";
const REQUEST_B: &str = "e2d4a6b8-0c1e-4f3a-8b5d-7e9f1a2c3b4d";

fn milestone_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_milestone"))
}

fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let config = dir.path().join("milestone.toml");
    let db = dir.path().join("data").join("milestones.db");
    fs::write(
        &config,
        format!("[store]\ntype = \"sqlite\"\npath = \"{}\"\n", db.display().to_string().replace('\\', "/")),
    )
    .expect("write config");
    (dir, config)
}

fn write_grid(dir: &Path, name: &str, cells: &[(u8, &str, &str, &str)]) -> PathBuf {
    let stages: Vec<Value> = (1_u8 ..= 8)
        .map(|stage| {
            let mut gates = serde_json::Map::new();
            for gate in ["ZP5", "ELET", "ZP7"] {
                let mut phases = serde_json::Map::new();
                for phase in ["VFF", "PVS", "SO", "TPPA", "SOP"] {
                    let value = cells
                        .iter()
                        .find(|(s, g, p, _)| *s == stage && *g == gate && *p == phase)
                        .map_or("", |(_, _, _, date)| *date);
                    phases.insert(phase.to_string(), json!(value));
                }
                gates.insert(gate.to_string(), Value::Object(phases));
            }
            json!({ "stage": stage, "description": format!("Stage {stage}"), "gates": gates })
        })
        .collect();
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(&json!({ "stages": stages })).unwrap()).unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(milestone_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("run milestone")
}

fn stdout_json(output: &Output) -> Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn create_get_and_query_due_dates() {
    let (dir, config) = workspace();
    let grid = write_grid(dir.path(), "grid.json", &[(2, "ELET", "SO", "2026-02-24")]);
    let grid_arg = grid.to_string_lossy().to_string();

    let created = stdout_json(&run(&config, &[
        "project",
        "create",
        "--id",
        "alpha",
        "--name",
        "Alpha",
        "--grid",
        &grid_arg,
        "--request-id",
        REQUEST_A,
    ]));
    assert_eq!(created["projectId"], "alpha");
    assert_eq!(created["status"], "ACTIVE");

    let fetched = stdout_json(&run(&config, &["project", "get", "--id", "alpha"]));
    assert_eq!(fetched["grid"]["stages"][1]["gates"]["ELET"]["SO"], "2026-02-24");

    let listed = stdout_json(&run(&config, &["project", "list"]));
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let due = stdout_json(&run(&config, &["due", "date", "--date", "2026-02-24"]));
    assert_eq!(due["items"][0]["projectId"], "alpha");
    assert_eq!(due["items"][0]["stageDescription"], "Stage 2");

    let range =
        stdout_json(&run(&config, &["due", "range", "--start", "2026-02-23", "--days", "3"]));
    assert_eq!(range["pages"].as_array().unwrap().len(), 3);
}

#[test]
fn conflicting_create_exits_with_client_error() {
    let (dir, config) = workspace();
    let grid = write_grid(dir.path(), "grid.json", &[]);
    let grid_arg = grid.to_string_lossy().to_string();
    let args = |request_id: &'static str| {
        vec![
            "project".to_string(),
            "create".to_string(),
            "--id".to_string(),
            "alpha".to_string(),
            "--name".to_string(),
            "Alpha".to_string(),
            "--grid".to_string(),
            grid_arg.clone(),
            "--request-id".to_string(),
            request_id.to_string(),
        ]
    };
    let first: Vec<String> = args(REQUEST_A);
    let first_refs: Vec<&str> = first.iter().map(String::as_str).collect();
    assert!(run(&config, &first_refs).status.success());

    let replay = run(&config, &first_refs);
    assert!(replay.status.success());

    let second: Vec<String> = args(REQUEST_B);
    let second_refs: Vec<&str> = second.iter().map(String::as_str).collect();
    let conflict = run(&config, &second_refs);
    assert_eq!(conflict.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&conflict.stderr).contains("project already exists"));
}

#[test]
fn invalid_inputs_exit_with_client_error() {
    let (dir, config) = workspace();
    let grid = write_grid(dir.path(), "grid.json", &[]);
    let grid_arg = grid.to_string_lossy().to_string();

    let missing_request = run(&config, &[
        "project", "create", "--id", "alpha", "--name", "Alpha", "--grid", &grid_arg,
    ]);
    assert_eq!(missing_request.status.code(), Some(2));

    let bad_date = run(&config, &["due", "date", "--date", "2026-02-30"]);
    assert_eq!(bad_date.status.code(), Some(2));

    let unknown = run(&config, &["project", "get", "--id", "ghost"]);
    assert_eq!(unknown.status.code(), Some(2));
}

#[test]
fn config_validate_reports_ok_and_rejects_bad_config() {
    let (dir, config) = workspace();
    let output = run(&config, &["config", "validate"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[batch]\nmax_retries = 0\n").unwrap();
    let output = run(&bad, &["config", "validate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("batch max_retries"));
}
