#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use std::io::Write;
use tempfile::NamedTempFile;

const PROJECT: &str = r#"{
  "today": "2024-01-15",
  "tasks": [
    { "id": "T1", "title": "Groundwork", "status": "done" },
    { "id": "T2", "title": "Follow-up", "status": "pending", "dependencies": ["T1"] }
  ],
  "records": {
    "T1": { "created_at": "2024-01-01", "closed_at": "2024-01-10" }
  }
}"#;

const CYCLIC_PROJECT: &str = r#"{
  "tasks": [
    { "id": "A", "title": "Alpha", "dependencies": ["B"] },
    { "id": "B", "title": "Beta", "dependencies": ["A"] }
  ]
}"#;

fn project_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write project");
    file
}

#[allow(deprecated)]
fn cli() -> Command {
    Command::cargo_bin("cli").expect("cli binary")
}

#[test]
fn cli_prints_schedule_table() {
    let project = project_file(PROJECT);
    cli()
        .arg(project.path())
        .assert()
        .success()
        .stdout(str_contains("T1: Groundwork"))
        .stdout(str_contains("2024-01-11"))
        .stdout(str_contains("Scheduled (tasks=2, done=1"));
}

#[test]
fn cli_today_flag_overrides_project_date() {
    let project = project_file(PROJECT);
    cli()
        .arg(project.path())
        .args(["--today", "2024-01-20"])
        .assert()
        .success()
        .stdout(str_contains("2024-01-27"));
}

#[test]
fn cli_writes_entries_as_json() {
    let project = project_file(PROJECT);
    let out = NamedTempFile::new().expect("create output file");
    cli()
        .arg(project.path())
        .arg("--out")
        .arg(out.path())
        .assert()
        .success();

    let written = std::fs::read_to_string(out.path()).expect("read output");
    let entries: serde_json::Value = serde_json::from_str(&written).expect("valid json");
    assert_eq!(entries[0]["task_id"], "T1");
    assert_eq!(entries[0]["start_date"], "2024-01-01");
    assert_eq!(entries[1]["start_date"], "2024-01-11");
    assert_eq!(entries[1]["resolution"], "dependency_driven");
}

#[test]
fn cli_json_flag_prints_entries() {
    let project = project_file(PROJECT);
    cli()
        .arg(project.path())
        .arg("--json")
        .assert()
        .success()
        .stdout(str_contains("\"task_id\": \"T2\""));
}

#[test]
fn cli_exits_with_cycle_code() {
    let project = project_file(CYCLIC_PROJECT);
    cli()
        .arg(project.path())
        .args(["--today", "2024-01-15"])
        .assert()
        .code(1)
        .stderr(str_contains("Cyclic tasks: A, B"));
}

#[test]
fn cli_rejects_missing_project_file() {
    cli()
        .arg("does-not-exist.json")
        .assert()
        .code(2)
        .stderr(str_contains("could not load"));
}

#[test]
fn cli_rejects_malformed_date() {
    let project = project_file(PROJECT);
    cli()
        .arg(project.path())
        .args(["--today", "15/01/2024"])
        .assert()
        .code(2)
        .stderr(str_contains("Invalid date"));
}

#[test]
fn cli_rejects_invalid_configuration() {
    let project = project_file(
        r#"{ "config": { "lookahead_days": 0 }, "tasks": [ { "id": "1", "title": "A" } ] }"#,
    );
    cli()
        .arg(project.path())
        .assert()
        .code(2)
        .stderr(str_contains("invalid configuration"));
}

#[test]
fn cli_rejects_oversized_lookahead_without_panicking() {
    let project = project_file(
        r#"{ "config": { "lookahead_days": 1000000000000 }, "tasks": [ { "id": "1", "title": "A" } ] }"#,
    );
    cli()
        .arg(project.path())
        .assert()
        .code(2)
        .stderr(str_contains("lookahead window"));
}
