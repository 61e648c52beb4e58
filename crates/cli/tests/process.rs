use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn cli(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("dupe-triage").expect("binary");
    cmd.current_dir(root)
        .env_remove("DUPE_TRIAGE_CONCURRENCY")
        .env_remove("DUPE_TRIAGE_TEST_MODE")
        .arg("--quiet")
        .arg("--test-mode")
        .arg("--project-root")
        .arg(root);
    cmd
}

fn findings() -> Value {
    json!([
        {
            "finding_id": "fix-me",
            "title": "parse_rows duplicated",
            "evidence": {
                "similarity_score": 0.92,
                "total_lines": 25,
                "symbol_types": ["function"],
                "original_symbol": {"file": "src/a.py", "name": "parse_rows", "type": "function"},
                "duplicate_symbol": {"file": "src/b.py", "name": "parse_lines", "type": "function"}
            }
        },
        {
            "finding_id": "review-me",
            "title": "Shared client",
            "evidence": {
                "similarity_score": 0.88,
                "total_lines": 150,
                "is_public": true,
                "cross_module": true,
                "original_symbol": {"file": "api/client.py", "name": "ApiClient"},
                "duplicate_symbol": {"file": "web/client.py", "name": "WebClient"}
            }
        },
        {
            "finding_id": "tiny",
            "evidence": {
                "similarity_score": 0.97,
                "total_lines": 3,
                "original_symbol": {"file": "src/c.py", "name": "helper"},
                "duplicate_symbol": {"file": "src/d.py", "name": "helper_two"}
            }
        }
    ])
}

#[test]
fn process_routes_findings_and_writes_reports() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let input = root.join("findings.json");
    fs::write(&input, findings().to_string()).unwrap();

    let output = cli(root)
        .arg("process")
        .arg("--file")
        .arg(&input)
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let batch: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(batch["status"], "success");
    assert_eq!(batch["findings_processed"], 3);
    let actions: Vec<&str> = batch["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["automatic_fix", "github_issue", "skipped"]);
    assert_eq!(batch["results"][1]["issue_url"], "https://github.com/test/repo/issues/123");
    assert_eq!(batch["summary"]["processing_results"]["errors"], 0);

    let latest = root.join(".ci-registry/reports/latest-analysis.json");
    let report: Value = serde_json::from_slice(&fs::read(latest).unwrap()).unwrap();
    assert_eq!(report["metadata"]["analysis_type"], "duplicate_detection");
    assert_eq!(report["findings"].as_array().unwrap().len(), 3);
}

#[test]
fn process_reads_stdin_and_honours_no_report() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    cli(root)
        .arg("process")
        .arg("--no-report")
        .write_stdin(findings().to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"findings_processed\":3"));

    assert!(!root.join(".ci-registry/reports").exists());
}

#[test]
fn empty_batch_reports_no_duplicates() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let out = root.join("out.json");

    let output = cli(root)
        .arg("process")
        .arg("--output")
        .arg(&out)
        .write_stdin("[]")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let batch: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(batch["action"], "no_duplicates_found");
    assert!(out.exists());
}

#[test]
fn unreadable_input_is_a_batch_error() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    let output = cli(root)
        .arg("process")
        .arg("--no-report")
        .write_stdin("not json")
        .output()
        .expect("command run");
    assert_eq!(output.status.code(), Some(1));

    let batch: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(batch["status"], "error");
    assert!(batch["error"]
        .as_str()
        .unwrap()
        .contains("Invalid findings JSON"));
}

#[test]
fn unreadable_input_still_writes_an_error_report() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    let output = cli(root)
        .arg("process")
        .write_stdin("{ truncated")
        .output()
        .expect("command run");
    assert_eq!(output.status.code(), Some(1));

    let latest = root.join(".ci-registry/reports/latest-analysis.json");
    assert!(latest.exists());
    let report: Value = serde_json::from_slice(&fs::read(latest).unwrap()).unwrap();
    assert_eq!(report["status"], "error");
    assert_eq!(report["metadata"]["action"], "input_error");
    assert_eq!(report["summary"]["processing_results"]["errors"], 1);
    assert!(report["error"]
        .as_str()
        .unwrap()
        .contains("Invalid findings JSON"));
}

#[test]
fn one_malformed_record_fails_alone() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let mut input = findings();
    input
        .as_array_mut()
        .unwrap()
        .insert(1, json!({"finding_id": "garbled", "evidence": "see attachment"}));

    let output = cli(root)
        .arg("process")
        .arg("--no-report")
        .write_stdin(input.to_string())
        .output()
        .expect("command run");
    assert!(output.status.success());

    let batch: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(batch["findings_processed"], 4);
    assert_eq!(batch["rejected"], 1);
    let ids: Vec<&str> = batch["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["finding_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["fix-me", "garbled", "review-me", "tiny"]);
    assert_eq!(batch["results"][1]["action"], "error");
    assert_eq!(batch["summary"]["processing_results"]["errors"], 1);
}
