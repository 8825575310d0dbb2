//! CLI tests for the commands that need no device: vendors, explain, validate.

use std::io::Write;
use std::process::{Command, Stdio};

use assert_cmd::cargo;

fn bgfp_cmd() -> Command {
    Command::new(cargo::cargo_bin!("bgfp"))
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid json ({e}): {stdout}"))
}

fn codes(json: &serde_json::Value) -> Vec<String> {
    json["messages"]
        .as_array()
        .expect("messages array")
        .iter()
        .filter_map(|m| m["code"].as_str().map(str::to_string))
        .collect()
}

fn write_document(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

const GOOD_RECEIPT: &str = r#"{
    "uniqueSaleNumber": "DT279013-0001-0000001",
    "items": [{ "text": "Хляб", "taxGroup": "taxGroup2", "quantity": "2", "unitPrice": "1.20" }],
    "payments": [{ "paymentType": "cash", "amount": "2.40" }]
}"#;

#[test]
fn vendors_json_lists_every_driver() {
    let output = bgfp_cmd()
        .args(["vendors", "--output", "json"])
        .output()
        .expect("run vendors command");

    assert!(output.status.success());
    let json = json_stdout(&output);
    let rows = json.as_array().expect("array of vendors");
    assert_eq!(rows.len(), 7);
    let datecs = rows
        .iter()
        .find(|r| r["id"] == "bg.dt.c.isl")
        .expect("datecs c listed");
    assert_eq!(datecs["protocol"], "ISL");
    assert_eq!(datecs["serialPrefix"], "DT");
    assert!(rows.iter().any(|r| r["id"] == "bg.zk.zfp" && r["protocol"] == "ZFP"));
}

#[test]
fn explain_known_code_json_returns_explanation() {
    let output = bgfp_cmd()
        .args(["explain", "E403", "--output", "json"])
        .output()
        .expect("run explain command");

    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["code"], "E403");
    assert!(json["explanation"].is_string());
}

#[test]
fn explain_unknown_code_json_returns_null_explanation() {
    let output = bgfp_cmd()
        .args(["explain", "E999", "--output", "json"])
        .output()
        .expect("run explain command");

    assert!(output.status.success());
    assert!(json_stdout(&output)["explanation"].is_null());
}

#[test]
fn explain_pretty_writes_to_stdout() {
    let output = bgfp_cmd()
        .args(["explain", "E301", "--output", "pretty"])
        .output()
        .expect("run explain command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("E301"), "unexpected output: {stdout}");
}

#[test]
fn validate_good_receipt_succeeds() {
    let file = write_document(GOOD_RECEIPT);
    let output = bgfp_cmd()
        .args(["validate", "receipt", "--output", "json"])
        .arg(file.path())
        .output()
        .expect("run validate command");

    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["ok"], true);
    assert!(codes(&json).is_empty());
}

#[test]
fn validate_mismatched_total_fails_with_e403() {
    let file = write_document(
        r#"{
            "uniqueSaleNumber": "DT279013-0001-0000001",
            "items": [{ "text": "Хляб", "taxGroup": "taxGroup2", "quantity": "2", "unitPrice": "1.20" }],
            "payments": [{ "paymentType": "cash", "amount": "2.00" }]
        }"#,
    );
    let output = bgfp_cmd()
        .args(["validate", "receipt", "--output", "json"])
        .arg(file.path())
        .output()
        .expect("run validate command");

    assert_eq!(output.status.code(), Some(1));
    let json = json_stdout(&output);
    assert_eq!(json["ok"], false);
    assert_eq!(codes(&json), vec!["E403"]);
}

#[test]
fn validate_overflowing_receipt_reports_e405() {
    let file = write_document(
        r#"{
            "uniqueSaleNumber": "DT279013-0001-0000001",
            "items": [{ "text": "Хляб", "taxGroup": "taxGroup2", "quantity": "2", "unitPrice": "79228162514264337593543950335" }],
            "payments": [{ "paymentType": "cash", "amount": "1" }]
        }"#,
    );
    let output = bgfp_cmd()
        .args(["validate", "receipt", "--output", "json"])
        .arg(file.path())
        .output()
        .expect("run validate command");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(codes(&json_stdout(&output)), vec!["E405"]);
}

#[test]
fn validate_reads_stdin() {
    let mut child = bgfp_cmd()
        .args(["validate", "transfer", "-", "--output", "json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn validate command");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(br#"{ "amount": "0" }"#)
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for validate");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(codes(&json_stdout(&output)), vec!["E410"]);
}

#[test]
fn validate_rejects_malformed_json() {
    let file = write_document("{ not json");
    let output = bgfp_cmd()
        .args(["validate", "receipt", "--output", "json"])
        .arg(file.path())
        .output()
        .expect("run validate command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid document"), "stderr: {stderr}");
}

#[test]
fn device_command_without_transport_reports_invalid_config() {
    let output = bgfp_cmd()
        .args(["status", "--output", "json"])
        .output()
        .expect("run status command");

    assert_eq!(output.status.code(), Some(1));
    let json = json_stdout(&output);
    assert_eq!(json["ok"], false);
    assert_eq!(codes(&json), vec!["E502"]);
}
