use std::process::{Command, Output};

use anyhow::Result;

#[path = "../common/mod.rs"]
mod common;
use common::{temp_file, test_metadata, DATABASE, SCHEMA};

const POINT_QUERY: &str = r#"{
    "projection": [{"expr": {"expr": {"identifier": "a"}}}],
    "from": {"name": "t"},
    "selection": {"binary_op": {"left": {"identifier": "a"}, "op": "eq", "right": {"literal": {"integer": 1}}}}
}"#;

const RULES: &str = r#"{
    "data_sources": [{
        "name": "readwrite_ds",
        "static_strategy": {"write_data_source_name": "primary_ds", "read_data_source_names": ["replica_ds_0"]},
        "load_balancer_name": "rr"
    }],
    "load_balancers": {"rr": {"type": "ROUND_ROBIN", "props": {"weight": "1"}}}
}"#;

fn fedplan(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_fedplan")).args(args).output()?)
}

#[test]
fn test_explain_command() -> Result<()> {
    let metadata = temp_file(&serde_json::to_string(&test_metadata())?)?;
    let statement = temp_file(POINT_QUERY)?;
    let output = fedplan(&[
        "explain",
        "-m", metadata.path().to_str().unwrap(),
        "-s", statement.path().to_str().unwrap(),
        "-d", DATABASE,
        "--schema", SCHEMA,
    ])?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout)?;
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("ExecTableScan(table=[t], source=[ds_0], columns=[a], filters=[=($0, 1)])"));
    assert!(lines.next().is_some_and(|line| line.starts_with("cost: {")));
    Ok(())
}

#[test]
fn test_explain_unknown_schema_fails() -> Result<()> {
    let metadata = temp_file(&serde_json::to_string(&test_metadata())?)?;
    let statement = temp_file(POINT_QUERY)?;
    let output = fedplan(&[
        "explain",
        "-m", metadata.path().to_str().unwrap(),
        "-s", statement.path().to_str().unwrap(),
        "-d", DATABASE,
        "--schema", "missing",
    ])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown optimizer context"));
    Ok(())
}

#[test]
fn test_explain_rejects_bad_config() -> Result<()> {
    let metadata = temp_file(&serde_json::to_string(&test_metadata())?)?;
    let statement = temp_file(POINT_QUERY)?;
    let config = temp_file(r#"{"enabled_rules": ["NoSuchRule"]}"#)?;
    let output = fedplan(&[
        "explain",
        "-m", metadata.path().to_str().unwrap(),
        "-s", statement.path().to_str().unwrap(),
        "-d", DATABASE,
        "--schema", SCHEMA,
        "-c", config.path().to_str().unwrap(),
    ])?;

    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_show_rules_command() -> Result<()> {
    let rules = temp_file(RULES)?;
    let output = fedplan(&["show-rules", "-r", rules.path().to_str().unwrap()])?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("| name "));
    assert!(lines[1].starts_with("+-"));
    assert!(lines[2].contains("| readwrite_ds |"));
    assert!(lines[2].contains("| replica_ds_0 "));
    assert!(lines[2].contains("| weight=1 "));
    assert_eq!(lines[3], "(1 rows)");
    Ok(())
}
