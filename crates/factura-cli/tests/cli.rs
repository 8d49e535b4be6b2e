//! Command-line integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("invoice_blocks.json")
}

fn factura() -> Command {
    Command::cargo_bin("factura").unwrap()
}

#[test]
fn test_help_lists_commands() {
    factura()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("price"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_extract_json() {
    let output = factura()
        .arg("extract")
        .arg(fixture())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["invoice_number"], "PMB4471");
    assert_eq!(json["supplier"]["nit"], "900123456-8");
    assert_eq!(json["metadata"]["line_item_source"], "table");
    assert_eq!(json["line_items"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["line_items"][0]["unit_measure"], "PCS");
    assert_eq!(json["line_items"][0]["unit_multiplier"], 12);
}

#[test]
fn test_extract_csv_and_text() {
    factura()
        .args(["extract", "--format", "csv"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("invoice_number,item_number"))
        .stdout(predicate::str::contains("PMB4471,1,"));

    factura()
        .args(["extract", "--format", "text"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Invoice: PMB4471"))
        .stdout(predicate::str::contains("Total: $ 660.450 COP"));
}

#[test]
fn test_verbose_flag_enables_info_logs() {
    factura()
        .env_remove("RUST_LOG")
        .arg("extract")
        .arg(fixture())
        .assert()
        .success()
        .stderr(predicate::str::contains("Extracting invoice from").not());

    factura()
        .env_remove("RUST_LOG")
        .args(["extract", "-v"])
        .arg(fixture())
        .assert()
        .success()
        .stderr(predicate::str::contains("Extracting invoice from"));
}

#[test]
fn test_extract_validate_reports_clean_invoice() {
    factura()
        .args(["extract", "--validate"])
        .arg(fixture())
        .assert()
        .success()
        .stderr(predicate::str::contains("No extraction warnings"));
}

#[test]
fn test_extract_validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("header_only.json");
    fs::write(
        &input,
        r#"[
            {"Id": "p", "BlockType": "PAGE", "Relationships": [{"Type": "CHILD", "Ids": ["l"]}]},
            {"Id": "l", "BlockType": "LINE", "Text": "FECHA: 03/04/2024"}
        ]"#,
    )
    .unwrap();

    factura()
        .args(["extract", "--validate"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("[no_line_items]"))
        .stderr(predicate::str::contains("[ambiguous_date]"))
        .stderr(predicate::str::contains("invoice_number"));
}

#[test]
fn test_extract_missing_file_fails() {
    factura()
        .args(["extract", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_extract_malformed_graph_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("no_page.json");
    fs::write(&input, r#"[{"Id": "l", "BlockType": "LINE", "Text": "hola"}]"#).unwrap();

    factura()
        .arg("extract")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("PAGE"));
}

#[test]
fn test_extract_then_price() {
    let dir = TempDir::new().unwrap();
    let extraction = dir.path().join("extraction.json");

    factura()
        .arg("extract")
        .arg(fixture())
        .arg("--output")
        .arg(&extraction)
        .assert()
        .success();

    factura()
        .arg("price")
        .arg(&extraction)
        .args(["--as-of", "2024-03-20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 CHANCLA DAMA 36-40"))
        .stdout(predicate::str::contains("Price: $ 16.000"));

    let history = dir.path().join("history.json");
    fs::write(
        &history,
        r#"[
            {"product_code": "CHANCLA", "cost_price": "9800", "sale_price": "16000", "date": "2024-03-01"},
            {"product_code": "CHANCLA", "cost_price": "9900", "sale_price": "17000", "date": "2024-03-05"}
        ]"#,
    )
    .unwrap();

    let output = factura()
        .arg("price")
        .arg(&extraction)
        .args(["--as-of", "2024-03-20", "--format", "json", "--history"])
        .arg(&history)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json[0]["recommendation"]["best"]["method"], "historical");
    assert_eq!(json[0]["recommendation"]["best"]["price"], "17000");
}

#[test]
fn test_batch_writes_outputs_and_summary() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    for name in ["a.json", "b.json"] {
        fs::copy(fixture(), input_dir.path().join(name)).unwrap();
    }
    fs::write(input_dir.path().join("broken.json"), "{}").unwrap();

    let pattern = format!("{}/*.json", input_dir.path().display());

    factura()
        .args(["batch", &pattern, "--summary", "--continue-on-error", "--format", "csv"])
        .arg("--output-dir")
        .arg(output_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 3 files"))
        .stdout(predicate::str::contains("Failed files:"));

    assert!(output_dir.path().join("a.csv").exists());
    assert!(output_dir.path().join("b.csv").exists());
    assert!(!output_dir.path().join("broken.csv").exists());

    let summary = fs::read_to_string(output_dir.path().join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("a.json,success,PMB4471"));
    assert!(lines[2].starts_with("b.json,success,PMB4471"));
    assert!(lines[3].starts_with("broken.json,error"));
}

#[test]
fn test_batch_stops_on_error_by_default() {
    let input_dir = TempDir::new().unwrap();
    fs::write(input_dir.path().join("broken.json"), "{}").unwrap();
    let pattern = format!("{}/*.json", input_dir.path().display());

    factura()
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("factura").join("config.json");
    let config_arg = config.to_str().unwrap();

    factura()
        .args(["--config", config_arg, "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));

    factura()
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    factura()
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    factura()
        .args(["--config", config_arg, "config", "set", "pricing.min_markup", "25"])
        .assert()
        .success();

    factura()
        .args(["--config", config_arg, "config", "get", "pricing.min_markup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25"));

    factura()
        .args(["--config", config_arg, "config", "get", "pricing.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_set_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    let config_arg = config.to_str().unwrap();

    factura()
        .args(["--config", config_arg, "config", "set", "pricing.min_markup", "500"])
        .assert()
        .failure();
    assert!(!config.exists());
}
