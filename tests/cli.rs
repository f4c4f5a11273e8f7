mod common;

use std::fs;

use assert_cmd::Command;
use common::{Member, TestWorkspace, csv_file, read_csv};
use predicates::str::contains;
use serde_json::Value;

fn binary() -> Command {
    Command::cargo_bin("csv-consolidate").expect("binary exists")
}

#[test]
fn consolidate_prints_job_result_json() {
    let ws = TestWorkspace::new();
    let archive = ws.write_archive(
        "upload.zip",
        &[
            csv_file(
                "a.csv",
                "Id,Current Station,Carrier,Receiver Type\n1,DEL,XX,Hub\n",
            ),
            csv_file("b.csv", "Receiver Type,Id\nAgent,2\n"),
        ],
    );
    let output = ws.join("out/merged.csv");

    let assert = binary()
        .args([
            "consolidate",
            "-i",
            archive.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--drop-column",
            "Carrier",
            "--preview-rows",
            "1",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8 stdout");
    let json: Value = serde_json::from_str(&stdout).expect("job result json");
    assert_eq!(json["preview"].as_array().expect("preview").len(), 1);
    assert_eq!(json["preview"][0]["Current Station"], "DEL");
    assert!(json["preview"][0].get("Carrier").is_none());
    assert_eq!(json["distinct"]["receiverType"], serde_json::json!(["Agent", "Hub"]));
    assert_eq!(json["rowsWritten"], 2);

    let (headers, rows) = read_csv(&output);
    assert_eq!(headers, ["Id", "Current Station", "Receiver Type"]);
    assert_eq!(rows[1], ["2", "", "Agent"]);
}

#[test]
fn consolidate_reads_yaml_config_and_writes_result_file() {
    let ws = TestWorkspace::new();
    let archive = ws.write_archive(
        "upload.zip",
        &[csv_file("a.csv", "A;Status;B\n1;x;2\n")],
    );
    let config = ws.write(
        "settings.yml",
        "drop_columns: [Status]\ndelimiter: ';'\ndistinct_cap: 5\n",
    );
    let output = ws.join("merged.csv");
    let result = ws.join("result.json");

    binary()
        .args([
            "consolidate",
            "-i",
            archive.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--result",
            result.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).expect("output"), "A;B\n1;2\n");
    let json: Value =
        serde_json::from_str(&fs::read_to_string(&result).expect("result file")).expect("json");
    assert_eq!(json["preview"][0]["B"], "2");
}

#[test]
fn consolidate_reports_empty_archive() {
    let ws = TestWorkspace::new();
    let archive = ws.write_archive("upload.zip", &[Member::File("readme.md", b"# nothing")]);
    let output = ws.join("merged.csv");

    binary()
        .args([
            "consolidate",
            "-i",
            archive.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("does not contain any .csv entries"));
    assert!(!output.exists());
}

#[test]
fn consolidate_removes_archive_on_request() {
    let ws = TestWorkspace::new();
    let archive = ws.write_archive("upload.zip", &[csv_file("a.csv", "A\n1\n")]);
    binary()
        .args([
            "consolidate",
            "-i",
            archive.to_str().unwrap(),
            "-o",
            ws.join("merged.csv").to_str().unwrap(),
            "--remove-archive",
        ])
        .assert()
        .success();
    assert!(!archive.exists());
}

#[test]
fn preview_returns_limited_rows_as_json() {
    let ws = TestWorkspace::new();
    ws.write("merged.csv", "Id,Station\n1,DEL\n2,BOM\n3,MAA\n");

    let assert = binary()
        .args([
            "preview",
            "--dir",
            ws.path().to_str().unwrap(),
            "--file",
            "merged.csv",
            "--limit",
            "2",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8 stdout");
    let json: Value = serde_json::from_str(&stdout).expect("preview json");
    assert_eq!(
        json,
        serde_json::json!([
            {"Id": "1", "Station": "DEL"},
            {"Id": "2", "Station": "BOM"},
        ])
    );
}

#[test]
fn preview_renders_table() {
    let ws = TestWorkspace::new();
    ws.write("merged.csv", "Id,Station\n1,DEL\n");
    binary()
        .args([
            "preview",
            "-d",
            ws.path().to_str().unwrap(),
            "-f",
            "merged.csv",
            "--table",
        ])
        .assert()
        .success()
        .stdout(contains("Id   Station"))
        .stdout(contains("1    DEL"));
}

#[test]
fn preview_rejects_traversal_and_missing_files() {
    let ws = TestWorkspace::new();
    fs::create_dir(ws.join("outputs")).expect("mkdir");
    ws.write("secret.csv", "A\n1\n");
    let dir = ws.join("outputs");

    binary()
        .args(["preview", "-d", dir.to_str().unwrap(), "-f", "../secret.csv"])
        .assert()
        .failure()
        .stderr(contains("not a valid consolidated file name"));

    binary()
        .args(["preview", "-d", dir.to_str().unwrap(), "-f", "absent.csv"])
        .assert()
        .failure()
        .stderr(contains("not found"));
}

#[test]
fn config_prints_default_yaml() {
    binary()
        .arg("config")
        .assert()
        .success()
        .stdout(contains("preview_rows: 50"))
        .stdout(contains("distinct_cap: 1000"))
        .stdout(contains("current_station:"));
}
