//! Smoke tests to verify command wiring end to end

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../opendata-core/tests/fixtures")
        .join(name)
}

/// Command with an isolated config location that does not exist yet.
fn opendata(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("opendata").unwrap();
    cmd.env("OPENDATA_CONFIG", home.join("config.toml"))
        .env("OPENDATA_QUIET", "1")
        .env_remove("RUST_LOG");
    cmd
}

// === Help Tests ===

#[test]
fn test_export_help() {
    let home = TempDir::new().unwrap();
    opendata(home.path())
        .args(["export", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Artifact container"));
}

#[test]
fn test_render_help() {
    let home = TempDir::new().unwrap();
    opendata(home.path())
        .args(["render", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report template file"));
}

// === Export Tests ===

#[test]
fn test_export_zip_current() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    opendata(home.path())
        .arg("export")
        .arg("--source")
        .arg(fixture("partition.ndjson"))
        .args(["--at", "2024-03-10 12:00:00", "--out"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("opendata.zip"));

    let bytes = fs::read(out.path().join("opendata.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(archive.by_index(0).unwrap().name(), "LICENSE.txt");
    let mut data = String::new();
    archive
        .by_index(1)
        .unwrap()
        .read_to_string(&mut data)
        .unwrap();
    assert_eq!(data, fs::read_to_string(fixture("expected_current.csv")).unwrap());
}

#[test]
fn test_export_csv_hours() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    opendata(home.path())
        .arg("export")
        .arg("--source")
        .arg(fixture("partition.ndjson"))
        .args(["--format", "csv", "--hours", "24", "--at", "2024-03-10 12:00:00", "--out"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("opendata_hours-24.csv"));

    let csv = fs::read_to_string(out.path().join("opendata_hours-24.csv")).unwrap();
    assert_eq!(csv.lines().count(), 2);
}

#[test]
fn test_export_rejects_bad_month() {
    let home = TempDir::new().unwrap();
    opendata(home.path())
        .arg("export")
        .arg("--source")
        .arg(fixture("partition.ndjson"))
        .args(["--month", "2024-13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("month 13 out of range"));
}

#[test]
fn test_export_rejects_window_before_representable_time() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    opendata(home.path())
        .arg("export")
        .arg("--source")
        .arg(fixture("partition.ndjson"))
        .args(["--hours", "4294967295", "--out"])
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid partition"));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_export_missing_source_fails_without_output() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    opendata(home.path())
        .args(["export", "--source", "/no/such/records.ndjson", "--out"])
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

// === Render Tests ===

#[test]
fn test_render_report_to_stdout() {
    let home = TempDir::new().unwrap();
    let template = home.path().join("report.hbs");
    fs::write(
        &template,
        "{{title}}: {{count}}\n{{#each records}}{{toMbit download_kbit}} {{translateBool 't' 'de'}}\n{{/each}}",
    )
    .unwrap();

    opendata(home.path())
        .arg("render")
        .arg("--template")
        .arg(&template)
        .arg("--source")
        .arg(fixture("partition.ndjson"))
        .args(["--at", "2024-03-10 12:00:00", "--title", "March"])
        .assert()
        .success()
        .stdout(predicate::str::diff("March: 3\n152 Ja\n48 Ja\n8.4 Ja\n"));
}

#[test]
fn test_render_unknown_helper_fails() {
    let home = TempDir::new().unwrap();
    let template = home.path().join("bad.hbs");
    fs::write(&template, "{{frobnicate count}}").unwrap();

    opendata(home.path())
        .arg("render")
        .arg("--template")
        .arg(&template)
        .arg("--source")
        .arg(fixture("partition.ndjson"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown helper 'frobnicate'"));
}

// === Rules Test ===

#[test]
fn test_rules_prints_json() {
    let home = TempDir::new().unwrap();
    let rules = home.path().join("rules.json");
    fs::write(
        &rules,
        r#"[{"band": 3, "channelFrom": 1200, "channelTo": 1949, "rsrpLimit": -140}]"#,
    )
    .unwrap();

    opendata(home.path())
        .arg("rules")
        .arg("--source")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rsrpLimit\": -140"));
}

// === Config Tests ===

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();

    opendata(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    opendata(home.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(home.path().join("config.toml").exists());

    opendata(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    opendata(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("timezone = \"Europe/Prague\""));
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    opendata(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("opendata"));
}
