//! End-to-end tests for the progdb binary.
//!
//! Each test writes a small fact directory, runs the binary and checks the
//! JSON it prints along with the exit code.

use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const BASE: &str = r#"{
    "path": "src/com/acme/Base.java",
    "package": "com.acme",
    "elements": [
        {"category": "CLASS", "id": "com.acme.Base", "modifiers": 1},
        {"category": "METHOD", "id": "com.acme.Base.run()", "modifiers": 1},
        {"category": "FIELD", "id": "com.acme.Base.count", "modifiers": 2}
    ],
    "relations": [
        {"domain": {"category": "CLASS", "id": "com.acme.Base"}, "relation": "DECLARES_METHOD",
         "range": {"category": "METHOD", "id": "com.acme.Base.run()"}},
        {"domain": {"category": "CLASS", "id": "com.acme.Base"}, "relation": "DECLARES_FIELD",
         "range": {"category": "FIELD", "id": "com.acme.Base.count"}}
    ]
}"#;

const SUB: &str = r#"{
    "path": "src/com/acme/Sub.java",
    "package": "com.acme",
    "elements": [
        {"category": "CLASS", "id": "com.acme.Sub", "modifiers": 1},
        {"category": "METHOD", "id": "com.acme.Sub.run()", "modifiers": 1}
    ],
    "relations": [
        {"domain": {"category": "CLASS", "id": "com.acme.Sub"}, "relation": "EXTENDS_CLASS",
         "range": {"category": "CLASS", "id": "com.acme.Base"}},
        {"domain": {"category": "CLASS", "id": "com.acme.Sub"}, "relation": "IMPLEMENTS_INTERFACE",
         "range": {"category": "CLASS", "id": "java.lang.Runnable"}},
        {"domain": {"category": "CLASS", "id": "com.acme.Sub"}, "relation": "DECLARES_METHOD",
         "range": {"category": "METHOD", "id": "com.acme.Sub.run()"}}
    ]
}"#;

const LIBRARY: &str = r#"{
    "types": [
        {"id": "java.lang.Runnable", "modifiers": 1537, "interface": true,
         "methods": [{"id": "java.lang.Runnable.run()", "modifiers": 1025}]}
    ]
}"#;

/// A fact directory with `Base` and `Sub`, plus a library index beside it.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "facts/com/acme/Base.json", BASE);
    write(dir.path(), "facts/com/acme/Sub.json", SUB);
    write(dir.path(), "jdk.json", LIBRARY);
    dir
}

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Run progdb against `root/facts` and return (exit code, parsed stdout).
fn run_progdb(root: &Path, args: &[&str]) -> (i32, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_progdb"))
        .arg("--facts")
        .arg(root.join("facts"))
        .args(args)
        .output()
        .expect("failed to run progdb");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout}"));
    (output.status.code().unwrap_or(-1), json)
}

fn range_ids(json: &Value) -> Vec<String> {
    json["range"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_stats_reports_ingest_and_cha() {
    let dir = workspace();
    let (code, json) = run_progdb(dir.path(), &["stats"]);

    assert_eq!(code, 0);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["schema_version"], "1");
    assert_eq!(json["ingest"]["units_ingested"], 2);
    assert_eq!(json["packages"], serde_json::json!(["com.acme"]));
    assert_eq!(json["cha_status"], "complete");
    assert_eq!(json["snapshot_id"].as_str().unwrap().len(), 64);
}

#[test]
fn test_snapshot_id_is_stable_across_runs() {
    let dir = workspace();
    let (_, first) = run_progdb(dir.path(), &["stats"]);
    let (_, second) = run_progdb(dir.path(), &["stats"]);
    assert_eq!(first["snapshot_id"], second["snapshot_id"]);
}

#[test]
fn test_elements_filtered_by_category() {
    let dir = workspace();
    let (code, json) = run_progdb(dir.path(), &["elements", "--category", "METHOD"]);

    assert_eq!(code, 0);
    let ids: Vec<&str> = json["elements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["com.acme.Base.run()", "com.acme.Sub.run()"]);
    assert_eq!(json["count"], 2);
}

#[test]
fn test_range_in_project_drops_library_classes() {
    let dir = workspace();
    let (code, json) = run_progdb(
        dir.path(),
        &["range", "CLASS:com.acme.Sub", "IMPLEMENTS_INTERFACE"],
    );
    assert_eq!(code, 0);
    assert_eq!(range_ids(&json), vec!["java.lang.Runnable"]);
    assert_eq!(json["range"][0]["in_project"], false);

    let (code, json) = run_progdb(
        dir.path(),
        &["range", "CLASS:com.acme.Sub", "IMPLEMENTS_INTERFACE", "--in-project"],
    );
    assert_eq!(code, 0);
    assert_eq!(json["count"], 0);
}

#[test]
fn test_transpose_range() {
    let dir = workspace();
    let (code, json) = run_progdb(dir.path(), &["range", "CLASS:com.acme.Base", "T_EXTENDS_CLASS"]);
    assert_eq!(code, 0);
    assert_eq!(range_ids(&json), vec!["com.acme.Sub"]);
}

#[test]
fn test_overrides_reach_library_methods() {
    let dir = workspace();
    let library = dir.path().join("jdk.json");
    let (code, json) = run_progdb(
        dir.path(),
        &["--library", library.to_str().unwrap(), "overrides", "com.acme.Sub.run()"],
    );

    assert_eq!(code, 0);
    assert_eq!(json["relation"], "OVERRIDES");
    assert_eq!(
        range_ids(&json),
        vec!["com.acme.Base.run()", "java.lang.Runnable.run()"]
    );
}

#[test]
fn test_overrides_without_cha_are_computed_on_demand() {
    let dir = workspace();
    let (code, json) = run_progdb(dir.path(), &["--no-cha", "overrides", "com.acme.Sub.run()"]);
    assert_eq!(code, 0);
    assert_eq!(range_ids(&json), vec!["com.acme.Base.run()"]);
}

#[test]
fn test_override_range_unsupported_without_cha() {
    let dir = workspace();
    let (code, json) = run_progdb(
        dir.path(),
        &["--no-cha", "range", "METHOD:com.acme.Sub.run()", "OVERRIDES"],
    );
    assert_eq!(code, 4);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 4);
    assert_eq!(json["error"]["details"]["relation"], "OVERRIDES");
}

#[test]
fn test_invalid_element_key_is_rejected() {
    let dir = workspace();
    let (code, json) = run_progdb(dir.path(), &["range", "TYPE:com.acme.Sub", "CALLS"]);
    assert_eq!(code, 2);
    assert_eq!(json["status"], "error");
}

#[test]
fn test_modifiers_of_library_method_use_stored_flags() {
    let dir = workspace();
    let library = dir.path().join("jdk.json");
    let (code, json) = run_progdb(
        dir.path(),
        &["--library", library.to_str().unwrap(), "modifiers", "METHOD:java.lang.Runnable.run()"],
    );
    assert_eq!(code, 0);
    assert_eq!(json["is_abstract_method"], true);
}

#[test]
fn test_malformed_unit_aborts_population() {
    let dir = workspace();
    write(dir.path(), "facts/com/acme/Broken.json", "{ \"path\": ");
    let (code, json) = run_progdb(dir.path(), &["stats"]);

    assert_eq!(code, 6);
    assert!(json["error"]["details"]["unit"]
        .as_str()
        .unwrap()
        .ends_with("Broken.json"));
}

#[test]
fn test_config_file_can_skip_bad_units() {
    let dir = workspace();
    write(dir.path(), "facts/com/acme/Broken.json", "{ \"path\": ");
    write(dir.path(), "progdb.toml", "fail_fast = false\n");
    let config = dir.path().join("progdb.toml");

    let (code, json) = run_progdb(dir.path(), &["--config", config.to_str().unwrap(), "stats"]);
    assert_eq!(code, 0);
    assert_eq!(json["ingest"]["units_ingested"], 2);
    assert_eq!(json["ingest"]["units_skipped"], 1);
}
