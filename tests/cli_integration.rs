//! Integration tests for the modsync binary.
//!
//! These tests exercise the offline commands against temporary module trees.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const V1_MANIFEST: &str = r#"modfileVersion: v1
id: acme/sensor
name: Sensor
version: 1.4.0
license: Apache-2.0
configs:
  interval:
    dataType: int
    type: number
    value: 30
    typeOpt:
      min: 1
  region:
    dataType: string
    type: text
    value: eu
    options: [eu, us]
"#;

/// Get a command for running modsync with an isolated config.
fn modsync(temp: &TempDir) -> Command {
    let config = temp.child("config.toml");
    if !config.path().exists() {
        config
            .write_str(&format!(
                "[store]\npath = \"{}\"\n",
                temp.child("store.json").path().display()
            ))
            .unwrap();
    }
    let mut cmd = Command::cargo_bin("modsync").unwrap();
    cmd.arg("--config").arg(config.path());
    cmd
}

fn module_tree(temp: &TempDir, manifest: &str) -> assert_fs::fixture::ChildPath {
    let dir = temp.child("module");
    dir.create_dir_all().unwrap();
    dir.child("Modfile.yml").write_str(manifest).unwrap();
    dir
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("modsync")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("modsync"));
}

#[test]
fn validate_accepts_good_manifest() {
    let temp = TempDir::new().unwrap();
    let dir = module_tree(&temp, V1_MANIFEST);

    modsync(&temp)
        .arg("validate")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/sensor 1.4.0 is valid"));
}

#[test]
fn validate_reports_bad_default() {
    let temp = TempDir::new().unwrap();
    let dir = module_tree(&temp, &V1_MANIFEST.replace("value: eu", "value: ap"));

    modsync(&temp)
        .arg("validate")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("region"));
}

#[test]
fn validate_without_manifest_fails() {
    let temp = TempDir::new().unwrap();
    temp.child("empty").create_dir_all().unwrap();

    modsync(&temp)
        .arg("validate")
        .arg(temp.child("empty").path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest"));
}

#[test]
fn generate_converts_between_schemas() {
    let temp = TempDir::new().unwrap();
    let dir = module_tree(&temp, V1_MANIFEST);

    modsync(&temp)
        .args(["generate", "--schema", "v2"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("modfileVersion: v2")
                .and(predicate::str::contains("key: interval"))
                .and(predicate::str::contains("id: acme/sensor")),
        );
}

#[test]
fn generate_output_file_validates() {
    let temp = TempDir::new().unwrap();
    let dir = module_tree(&temp, V1_MANIFEST);
    let out = temp.child("converted");
    out.create_dir_all().unwrap();

    modsync(&temp)
        .args(["generate", "--schema", "v2", "--output"])
        .arg(out.child("Modfile.yaml").path())
        .arg(dir.path())
        .assert()
        .success();

    out.child("Modfile.yaml")
        .assert(predicate::str::contains("modfileVersion: v2"));
    modsync(&temp)
        .arg("validate")
        .arg(out.path())
        .assert()
        .success();
}

#[test]
fn generate_unknown_schema_fails() {
    let temp = TempDir::new().unwrap();
    let dir = module_tree(&temp, V1_MANIFEST);

    modsync(&temp)
        .args(["generate", "--schema", "v9"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("v9"));
}

#[test]
fn repos_on_empty_store() {
    let temp = TempDir::new().unwrap();

    modsync(&temp)
        .arg("repos")
        .assert()
        .success()
        .stdout(predicate::str::contains("No repositories"));
}

#[test]
fn invalid_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    temp.child("config.toml")
        .write_str("[sync]\nmax_concurrency = 0\n")
        .unwrap();

    modsync(&temp)
        .arg("modules")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_concurrency"));
}

#[test]
fn sync_repeats_same_job_in_new_process() {
    let temp = TempDir::new().unwrap();

    for _ in 0..2 {
        modsync(&temp)
            .args(["sync", "--deployment", "edge-42", "--job", "7f1c"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Synced: 0 updated, 0 unchanged."))
            .stdout(predicate::str::contains("already ran").not());
    }
}
