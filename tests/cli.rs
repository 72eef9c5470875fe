use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::process::Command;
use tempfile::TempDir;

fn kvstore(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kvstore").unwrap();
    cmd.args(&["--driver", "sled", "--opt"])
        .arg(format!("path={}", temp_dir.path().display()));
    cmd
}

#[test]
fn cli_no_args() {
    Command::cargo_bin("kvstore").unwrap().assert().failure();
}

#[test]
fn cli_get_missing() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    kvstore(&temp_dir)
        .args(&["get", "name"])
        .assert()
        .success()
        .stdout(contains("Key not found"));
}

#[test]
fn cli_set_get_rm() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");

    kvstore(&temp_dir)
        .args(&["set", "name", "Fredrik"])
        .assert()
        .success();

    kvstore(&temp_dir)
        .args(&["get", "name"])
        .assert()
        .success()
        .stdout(contains("Fredrik"));

    kvstore(&temp_dir).args(&["count"]).assert().success().stdout(contains("1"));

    kvstore(&temp_dir).args(&["rm", "name"]).assert().success();
    kvstore(&temp_dir).args(&["rm", "name"]).assert().success();

    kvstore(&temp_dir)
        .args(&["get", "name"])
        .assert()
        .success()
        .stdout(contains("Key not found"));
}

#[test]
fn cli_set_json() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");

    kvstore(&temp_dir)
        .args(&["set", "profile", r#"{"city":"Stockholm"}"#, "--json"])
        .assert()
        .success();

    kvstore(&temp_dir)
        .args(&["get", "profile"])
        .assert()
        .success()
        .stdout(contains(r#""city":"Stockholm""#));

    kvstore(&temp_dir)
        .args(&["set", "broken", "{", "--json"])
        .assert()
        .failure();
}

#[test]
fn cli_keys_and_flush() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");

    kvstore(&temp_dir).args(&["set", "a", "1"]).assert().success();
    kvstore(&temp_dir).args(&["set", "b", "2"]).assert().success();

    kvstore(&temp_dir)
        .args(&["keys"])
        .assert()
        .success()
        .stdout(contains("a").and(contains("b")));

    kvstore(&temp_dir).args(&["flush"]).assert().success();
    kvstore(&temp_dir).args(&["count"]).assert().success().stdout(contains("0"));
}

#[test]
fn cli_unknown_driver() {
    Command::cargo_bin("kvstore")
        .unwrap()
        .args(&["--driver", "nope", "count"])
        .assert()
        .failure()
        .stderr(contains("Driver not found: nope"));
}

#[test]
fn cli_invalid_option() {
    Command::cargo_bin("kvstore")
        .unwrap()
        .args(&["--opt", "novalue", "count"])
        .assert()
        .failure();
}
