// tests/cli_tests.rs

//! Binary-level smoke tests for the outfitter CLI.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("outfitter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("recipes"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn recipes_command_reports_empty_catalog() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("outfitter")
        .unwrap()
        .args(["recipes", "--recipe-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No recipes"));
}

#[test]
fn recipes_command_lists_applicable_recipes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("redis.yml"),
        "name: redis-integration\ndisplayName: Redis\nprocessMatch:\n  - redis-server\n",
    )
    .unwrap();

    Command::cargo_bin("outfitter")
        .unwrap()
        .args(["recipes", "--recipe-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("redis-integration"))
        .stdout(predicate::str::contains("redis-server"));
}

#[test]
fn install_fails_cleanly_on_missing_recipe_dir() {
    Command::cargo_bin("outfitter")
        .unwrap()
        .args([
            "install",
            "--assume-yes",
            "--recipe-dir",
            "/nonexistent/recipes/dir",
        ])
        .env("OUTFITTER_LICENSE_KEY", "test-license")
        .assert()
        .failure();
}

#[test]
fn completions_generate_bash_script() {
    Command::cargo_bin("outfitter")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("outfitter"));
}
