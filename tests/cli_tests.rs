//! # CLI Integration Tests / CLI 集成测试
//!
//! Runs the `env-matrix` binary for the commands that need no interpreter:
//! help, `list` and `init`.
//!
//! 针对不需要解释器的命令运行 `env-matrix` 二进制：帮助、`list` 和 `init`。

mod common;

use assert_cmd::prelude::*;
use common::write_config;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const MATRIX: &str = r#"
envlist = ["py{38,39,310,311}-django{111,2x,3x,4x}-jwt{1x,2x}"]

[testenv]
deps = ["pytest", "django2x: Django>=2.0,<3.0"]
commands = ["pytest {posargs}"]

[env.lint]
deps = ["flake8"]
commands = ["flake8 src"]

[gh-actions.python]
"3.9" = "py39"
"#;

/// `list` prints one line per expanded environment.
/// `list` 为每个展开的环境打印一行。
#[test]
fn test_list_prints_the_expanded_matrix() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), MATRIX);

    let output = Command::cargo_bin("env-matrix")
        .unwrap()
        .args(["--lang", "en", "list", "-c"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let envs: Vec<&str> = stdout.lines().filter(|l| l.starts_with("py")).collect();
    assert_eq!(envs.len(), 32);
    assert_eq!(envs[0], "py38-django111-jwt1x");
    assert!(stdout.contains("lint"));
}

/// `list --ci-python` narrows the matrix through `[gh-actions]`.
#[test]
fn test_list_with_ci_mapping() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), MATRIX);

    Command::cargo_bin("env-matrix")
        .unwrap()
        .args(["--lang", "en", "list", "--ci-python", "3.9", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("py39-django2x-jwt1x"))
        .stdout(predicate::str::contains("py38-django2x-jwt1x").not());
}

/// `list -v` shows the resolved interpreter and factor-selected deps.
#[test]
fn test_list_verbose_shows_resolved_settings() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), MATRIX);

    Command::cargo_bin("env-matrix")
        .unwrap()
        .args(["--lang", "en", "list", "-v", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("python3.10"))
        .stdout(predicate::str::contains("Django>=2.0,<3.0"))
        .stdout(predicate::str::contains("pytest {posargs}"));
}

/// `init --non-interactive` writes a configuration that `list` accepts.
/// `init --non-interactive` 写入一个 `list` 可以接受的配置。
#[test]
fn test_init_non_interactive_creates_valid_config() {
    let dir = tempdir().unwrap();

    Command::cargo_bin("env-matrix")
        .unwrap()
        .current_dir(dir.path())
        .args(["--lang", "en", "init", "--non-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created EnvMatrix.toml"));

    let content = fs::read_to_string(dir.path().join("EnvMatrix.toml")).unwrap();
    assert!(content.contains("envlist"));
    assert!(content.contains("gh-actions"));

    Command::cargo_bin("env-matrix")
        .unwrap()
        .current_dir(dir.path())
        .args(["--lang", "en", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("py311"));
}

#[test]
fn test_help_is_localized() {
    Command::cargo_bin("env-matrix")
        .unwrap()
        .args(["--lang", "en", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matrix of interpreter and dependency versions"));

    Command::cargo_bin("env-matrix")
        .unwrap()
        .args(["--lang", "zh-CN", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("测试套件"));
}

#[test]
fn test_missing_subcommand_prints_help() {
    Command::cargo_bin("env-matrix")
        .unwrap()
        .args(["--lang", "en"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
