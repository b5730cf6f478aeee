//! # Run Integration Tests / 运行集成测试
//!
//! End-to-end runs against a stand-in interpreter script, so environment
//! provisioning, reuse, packaging and command execution are exercised without
//! a real Python installation.
//!
//! 使用替身解释器脚本进行端到端运行，无需真实的 Python 安装即可测试环境配置、
//! 复用、打包和命令执行。

#![cfg(unix)]

mod common;

use assert_cmd::prelude::*;
use common::{fake_pip_log, install_fake_python, setup_test_project, write_config};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn run_cmd(project: &Path, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("env-matrix").unwrap();
    cmd.args(["--lang", "en", "run", "--config"])
        .arg(config)
        .arg("--project-dir")
        .arg(project)
        .env_remove("GITHUB_ACTIONS");
    cmd
}

fn config_with(fake_python: &Path, body: &str) -> String {
    format!(
        "envlist = [\"py311-django{{3x,4x}}\"]\n\n[testenv]\nbasepython = \"{}\"\n{}",
        fake_python.display(),
        body
    )
}

#[test]
fn test_passing_matrix_and_environment_reuse() {
    let project = setup_test_project();
    let tools = tempdir().unwrap();
    let python = install_fake_python(tools.path());
    let config = write_config(
        project.path(),
        &config_with(
            &python,
            "skip_install = true\ndeps = [\"pytest\", \"django4x: Django>=4.0,<5.0\"]\ncommands = [\"echo running {envname}\"]\n",
        ),
    );

    run_cmd(project.path(), &config)
        .assert()
        .success()
        .stdout(predicate::str::contains("running py311-django3x"))
        .stdout(predicate::str::contains("running py311-django4x"))
        .stdout(predicate::str::contains("Passed: 2"));

    let envdir = project.path().join(".envmatrix/py311-django4x");
    assert!(envdir.join(".env-matrix.json").is_file());
    let pip_log = fs::read_to_string(envdir.join("pip.log")).unwrap();
    assert!(pip_log.contains("Django>=4.0,<5.0"));
    let dj3_log = fs::read_to_string(project.path().join(".envmatrix/py311-django3x/pip.log")).unwrap();
    assert!(!dj3_log.contains("Django"));

    // Unchanged inputs: the second run reuses both environments.
    run_cmd(project.path(), &config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Reusing existing environment").count(2))
        .stdout(predicate::str::contains("Passed: 2"));

    // --recreate rebuilds them.
    run_cmd(project.path(), &config)
        .arg("--recreate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reusing existing environment").not());
}

#[test]
fn test_failing_environment_does_not_stop_the_others() {
    let project = setup_test_project();
    let tools = tempdir().unwrap();
    let python = install_fake_python(tools.path());
    let config = write_config(
        project.path(),
        &config_with(
            &python,
            "skip_install = true\ncommands = [\"django3x: false\", \"echo done {envname}\"]\n",
        ),
    );

    run_cmd(project.path(), &config)
        .args(["-j", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("done py311-django4x"))
        .stdout(predicate::str::contains("Passed: 1"))
        .stdout(predicate::str::contains("Failed: 1"))
        .stdout(predicate::str::contains("test commands failed"));
}

#[test]
fn test_ignored_exit_status_and_posargs() {
    let project = setup_test_project();
    let tools = tempdir().unwrap();
    let python = install_fake_python(tools.path());
    let config = write_config(
        project.path(),
        &config_with(
            &python,
            "skip_install = true\ncommands = [\"- false\", \"echo args: {posargs}\"]\n",
        ),
    );

    run_cmd(project.path(), &config)
        .args(["-e", "py311-django3x", "--", "-k", "smoke test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("args: -k smoke test"))
        .stdout(predicate::str::contains("Passed: 1"));
}

#[test]
fn test_passenv_and_setenv_reach_commands() {
    let project = setup_test_project();
    let tools = tempdir().unwrap();
    let python = install_fake_python(tools.path());
    let config = write_config(
        project.path(),
        &config_with(
            &python,
            "skip_install = true\npassenv = [\"MATRIX_TOKEN_*\"]\nsetenv = { GREETING = \"hello-from-setenv\" }\ncommands = [\"printenv MATRIX_TOKEN_A\", \"printenv GREETING\", \"- printenv HIDDEN_SECRET\"]\n",
        ),
    );

    run_cmd(project.path(), &config)
        .args(["-e", "py311-django4x"])
        .env("MATRIX_TOKEN_A", "token-value")
        .env("HIDDEN_SECRET", "must-not-leak")
        .assert()
        .success()
        .stdout(predicate::str::contains("token-value"))
        .stdout(predicate::str::contains("hello-from-setenv"))
        .stdout(predicate::str::contains("must-not-leak").not());
}

#[test]
fn test_isolated_build_packages_once() {
    let project = setup_test_project();
    let tools = tempdir().unwrap();
    let python = install_fake_python(tools.path());
    let mut content = config_with(&python, "commands = [\"echo ok\"]\n");
    content = format!(
        "isolated_build = true\npackage_python = \"{}\"\n{}",
        python.display(),
        content
    );
    let config = write_config(project.path(), &content);

    run_cmd(project.path(), &config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Passed: 2"));

    let build_log = fake_pip_log(&python);
    assert_eq!(build_log.matches("pip wheel").count(), 1, "{build_log}");

    let env_log = fs::read_to_string(project.path().join(".envmatrix/py311-django3x/pip.log")).unwrap();
    assert!(env_log.contains("sample-0.1.0-py3-none-any.whl"));
}

#[test]
fn test_timeout_fails_the_environment() {
    let project = setup_test_project();
    let tools = tempdir().unwrap();
    let python = install_fake_python(tools.path());
    let config = write_config(
        project.path(),
        &config_with(&python, "skip_install = true\ntimeout_secs = 1\ncommands = [\"sleep 30\"]\n"),
    );

    run_cmd(project.path(), &config)
        .args(["-e", "py311-django3x"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Timeout"));
}

#[test]
fn test_html_report_is_written() {
    let project = setup_test_project();
    let tools = tempdir().unwrap();
    let python = install_fake_python(tools.path());
    let config = write_config(
        project.path(),
        &config_with(&python, "skip_install = true\ncommands = [\"django3x: false\", \"echo ok\"]\n"),
    );
    let html = project.path().join("report.html");

    run_cmd(project.path(), &config).arg("--html").arg(&html).assert().failure();

    let page = fs::read_to_string(&html).unwrap();
    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("py311-django3x"));
    assert!(page.contains("py311-django4x"));
    assert!(page.contains("status-failed"));
}
