//! # Command Module Unit Tests / Command 模块单元测试
//!
//! Tests for placeholder substitution, command-line parsing and output capture.
//!
//! 测试占位符替换、命令行解析和输出捕获。

use env_matrix::infra::command::{parse_command_line, spawn_and_capture, substitute};
use std::collections::BTreeMap;

fn vars() -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("envname", "py311-django4x".to_string()),
        ("envdir", "/work/.envmatrix/py311-django4x".to_string()),
        ("envpython", "/work/.envmatrix/py311-django4x/bin/python".to_string()),
    ])
}

fn no_env() -> BTreeMap<String, String> {
    BTreeMap::new()
}

#[test]
fn test_substitute_known_placeholders() {
    assert_eq!(
        substitute("{envpython} -m pytest --junitxml={envdir}/junit.xml", &vars()),
        "/work/.envmatrix/py311-django4x/bin/python -m pytest --junitxml=/work/.envmatrix/py311-django4x/junit.xml"
    );
}

#[test]
fn test_substitute_keeps_unknown_braces() {
    assert_eq!(substitute("echo {unknown} {", &vars()), "echo {unknown} {");
    assert_eq!(substitute("python -c 'd = {}'", &vars()), "python -c 'd = {}'");
}

#[test]
fn test_parse_simple_command() {
    let cmd = parse_command_line("pytest -q tests", &vars(), &[], &no_env()).unwrap();
    assert!(!cmd.ignore_exit);
    assert_eq!(cmd.program, "pytest");
    assert_eq!(cmd.args, vec!["-q", "tests"]);
}

#[test]
fn test_posargs_are_spliced_without_resplitting() {
    let posargs = vec!["-k".to_string(), "test a and not b".to_string()];
    let cmd = parse_command_line("pytest {posargs} tests", &vars(), &posargs, &no_env()).unwrap();
    assert_eq!(cmd.args, vec!["-k", "test a and not b", "tests"]);

    let empty = parse_command_line("pytest {posargs}", &vars(), &[], &no_env()).unwrap();
    assert!(empty.args.is_empty());
}

#[test]
fn test_quoting_is_respected() {
    let cmd = parse_command_line(
        r#"python -c "import sys; print(sys.version)""#,
        &vars(),
        &[],
        &no_env(),
    )
    .unwrap();
    assert_eq!(cmd.program, "python");
    assert_eq!(cmd.args, vec!["-c", "import sys; print(sys.version)"]);
}

#[test]
fn test_leading_dash_ignores_exit_status() {
    let cmd = parse_command_line("- coverage erase", &vars(), &[], &no_env()).unwrap();
    assert!(cmd.ignore_exit);
    assert_eq!(cmd.program, "coverage");

    // A flag-like program name is not an ignore marker.
    let cmd = parse_command_line("-m pytest", &vars(), &[], &no_env()).unwrap();
    assert!(!cmd.ignore_exit);
    assert_eq!(cmd.program, "-m");
}

#[test]
fn test_environment_variables_are_expanded() {
    let env = BTreeMap::from([("REPORT_DIR".to_string(), "/tmp/reports".to_string())]);
    let cmd = parse_command_line("pytest --junitxml=$REPORT_DIR/{envname}.xml", &vars(), &[], &env).unwrap();
    assert_eq!(cmd.args, vec!["--junitxml=/tmp/reports/py311-django4x.xml"]);
}

#[test]
fn test_placeholder_paths_with_spaces_stay_single_arguments() {
    let vars = BTreeMap::from([
        ("envpython", "/home/me/My Project/.envmatrix/py311/bin/python".to_string()),
        ("projectdir", "/home/me/My Project".to_string()),
    ]);
    let cmd = parse_command_line(
        "{envpython} -m pytest --rootdir={projectdir} {projectdir}/tests",
        &vars,
        &[],
        &no_env(),
    )
    .unwrap();
    assert_eq!(cmd.program, "/home/me/My Project/.envmatrix/py311/bin/python");
    assert_eq!(
        cmd.args,
        vec![
            "-m",
            "pytest",
            "--rootdir=/home/me/My Project",
            "/home/me/My Project/tests"
        ]
    );
}

#[test]
fn test_placeholder_values_are_not_shell_expanded() {
    let vars = BTreeMap::from([("envdir", "/tmp/$HOME it's".to_string())]);
    let env = BTreeMap::from([("HOME".to_string(), "/root".to_string())]);
    let cmd = parse_command_line("ls {envdir}", &vars, &[], &env).unwrap();
    assert_eq!(cmd.args, vec!["/tmp/$HOME it's"]);
}

#[test]
fn test_invalid_commands_are_errors() {
    assert!(parse_command_line("", &vars(), &[], &no_env()).is_err());
    assert!(parse_command_line("echo 'unterminated", &vars(), &[], &no_env()).is_err());
}

#[test]
fn test_display_requotes_arguments() {
    let cmd = parse_command_line("echo 'hello world'", &vars(), &[], &no_env()).unwrap();
    assert_eq!(cmd.display(), "echo 'hello world'");
}

#[cfg(unix)]
#[tokio::test]
async fn test_spawn_and_capture_merges_streams() {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg("echo out; echo err 1>&2; exit 3");
    let (status, output) = spawn_and_capture(cmd).await;
    let status = status.unwrap();
    assert!(!status.success());
    assert_eq!(status.code(), Some(3));
    assert!(output.contains("out\n"));
    assert!(output.contains("err\n"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_spawn_and_capture_keeps_invalid_utf8_lines() {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg("printf 'before\\n\\377\\376 bad bytes\\nafter\\n'");
    let (status, output) = spawn_and_capture(cmd).await;
    assert!(status.unwrap().success());
    assert!(output.contains("before\n"));
    assert!(output.contains("\u{FFFD}\u{FFFD} bad bytes\n"));
    assert!(output.contains("after\n"));
}

#[tokio::test]
async fn test_spawn_failure_is_reported() {
    let cmd = tokio::process::Command::new("this_command_definitely_does_not_exist_12345");
    let (status, output) = spawn_and_capture(cmd).await;
    assert!(status.is_err());
    assert!(output.is_empty());
}
