//! # Environment Execution Engine Module / 环境执行引擎模块
//!
//! This module runs one matrix entry end to end: interpreter discovery,
//! virtual environment provisioning, dependency and package installation, and
//! the test commands, wrapped with timeout and retry handling.
//!
//! 此模块端到端地运行一个矩阵条目：解释器发现、虚拟环境配置、
//! 依赖和包安装以及测试命令，并处理超时和重试。

use anyhow::Result;
use colored::*;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    core::{
        config::EnvSettings,
        interpreter::{discover, find_in_path, spec_for_env, Interpreter},
        models::{Environment, EnvResult, FailureReason, SkipReason},
        package::Packager,
        planner::PlannedEnv,
        venv::{self, is_reusable, EnvFingerprint, VirtualEnv},
    },
    infra::{
        command::{parse_command_line, spawn_and_capture},
        fs::env_dir,
        t,
    },
};

/// Host variables always passed through to test commands.
pub const DEFAULT_PASSENV: &[&str] = &[
    "HOME",
    "USER",
    "USERNAME",
    "LANG",
    "LANGUAGE",
    "LC_ALL",
    "LC_CTYPE",
    "TERM",
    "TMPDIR",
    "TEMP",
    "TMP",
    "SYSTEMROOT",
    "COMSPEC",
    "PATHEXT",
    "SSL_CERT_FILE",
    "REQUESTS_CA_BUNDLE",
    "PIP_INDEX_URL",
    "PIP_EXTRA_INDEX_URL",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
];

/// Shared, read-only state for every environment of a run.
/// 一次运行中所有环境共享的只读状态。
#[derive(Debug)]
pub struct RunContext {
    /// Absolute project root; commands run from here.
    pub project_root: PathBuf,
    /// Absolute directory holding the virtual environments.
    pub workdir: PathBuf,
    /// Extra arguments substituted for `{posargs}`.
    pub posargs: Vec<String>,
    /// Rebuild environments even when their fingerprint matches.
    pub recreate: bool,
    /// Skip instead of failing environments without an interpreter.
    pub skip_missing_interpreters: bool,
    pub packager: Packager,
    pub locale: String,
}

/// Returns `true` if a `passenv` pattern admits a variable name.
/// Patterns ending in `*` match by prefix; matching is case-insensitive on Windows.
pub fn passenv_matches(pattern: &str, name: &str) -> bool {
    let (pattern, name) = if cfg!(windows) {
        (pattern.to_uppercase(), name.to_uppercase())
    } else {
        (pattern.to_string(), name.to_string())
    };
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

/// Builds the complete environment of a test command from the host variables:
/// the pass-through set, `VIRTUAL_ENV`, a `PATH` starting with the venv's bin
/// directory, and finally `setenv`.
///
/// 根据主机变量构建测试命令的完整环境：透传集合、`VIRTUAL_ENV`、
/// 以 venv 的 bin 目录开头的 `PATH`，最后是 `setenv`。
pub fn build_child_env<I>(host: I, venv: &VirtualEnv, settings: &EnvSettings) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut child = BTreeMap::new();
    let mut host_path = None;
    for (name, value) in host {
        if name.eq_ignore_ascii_case("PATH") {
            host_path = Some(value);
            continue;
        }
        let admitted = DEFAULT_PASSENV.iter().any(|p| passenv_matches(p, &name))
            || settings.passenv.iter().any(|p| passenv_matches(p, &name));
        if admitted {
            child.insert(name, value);
        }
    }

    let mut paths = vec![venv.bin_dir.clone()];
    if let Some(host_path) = &host_path {
        paths.extend(std::env::split_paths(host_path));
    }
    let path = std::env::join_paths(paths)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| venv.bin_dir.display().to_string());

    child.insert("PATH".to_string(), path);
    child.insert("VIRTUAL_ENV".to_string(), venv.dir.display().to_string());
    child.insert("PYTHONHASHSEED".to_string(), "0".to_string());
    for (name, value) in &settings.setenv {
        child.insert(name.clone(), value.clone());
    }
    child
}

/// The `{placeholder}` values available in command lines.
pub fn placeholders<'a>(
    env: &Environment,
    venv: &VirtualEnv,
    project_root: &Path,
    workdir: &Path,
) -> BTreeMap<&'a str, String> {
    BTreeMap::from([
        ("envname", env.name.clone()),
        ("envdir", venv.dir.display().to_string()),
        ("envbindir", venv.bin_dir.display().to_string()),
        ("envpython", venv.python.display().to_string()),
        ("projectdir", project_root.display().to_string()),
        ("workdir", workdir.display().to_string()),
    ])
}

/// The main entry point for running a single environment.
/// It wraps the provisioning and command execution with timeout and retry handling.
///
/// # Arguments
/// * `planned` - The environment and its resolved settings
/// * `ctx` - The shared run context
///
/// # Returns
/// An `EnvResult` describing the outcome. `Err` is reserved for problems that
/// are not attributable to the environment itself (e.g. an unwritable work directory).
///
/// 运行单个环境的主入口。
/// 它为配置和命令执行添加超时与重试处理。
pub async fn run_environment(planned: PlannedEnv, ctx: Arc<RunContext>) -> Result<EnvResult> {
    let PlannedEnv { env, settings } = planned;
    let locale = ctx.locale.as_str();

    let spec = spec_for_env(&env, settings.basepython.as_deref());
    let Some(interpreter) = discover(&spec).await else {
        println!(
            "{}",
            t!("run.interpreter_missing", locale = locale, name = &env.name, interpreter = &spec.executable).yellow()
        );
        return Ok(if ctx.skip_missing_interpreters {
            EnvResult::Skipped {
                env,
                reason: SkipReason::MissingInterpreter(spec.executable),
            }
        } else {
            EnvResult::Failed {
                output: t!("run.interpreter_missing_message", locale = locale, interpreter = &spec.executable).to_string(),
                env,
                reason: FailureReason::InterpreterNotFound,
                duration: Duration::ZERO,
                ignore_outcome: settings.ignore_outcome,
            }
        });
    };

    let max_attempts = settings.retries.saturating_add(1);
    let timeout_dur = settings.timeout_secs.map(Duration::from_secs);
    let mut last_result = None;

    for attempt in 1..=max_attempts {
        // Only the first attempt honours --recreate; retries reuse what it built.
        let recreate = ctx.recreate && attempt == 1;
        let attempt_future = run_attempt(&env, &settings, &interpreter, &ctx, recreate);

        let result = match timeout_dur {
            Some(duration) => match tokio::time::timeout(duration, attempt_future).await {
                Ok(res) => res?,
                Err(_) => {
                    println!(
                        "{}",
                        t!("run.env_timeout", locale = locale, name = &env.name, timeout = duration.as_secs()).red()
                    );
                    EnvResult::Failed {
                        env: env.clone(),
                        output: t!("run.env_timeout_message", locale = locale).to_string(),
                        reason: FailureReason::Timeout,
                        duration,
                        ignore_outcome: settings.ignore_outcome,
                    }
                }
            },
            None => attempt_future.await?,
        };

        match result {
            EnvResult::Passed { env, output, duration, .. } => {
                if attempt > 1 {
                    println!(
                        "{}",
                        t!("run.env_passed_on_retry", locale = locale, name = &env.name, retries = attempt - 1).green()
                    );
                }
                return Ok(EnvResult::Passed {
                    env,
                    output,
                    duration,
                    attempts: attempt,
                });
            }
            res if res.is_timeout() => return Ok(res),
            res => {
                if attempt < max_attempts {
                    println!(
                        "{}",
                        t!("run.env_retrying", locale = locale, name = &env.name, attempt = attempt, retries = max_attempts - 1).yellow()
                    );
                } else if settings.retries > 0 {
                    println!(
                        "{}",
                        t!("run.env_failed_after_retries", locale = locale, name = &env.name, retries = settings.retries).red()
                    );
                }
                last_result = Some(res);
            }
        }
    }

    Ok(last_result.unwrap_or(EnvResult::Skipped {
        env,
        reason: SkipReason::Cancelled,
    }))
}

/// One attempt: provision (or reuse) the environment, install, run commands.
async fn run_attempt(
    env: &Environment,
    settings: &EnvSettings,
    interpreter: &Interpreter,
    ctx: &RunContext,
    recreate: bool,
) -> Result<EnvResult> {
    let locale = ctx.locale.as_str();
    let start_time = Instant::now();
    let envdir = env_dir(&ctx.workdir, &env.name);
    let venv = VirtualEnv::at(&envdir);
    let fingerprint = EnvFingerprint::new(interpreter, &settings.deps);
    let mut log = String::new();

    let fail = |log: String, reason: FailureReason| {
        println!(
            "{}",
            t!(
                "run.env_failed",
                locale = locale,
                name = &env.name,
                reason = reason.describe(locale),
                duration = format!("{:.2}", start_time.elapsed().as_secs_f64())
            )
            .red()
        );
        EnvResult::Failed {
            env: env.clone(),
            output: log,
            reason,
            duration: start_time.elapsed(),
            ignore_outcome: settings.ignore_outcome,
        }
    };

    if recreate || !is_reusable(&envdir, &fingerprint) {
        println!(
            "{}",
            t!("run.creating_env", locale = locale, name = &env.name, python = interpreter.version.as_str()).blue()
        );
        let step = venv::create(interpreter, &envdir).await?;
        log.push_str(&step.log);
        if !step.success {
            return Ok(fail(log, FailureReason::EnvCreation));
        }

        if !settings.deps.is_empty() {
            println!(
                "{}",
                t!("run.installing_deps", locale = locale, name = &env.name, count = settings.deps.len()).blue()
            );
            let step = venv::pip_install(&venv, &settings.deps).await;
            log.push_str(&step.log);
            if !step.success {
                return Ok(fail(log, FailureReason::DepsInstall));
            }
        }
        fingerprint.write(&envdir)?;
    } else {
        println!(
            "{}",
            t!("run.reusing_env", locale = locale, name = &env.name).dimmed()
        );
        log.push_str(&format!("{}\n", t!("run.reusing_env", locale = locale, name = &env.name)));
    }

    if !settings.skip_install {
        match ctx.packager.package().await {
            Err(build_log) => {
                log.push_str(&build_log);
                return Ok(fail(log, FailureReason::Package));
            }
            Ok(source) => {
                let args = vec![
                    "--force-reinstall".to_string(),
                    "--no-deps".to_string(),
                    source.as_pip_arg(),
                ];
                let step = venv::pip_install(&venv, &args).await;
                log.push_str(&step.log);
                if !step.success {
                    return Ok(fail(log, FailureReason::PackageInstall));
                }
            }
        }
    }

    let child_env = build_child_env(std::env::vars(), &venv, settings);
    let vars = placeholders(env, &venv, &ctx.project_root, &ctx.workdir);
    let child_path = OsString::from(child_env.get("PATH").cloned().unwrap_or_default());

    println!(
        "{}",
        t!("run.running_env", locale = locale, name = &env.name).blue()
    );

    for line in &settings.commands {
        let command = match parse_command_line(line, &vars, &ctx.posargs, &child_env) {
            Ok(command) => command,
            Err(e) => {
                log.push_str(&format!("{e}\n"));
                return Ok(fail(log, FailureReason::Commands));
            }
        };

        let program = find_in_path(&command.program, &child_path)
            .unwrap_or_else(|| PathBuf::from(&command.program));
        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(&command.args)
            .env_clear()
            .envs(&child_env)
            .current_dir(&ctx.project_root)
            .kill_on_drop(true);

        let (status_res, output) = spawn_and_capture(cmd).await;
        log.push_str(&format!(
            "{} {}\n",
            t!("run.command_prefix", locale = locale),
            command.display()
        ));
        log.push_str(&output);
        if !output.trim().is_empty() {
            println!("{}", output.trim());
        }

        let succeeded = match status_res {
            Ok(status) if status.success() => true,
            Ok(status) => {
                log.push_str(&format!(
                    "{}\n",
                    t!("run.exit_status", locale = locale, status = status.to_string())
                ));
                false
            }
            Err(e) => {
                log.push_str(&format!(
                    "{}\n",
                    t!("run.spawn_failed", locale = locale, program = command.program.as_str(), error = e.to_string())
                ));
                false
            }
        };

        if !succeeded {
            if command.ignore_exit {
                log.push_str(&format!("{}\n", t!("run.exit_ignored", locale = locale)));
                continue;
            }
            return Ok(fail(log, FailureReason::Commands));
        }
    }

    let duration = start_time.elapsed();
    println!(
        "{}",
        t!("run.env_passed", locale = locale, name = &env.name, duration = format!("{:.2}", duration.as_secs_f64())).green()
    );
    Ok(EnvResult::Passed {
        env: env.clone(),
        output: log,
        duration,
        attempts: 1,
    })
}
