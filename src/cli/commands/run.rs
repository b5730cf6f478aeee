//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command of the env-matrix CLI, which
//! provisions and tests every planned environment of the matrix.
//!
//! 此模块实现了 env-matrix CLI 的 `run` 命令，
//! 为矩阵中每个计划内的环境进行配置并运行测试。

use anyhow::{Context, Result};
use colored::*;
use futures::{stream, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, EnvMatrix},
        execution::{run_environment, RunContext},
        interpreter::host_python_version,
        models::{EnvResult, FailureReason, SkipReason},
        package::Packager,
        planner::{self, PlanOptions, PlannedEnv},
    },
    infra::t,
    reporting::{generate_html_report, generate_json_report, print_summary, print_unexpected_failure_details},
    resolve_locale,
};

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: PathBuf,
    pub project_dir: PathBuf,
    /// Raw `-e` values; each may hold a comma-separated list.
    pub envs: Vec<String>,
    pub jobs: Option<usize>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub ci_python: Option<String>,
    pub recreate: bool,
    pub fail_fast: bool,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub posargs: Vec<String>,
    /// Language given on the command line; overrides the config file.
    pub lang: Option<String>,
}

/// Default parallelism when `--jobs` is not given.
pub fn default_jobs() -> usize {
    num_cpus::get() / 2 + 1
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// `Ok` when every environment passed, was skipped, or failed under
/// `ignore_outcome`; an error otherwise.
///
/// 使用提供的参数执行 run 命令。
pub async fn execute(args: RunArgs) -> Result<()> {
    let (matrix, config_path) = setup_and_parse_config(&args.config)?;
    let locale = match &args.lang {
        Some(lang) => lang.clone(),
        None => resolve_locale(&matrix.language),
    };
    rust_i18n::set_locale(&locale);

    let project_root = fs::canonicalize(&args.project_dir).with_context(|| {
        t!("run_cmd.project_dir_not_found", locale = &locale, path = args.project_dir.display())
    })?;
    let workdir = if matrix.workdir.is_absolute() {
        matrix.workdir.clone()
    } else {
        project_root.join(&matrix.workdir)
    };

    println!(
        "{}",
        t!("run_cmd.project_root_detected", locale = &locale, path = project_root.display())
    );
    println!(
        "{}",
        t!("run_cmd.loading_config", locale = &locale, path = config_path.display())
    );

    let ci_python = resolve_ci_python(&matrix, args.ci_python.clone()).await;
    let options = PlanOptions {
        selected: (!args.envs.is_empty()).then(|| planner::parse_selection(&args.envs)),
        ci_python,
        total_runners: args.total_runners,
        runner_index: args.runner_index,
    };
    let plan = planner::plan_execution(&matrix, &options)?;

    if let Some(factors) = &plan.ci_factors {
        println!(
            "{}",
            t!(
                "run_cmd.ci_mapping",
                locale = &locale,
                version = options.ci_python.as_deref().unwrap_or_default(),
                factors = factors.join(", ")
            )
            .cyan()
        );
    }
    if plan.filtered_platform_count > 0 {
        println!(
            "{}",
            t!(
                "run_cmd.filtered_platform",
                locale = &locale,
                filtered = plan.filtered_platform_count,
                os = env::consts::OS
            )
            .cyan()
        );
    }
    if plan.ignore_outcome_count > 0 {
        println!(
            "{}",
            t!("run_cmd.ignore_outcome_found", locale = &locale, count = plan.ignore_outcome_count).yellow()
        );
    }
    if let (true, Some(total), Some(index)) = (plan.is_distributed, args.total_runners, args.runner_index) {
        println!(
            "{}",
            t!(
                "run_cmd.running_as_split_runner",
                locale = &locale,
                index = index + 1,
                total = total,
                count = plan.envs_to_run.len()
            )
            .bold()
        );
    } else {
        println!(
            "{}",
            t!("run_cmd.running_as_single_runner", locale = &locale, count = plan.envs_to_run.len()).bold()
        );
    }

    if plan.envs_to_run.is_empty() {
        println!("{}", t!("run_cmd.no_envs_to_run", locale = &locale).green());
        return Ok(());
    }

    fs::create_dir_all(&workdir).with_context(|| {
        t!("run_cmd.workdir_create_failed", locale = &locale, path = workdir.display())
    })?;

    let ctx = Arc::new(RunContext {
        packager: Packager::new(&project_root, &workdir, &matrix.package_python, matrix.isolated_build),
        project_root,
        workdir,
        posargs: args.posargs.clone(),
        recreate: args.recreate,
        skip_missing_interpreters: matrix.skip_missing_interpreters,
        locale: locale.clone(),
    });

    let stop_token = setup_signal_handler(&locale);
    let jobs = args.jobs.unwrap_or_else(default_jobs).max(1);

    let results = run_matrix(plan.envs_to_run, jobs, stop_token, args.fail_fast, move |planned| {
        run_environment(planned, ctx.clone())
    })
    .await;

    print_summary(&results, &locale);

    if let Some(report_path) = &args.html {
        write_report(report_path, &locale, || generate_html_report(&results, report_path, &locale));
    }
    if let Some(report_path) = &args.json {
        write_report(report_path, &locale, || generate_json_report(&results, report_path));
    }

    let unexpected_failures: Vec<&EnvResult> =
        results.iter().filter(|r| r.is_unexpected_failure()).collect();
    if !unexpected_failures.is_empty() {
        print_unexpected_failure_details(&unexpected_failures, &locale);
        anyhow::bail!(t!("run_cmd.matrix_failed", locale = &locale, count = unexpected_failures.len()));
    }

    println!("\n{}", t!("run_cmd.all_envs_succeeded", locale = &locale).green().bold());
    Ok(())
}

/// Sets up and parses the configuration file.
fn setup_and_parse_config(config_path_arg: &Path) -> Result<(EnvMatrix, PathBuf)> {
    // The config language is not known yet; use the process locale.
    let locale = rust_i18n::locale().to_string();
    let config_path = fs::canonicalize(config_path_arg).with_context(|| {
        t!("run_cmd.config_not_found", locale = &locale, path = config_path_arg.display())
    })?;
    let matrix = config::load_env_matrix(&config_path)
        .with_context(|| t!("run_cmd.config_parse_failed", locale = &locale))?;
    Ok((matrix, config_path))
}

/// Picks the interpreter version used for the `[gh-actions]` mapping: the
/// explicit flag, or the host `python3` when running inside GitHub Actions.
async fn resolve_ci_python(matrix: &EnvMatrix, explicit: Option<String>) -> Option<String> {
    if explicit.is_some() {
        return explicit;
    }
    let in_github_actions = env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
    if in_github_actions && !matrix.gh_actions.python.is_empty() {
        host_python_version().await
    } else {
        None
    }
}

fn write_report<F: FnOnce() -> Result<()>>(path: &Path, locale: &str, write: F) {
    println!(
        "\n{}",
        t!("run_cmd.generating_report", locale = locale, path = path.display())
    );
    if let Err(e) = write() {
        eprintln!("{} {:#}", t!("run_cmd.report_failed", locale = locale).red(), e);
    }
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("run_cmd.shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}

/// Runs every planned environment with at most `jobs` in flight and returns
/// the results in plan order.
///
/// Cancelling `stop_token` aborts running environments and reports all
/// unfinished ones as skipped. With `fail_fast`, the first unexpected failure
/// does the same for the remaining environments.
///
/// 以最多 `jobs` 个并发运行所有计划内环境，并按计划顺序返回结果。
pub async fn run_matrix<F, Fut>(
    envs: Vec<PlannedEnv>,
    jobs: usize,
    stop_token: CancellationToken,
    fail_fast: bool,
    runner: F,
) -> Vec<EnvResult>
where
    F: Fn(PlannedEnv) -> Fut,
    Fut: Future<Output = Result<EnvResult>> + Send + 'static,
{
    let fail_fast_token = CancellationToken::new();

    let mut indexed: Vec<(usize, EnvResult)> = stream::iter(envs.into_iter().enumerate().map(|(index, planned)| {
        let stop_token = stop_token.clone();
        let fail_fast_token = fail_fast_token.clone();
        let env = planned.env.clone();
        let ignore_outcome = planned.settings.ignore_outcome;
        let task = runner(planned);

        async move {
            if stop_token.is_cancelled() {
                return (index, EnvResult::Skipped { env, reason: SkipReason::Cancelled });
            }
            if fail_fast_token.is_cancelled() {
                return (index, EnvResult::Skipped { env, reason: SkipReason::FailFast });
            }

            let handle = tokio::spawn(task);
            let abort = handle.abort_handle();

            let result = tokio::select! {
                biased;
                _ = stop_token.cancelled() => {
                    abort.abort();
                    EnvResult::Skipped { env, reason: SkipReason::Cancelled }
                }
                _ = fail_fast_token.cancelled() => {
                    abort.abort();
                    EnvResult::Skipped { env, reason: SkipReason::FailFast }
                }
                joined = handle => match joined {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => EnvResult::Failed {
                        env,
                        output: format!("{e:#}"),
                        reason: FailureReason::EnvCreation,
                        duration: Duration::ZERO,
                        ignore_outcome,
                    },
                    Err(e) => EnvResult::Failed {
                        env,
                        output: format!("Critical error during environment execution: {e}"),
                        reason: FailureReason::EnvCreation,
                        duration: Duration::ZERO,
                        ignore_outcome,
                    },
                },
            };

            if fail_fast && result.is_unexpected_failure() {
                fail_fast_token.cancel();
            }
            (index, result)
        }
    }))
    .buffer_unordered(jobs.max(1))
    .collect()
    .await;

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}
