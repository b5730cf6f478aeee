//! # List Command Module / 列表命令模块
//!
//! Prints the expanded environment matrix without running anything.
//! 打印展开后的环境矩阵，不运行任何内容。

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::{
    core::{
        config::load_env_matrix,
        interpreter::spec_for_env,
        planner::{plan_execution, PlanOptions},
    },
    infra::t,
    resolve_locale,
};

/// Executes the list command.
///
/// # Arguments
/// * `config` - Path to the configuration file
/// * `ci_python` - Narrow the list through the `[gh-actions]` mapping
/// * `verbose` - Also print the interpreter, dependencies and commands
/// * `lang` - Language given on the command line
pub fn execute(config: &Path, ci_python: Option<String>, verbose: bool, lang: Option<String>) -> Result<()> {
    let matrix = load_env_matrix(config)
        .with_context(|| t!("run_cmd.config_parse_failed", locale = &rust_i18n::locale().to_string()))?;
    let locale = lang.unwrap_or_else(|| resolve_locale(&matrix.language));

    let plan = plan_execution(
        &matrix,
        &PlanOptions {
            ci_python,
            ..PlanOptions::default()
        },
    )?;

    for planned in &plan.envs_to_run {
        println!("{}", planned.env.name);
        if !verbose {
            continue;
        }

        let settings = &planned.settings;
        let spec = spec_for_env(&planned.env, settings.basepython.as_deref());
        println!(
            "    {} {}",
            t!("list.interpreter", locale = &locale).dimmed(),
            spec.executable
        );
        for dep in &settings.deps {
            println!("    {} {}", t!("list.dep", locale = &locale).dimmed(), dep);
        }
        for command in &settings.commands {
            println!("    {} {}", t!("list.command", locale = &locale).dimmed(), command);
        }
        if settings.ignore_outcome {
            println!("    {}", t!("list.ignore_outcome", locale = &locale).yellow());
        }
    }

    // Environments defined only through `[env.<name>]` run when selected with `-e`.
    let envlist = matrix.environments()?;
    let extra: Vec<&String> = matrix
        .env
        .keys()
        .filter(|name| !envlist.iter().any(|e| &&e.name == name))
        .collect();
    if !extra.is_empty() {
        println!("\n{}", t!("list.extra_header", locale = &locale).dimmed());
        for name in extra {
            println!("{name}");
        }
    }

    if plan.filtered_platform_count > 0 {
        println!(
            "\n{}",
            t!("list.filtered_platform", locale = &locale, count = plan.filtered_platform_count).dimmed()
        );
    }
    Ok(())
}
