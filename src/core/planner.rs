//! # Execution Planner Module / 执行计划模块
//!
//! This module decides which environments of the matrix run on this host:
//! explicit selection, CI interpreter mapping, platform filtering and
//! distribution across several runners.
//!
//! 此模块决定矩阵中哪些环境在当前主机上运行：
//! 显式选择、CI 解释器映射、平台过滤以及在多个运行器之间的分配。

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::env;

use crate::core::config::{EnvMatrix, EnvSettings};
use crate::core::models::Environment;
use crate::infra::fs::sanitize_name;

/// Planner inputs coming from the command line.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Environments named with `-e`, in the order given.
    pub selected: Option<Vec<String>>,
    /// Interpreter version of the CI job (`3.11`), used with `[gh-actions]`.
    pub ci_python: Option<String>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
}

/// An environment together with its resolved settings.
#[derive(Debug, Clone)]
pub struct PlannedEnv {
    pub env: Environment,
    pub settings: EnvSettings,
}

/// Represents a complete execution plan for an environment matrix.
/// 表示环境矩阵的完整执行计划。
#[derive(Debug)]
pub struct ExecutionPlan {
    /// The environments to run, in plan order.
    /// 要运行的环境，按计划顺序排列。
    pub envs_to_run: Vec<PlannedEnv>,
    /// Environments dropped because their `platform` excludes this host.
    /// 由于 `platform` 排除了当前主机而被丢弃的环境数量。
    pub filtered_platform_count: usize,
    /// Environments whose failures are reported but tolerated.
    pub ignore_outcome_count: usize,
    /// Factors selected by the CI interpreter mapping, if it applied.
    pub ci_factors: Option<Vec<String>>,
    /// Whether the environments are split across multiple runners.
    /// 环境是否被分配到多个运行器上。
    pub is_distributed: bool,
}

/// Splits `-e` values: `-e py38-django2x,py39-django2x -e lint`.
pub fn parse_selection(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Creates an execution plan for the given matrix.
///
/// # Arguments
/// * `matrix` - The loaded configuration
/// * `options` - Selection, CI mapping and runner distribution options
///
/// # Returns
/// An `ExecutionPlan`, or an error for unknown environment names and
/// inconsistent runner arguments.
pub fn plan_execution(matrix: &EnvMatrix, options: &PlanOptions) -> Result<ExecutionPlan> {
    let known = matrix.known_environments()?;

    let candidates: Vec<Environment> = match &options.selected {
        Some(names) if !names.is_empty() => {
            let mut picked: Vec<Environment> = Vec::with_capacity(names.len());
            for name in names {
                if picked.iter().any(|e| &e.name == name) {
                    continue;
                }
                match known.iter().find(|e| &e.name == name) {
                    Some(env) => picked.push(env.clone()),
                    None => bail!("Unknown environment: {name}"),
                }
            }
            picked
        }
        _ => matrix.environments()?,
    };

    // CI mapping only narrows the default envlist, never an explicit selection.
    let ci_factors = match (&options.selected, &options.ci_python) {
        (None, Some(version)) => matrix.gh_actions.factors_for(version),
        _ => None,
    };
    let candidates: Vec<Environment> = match &ci_factors {
        Some(factors) => candidates
            .into_iter()
            .filter(|env| factors.iter().any(|f| env.has_factor(f)))
            .collect(),
        None => candidates,
    };

    let current_os = env::consts::OS;
    let mut planned = Vec::with_capacity(candidates.len());
    let mut filtered_platform_count = 0;
    for env in candidates {
        let settings = matrix.settings_for(&env)?;
        if !settings.platform.is_empty() && !settings.platform.iter().any(|p| p == current_os) {
            filtered_platform_count += 1;
            continue;
        }
        planned.push(PlannedEnv { env, settings });
    }

    // Every environment owns its directory under the work directory.
    let mut dirs: HashMap<String, &str> = HashMap::with_capacity(planned.len());
    for planned_env in &planned {
        let name = planned_env.env.name.as_str();
        if let Some(other) = dirs.insert(sanitize_name(name), name) {
            bail!("Environments '{other}' and '{name}' would share the same directory");
        }
    }

    let (envs_to_run, is_distributed) = match (options.total_runners, options.runner_index) {
        (Some(total), Some(index)) => {
            if total == 0 || index >= total {
                bail!("Runner index must be less than total runners.");
            }
            let distributed: Vec<_> = planned
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % total == index)
                .map(|(_, env)| env)
                .collect();
            (distributed, true)
        }
        (None, None) => (planned, false),
        _ => bail!("Both --total-runners and --runner-index must be provided."),
    };

    let ignore_outcome_count = envs_to_run
        .iter()
        .filter(|p| p.settings.ignore_outcome)
        .count();

    Ok(ExecutionPlan {
        envs_to_run,
        filtered_platform_count,
        ignore_outcome_count,
        ci_factors,
        is_distributed,
    })
}
