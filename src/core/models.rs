//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the environment
//! matrix runner: matrix entries, per-environment results, failure and skip reasons.
//!
//! 此模块定义了整个环境矩阵运行器中使用的核心数据结构：
//! 矩阵条目、每个环境的结果、失败原因和跳过原因。

use crate::infra::t;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A single entry of the expanded environment matrix.
/// The name is the full tag (e.g. `py38-django2x-jwt1x`) and the factors are its
/// hyphen-separated parts.
///
/// 展开后的环境矩阵中的单个条目。
/// 名称是完整的标签（例如 `py38-django2x-jwt1x`），factors 是以连字符分隔的各部分。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    /// The environment tag as listed or expanded from the envlist.
    /// 在 envlist 中列出或展开得到的环境标签。
    pub name: String,
    /// The factors of the tag, in order of appearance.
    /// 标签中的 factors，按出现顺序排列。
    pub factors: Vec<String>,
}

impl Environment {
    /// Builds an environment from its tag, splitting it into factors.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let factors = split_factors(&name);
        Self { name, factors }
    }

    /// Returns `true` if the environment carries the given factor.
    pub fn has_factor(&self, factor: &str) -> bool {
        self.factors.iter().any(|f| f == factor)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Splits an environment tag into its non-empty hyphen-separated factors.
/// 将环境标签拆分为非空的、以连字符分隔的 factors。
pub fn split_factors(name: &str) -> Vec<String> {
    name.split('-')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Enumerates the possible reasons for an environment failure.
/// 枚举环境失败的可能原因。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FailureReason {
    /// No usable interpreter was found and missing interpreters are not tolerated.
    /// 未找到可用的解释器，且不容忍缺失的解释器。
    InterpreterNotFound,
    /// Creating the virtual environment failed.
    /// 创建虚拟环境失败。
    EnvCreation,
    /// Installing the constrained dependencies failed.
    /// 安装受约束的依赖失败。
    DepsInstall,
    /// Building the project package in isolation failed.
    /// 隔离构建项目包失败。
    Package,
    /// Installing the project into the environment failed.
    /// 将项目安装到环境中失败。
    PackageInstall,
    /// One of the test commands exited unsuccessfully.
    /// 某个测试命令未成功退出。
    Commands,
    /// The environment exceeded its configured timeout.
    /// 环境超出了其配置的超时时间。
    Timeout,
}

/// Why an environment was not run.
/// 环境未运行的原因。
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum SkipReason {
    /// The requested interpreter is unavailable and the tolerance flag is set.
    /// The payload names the interpreter that was looked for.
    /// 请求的解释器不可用且设置了容忍标志。负载为所查找的解释器名称。
    MissingInterpreter(String),
    /// The run was interrupted before this environment finished.
    /// 运行在此环境完成之前被中断。
    Cancelled,
    /// Another environment failed and fail-fast mode is enabled.
    /// 另一个环境失败且启用了快速失败模式。
    FailFast,
}

/// Represents the final result of running a single environment.
///
/// 表示运行单个环境的最终结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EnvResult {
    /// Every command of the environment succeeded.
    /// 环境的所有命令均成功。
    Passed {
        /// The environment that was executed / 执行的环境
        env: Environment,
        /// The complete log of provisioning and commands / 配置与命令的完整日志
        output: String,
        /// The time taken by the successful attempt / 成功尝试所花费的时间
        duration: Duration,
        /// The attempt on which the environment passed (1 means first try).
        /// 环境通过时的尝试次数（1 表示第一次尝试就通过）。
        attempts: u8,
    },
    /// The environment failed.
    /// 环境失败。
    Failed {
        /// The environment that failed / 失败的环境
        env: Environment,
        /// The complete log up to the failure / 失败前的完整日志
        output: String,
        /// The specific reason for the failure / 失败的具体原因
        reason: FailureReason,
        /// The time taken before the failure occurred / 失败发生前所花费的时间
        duration: Duration,
        /// Whether the failure is reported without failing the run.
        /// 该失败是否只报告而不导致整个运行失败。
        ignore_outcome: bool,
    },
    /// The environment was not run.
    /// 环境未运行。
    Skipped {
        /// The environment that was skipped / 被跳过的环境
        env: Environment,
        /// Why it was skipped / 跳过的原因
        reason: SkipReason,
    },
}

impl EnvResult {
    /// The environment this result belongs to.
    pub fn env(&self) -> &Environment {
        match self {
            EnvResult::Passed { env, .. }
            | EnvResult::Failed { env, .. }
            | EnvResult::Skipped { env, .. } => env,
        }
    }

    /// Gets the name of the environment.
    /// 获取环境的名称。
    pub fn env_name(&self) -> &str {
        &self.env().name
    }

    /// A failure that is not covered by `ignore_outcome`.
    pub fn is_unexpected_failure(&self) -> bool {
        matches!(self, EnvResult::Failed { ignore_outcome: false, .. })
    }

    /// A failure that was explicitly allowed through `ignore_outcome`.
    pub fn is_allowed_failure(&self) -> bool {
        matches!(self, EnvResult::Failed { ignore_outcome: true, .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EnvResult::Failed { .. })
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, EnvResult::Passed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, EnvResult::Skipped { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EnvResult::Failed { reason: FailureReason::Timeout, .. })
    }

    /// Gets the CSS class used by the HTML report for this status.
    pub fn status_class(&self) -> &'static str {
        match self {
            EnvResult::Passed { .. } => "status-passed",
            EnvResult::Failed { .. } if self.is_allowed_failure() => "status-allowed-failure",
            EnvResult::Failed { reason: FailureReason::Timeout, .. } => "status-timeout",
            EnvResult::Failed { .. } => "status-failed",
            EnvResult::Skipped { .. } => "status-skipped",
        }
    }

    /// Gets the status of the result as a localized string for display.
    /// 以本地化字符串形式获取结果的状态以供显示。
    pub fn status_str(&self, locale: &str) -> String {
        match self {
            EnvResult::Passed { .. } => t!("report.status_passed", locale = locale).to_string(),
            EnvResult::Failed { .. } if self.is_allowed_failure() => {
                t!("report.status_allowed_failure", locale = locale).to_string()
            }
            EnvResult::Failed { reason: FailureReason::Timeout, .. } => {
                t!("report.status_timeout", locale = locale).to_string()
            }
            EnvResult::Failed { .. } => t!("report.status_failed", locale = locale).to_string(),
            EnvResult::Skipped { .. } => t!("report.status_skipped", locale = locale).to_string(),
        }
    }

    /// A short localized explanation of a failure or skip, empty for passes.
    pub fn detail_str(&self, locale: &str) -> String {
        match self {
            EnvResult::Passed { .. } => String::new(),
            EnvResult::Failed { reason, .. } => reason.describe(locale),
            EnvResult::Skipped { reason, .. } => reason.describe(locale),
        }
    }

    /// Gets the captured output. Skipped environments have none.
    /// 获取捕获的输出。被跳过的环境没有输出。
    pub fn output(&self) -> &str {
        match self {
            EnvResult::Passed { output, .. } | EnvResult::Failed { output, .. } => output,
            EnvResult::Skipped { .. } => "",
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            EnvResult::Passed { duration, .. } | EnvResult::Failed { duration, .. } => {
                Some(*duration)
            }
            EnvResult::Skipped { .. } => None,
        }
    }

    /// Gets the number of attempts of a passed environment. Returns 0 for other states.
    /// 获取通过环境的尝试次数。对于其他状态返回 0。
    pub fn attempts(&self) -> u8 {
        match self {
            EnvResult::Passed { attempts, .. } => *attempts,
            _ => 0,
        }
    }
}

impl FailureReason {
    /// Localized one-line description.
    pub fn describe(&self, locale: &str) -> String {
        let text = match self {
            FailureReason::InterpreterNotFound => {
                t!("reason.interpreter_not_found", locale = locale)
            }
            FailureReason::EnvCreation => t!("reason.env_creation", locale = locale),
            FailureReason::DepsInstall => t!("reason.deps_install", locale = locale),
            FailureReason::Package => t!("reason.package", locale = locale),
            FailureReason::PackageInstall => t!("reason.package_install", locale = locale),
            FailureReason::Commands => t!("reason.commands", locale = locale),
            FailureReason::Timeout => t!("reason.timeout", locale = locale),
        };
        text.to_string()
    }

    /// Failures raised before any test command ran.
    pub fn is_provisioning(&self) -> bool {
        !matches!(self, FailureReason::Commands | FailureReason::Timeout)
    }
}

impl SkipReason {
    /// Localized one-line description.
    pub fn describe(&self, locale: &str) -> String {
        match self {
            SkipReason::MissingInterpreter(name) => {
                t!("reason.missing_interpreter", locale = locale, name = name).to_string()
            }
            SkipReason::Cancelled => t!("reason.cancelled", locale = locale).to_string(),
            SkipReason::FailFast => t!("reason.fail_fast", locale = locale).to_string(),
        }
    }
}

/// Counts of each outcome, shared by all report formats.
/// 各结果的计数，供所有报告格式共享。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub allowed_failures: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn from_results(results: &[EnvResult]) -> Self {
        let mut tally = Tally {
            total: results.len(),
            ..Tally::default()
        };
        for result in results {
            match result {
                EnvResult::Passed { .. } => tally.passed += 1,
                EnvResult::Failed { ignore_outcome: true, .. } => tally.allowed_failures += 1,
                EnvResult::Failed { .. } => tally.failed += 1,
                EnvResult::Skipped { .. } => tally.skipped += 1,
            }
        }
        tally
    }
}
