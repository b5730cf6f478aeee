//! # Console Reporting Module / 控制台报告模块
//!
//! This module handles the display of run results in the console.
//! It provides functionality for printing colorful, formatted summaries with
//! internationalization support.
//!
//! 此模块处理控制台中运行结果的显示。
//! 它提供打印彩色格式化摘要的功能，支持国际化。

use colored::*;

use crate::core::models::{EnvResult, Tally};
use crate::infra::t;

/// Prints a formatted summary of environment results to the console.
/// Displays a table with status, environment name, duration and attempts,
/// using color coding to highlight different statuses.
///
/// 在控制台打印格式化的环境结果摘要。
/// 显示一个包含状态、环境名称、持续时间和尝试次数的表格，
/// 使用颜色编码突出显示不同的状态。
///
/// # Output Format / 输出格式
/// ```text
/// --- Matrix Summary ---
///   - Passed           | py38-django2x-jwt1x                      |      41.20s
///   - Failed           | py39-django4x-jwt2x                      |      12.03s  test commands failed
///   - Skipped          | py311-django111-jwt1x                    |         N/A  interpreter python3.11 not found
/// ```
pub fn print_summary(results: &[EnvResult], locale: &str) {
    println!("\n{}", t!("summary.banner", locale = locale).bold());

    for result in results {
        let status_str = result.status_str(locale);
        let duration_str = result
            .duration()
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_else(|| "N/A".to_string());

        let mut detail = result.detail_str(locale);
        if result.attempts() > 1 {
            detail = t!("summary.retries", locale = locale, count = result.attempts() - 1).to_string();
        }

        let status_colored = match result {
            EnvResult::Passed { .. } => status_str.green(),
            EnvResult::Failed { .. } if result.is_allowed_failure() => status_str.yellow(),
            EnvResult::Failed { .. } => status_str.red(),
            EnvResult::Skipped { .. } => status_str.dimmed(),
        };

        println!(
            "  - {:<18} | {:<40} | {:>10}  {}",
            status_colored,
            result.env_name(),
            duration_str,
            detail.dimmed()
        );
    }

    let tally = Tally::from_results(results);
    println!(
        "\n{}",
        t!(
            "summary.counts",
            locale = locale,
            total = tally.total,
            passed = tally.passed,
            failed = tally.failed,
            allowed = tally.allowed_failures,
            skipped = tally.skipped
        )
        .bold()
    );
}

/// Prints detailed information about unexpected environment failures.
/// Shows the full log of each failed environment that is not covered by
/// `ignore_outcome`.
///
/// 打印意外环境失败的详细信息。
/// 显示每个未被 `ignore_outcome` 覆盖的失败环境的完整日志。
pub fn print_unexpected_failure_details(unexpected_failures: &[&EnvResult], locale: &str) {
    if unexpected_failures.is_empty() {
        return;
    }

    println!("\n{}", t!("summary.unexpected_failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, result) in unexpected_failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            unexpected_failures.len(),
            t!("summary.failure_header", locale = locale).red(),
            result.env_name().cyan()
        );

        if let EnvResult::Failed { output, reason, .. } = result {
            println!("({})", reason.describe(locale));
            let log_header = if reason.is_provisioning() {
                t!("summary.provision_log", locale = locale)
            } else {
                t!("summary.command_log", locale = locale)
            };
            println!("\n--- {} ---\n", log_header.yellow());
            println!("{}", output);
            println!("\n{}", "-".repeat(80));
        }
    }
}
