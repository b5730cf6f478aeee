//! # JSON Reporting Module / JSON 报告模块
//!
//! Machine-readable run report, for CI dashboards and artifact uploads.
//!
//! 机器可读的运行报告，用于 CI 仪表板和产物上传。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::core::models::{EnvResult, Tally};

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub allowed_failures: usize,
    pub skipped: usize,
    pub environments: Vec<JsonEnvEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonEnvEntry<'a> {
    pub name: &'a str,
    pub factors: &'a [String],
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub attempts: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub output: &'a str,
}

/// Builds the report structure. Details are rendered in English so the
/// report stays stable across locales.
pub fn build_json_report(results: &[EnvResult]) -> JsonReport<'_> {
    let tally = Tally::from_results(results);
    let environments = results
        .iter()
        .map(|result| JsonEnvEntry {
            name: result.env_name(),
            factors: &result.env().factors,
            status: result.status_class().trim_start_matches("status-"),
            duration_secs: result.duration().map(|d| d.as_secs_f64()),
            attempts: result.attempts(),
            detail: result.detail_str("en"),
            output: if result.is_failure() { result.output() } else { "" },
        })
        .collect();

    JsonReport {
        generated_at: Utc::now(),
        total: tally.total,
        passed: tally.passed,
        failed: tally.failed,
        allowed_failures: tally.allowed_failures,
        skipped: tally.skipped,
        environments,
    }
}

/// Writes the JSON report to `output_path`.
/// 将 JSON 报告写入 `output_path`。
pub fn generate_json_report(results: &[EnvResult], output_path: &Path) -> Result<()> {
    let report = build_json_report(results);
    let content = serde_json::to_string_pretty(&report).context("Failed to serialize JSON report")?;
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write JSON report: {}", output_path.display()))
}
