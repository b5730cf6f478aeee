//! # HTML Reporting Module / HTML 报告模块
//!
//! This module handles the generation of HTML matrix reports.
//! It creates a self-contained page with outcome counts, a results table and a
//! collapsible log for every failed environment.
//!
//! 此模块处理 HTML 矩阵报告的生成。
//! 它创建一个独立页面，包含结果计数、结果表格以及每个失败环境的可折叠日志。

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::core::models::{EnvResult, Tally};
use crate::infra::t;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292f; }
h1 { font-weight: 600; }
.summary-container { display: flex; gap: 1.5em; margin-bottom: 2em; }
.summary-item { display: flex; flex-direction: column; align-items: center; padding: 0.8em 1.4em; border: 1px solid #d0d7de; border-radius: 6px; }
.summary-item .count { font-size: 1.8em; font-weight: 600; }
.summary-item .label { color: #57606a; }
.passed-text { color: #1a7f37; } .failed-text { color: #cf222e; } .allowed-text { color: #9a6700; } .skipped-text { color: #6e7781; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.5em 0.8em; border-bottom: 1px solid #d0d7de; }
.duration-cell, .attempts-cell { text-align: right; white-space: nowrap; }
.status-cell { display: inline-block; padding: 0.1em 0.6em; border-radius: 1em; font-size: 0.9em; color: #fff; }
.status-passed { background: #1a7f37; } .status-failed { background: #cf222e; } .status-timeout { background: #bc4c00; }
.status-allowed-failure { background: #9a6700; } .status-skipped { background: #6e7781; }
.output-toggle { cursor: pointer; color: #0969da; font-size: 0.85em; margin-top: 0.3em; }
.output-content { background: #f6f8fa; padding: 1em; overflow-x: auto; max-height: 40em; }
.detail { color: #57606a; }
"#;

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const HTML_SCRIPT: &str = r#"
function toggleOutput(id) {
  var row = document.getElementById(id);
  row.style.display = row.style.display === 'none' ? 'table-row' : 'none';
}
"#;

/// Renders the report page.
pub fn render_html_report(results: &[EnvResult], locale: &str) -> Markup {
    let tally = Tally::from_results(results);

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                div class="summary-container" {
                    (summary_item(tally.total, "", &t!("html_report.summary.total", locale = locale)))
                    (summary_item(tally.passed, "passed-text", &t!("html_report.summary.passed", locale = locale)))
                    (summary_item(tally.failed, "failed-text", &t!("html_report.summary.failed", locale = locale)))
                    (summary_item(tally.allowed_failures, "allowed-text", &t!("html_report.summary.allowed", locale = locale)))
                    (summary_item(tally.skipped, "skipped-text", &t!("html_report.summary.skipped", locale = locale)))
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.name", locale = locale)) }
                            th class="status-col" { (t!("html_report.table.header.status", locale = locale)) }
                            th class="duration-cell" { (t!("html_report.table.header.duration", locale = locale)) }
                            th class="attempts-cell" { (t!("html_report.table.header.attempts", locale = locale)) }
                        }
                    }
                    tbody {
                        @for (i, result) in results.iter().enumerate() {
                            (result_rows(i, result, locale))
                        }
                    }
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    }
}

fn summary_item(count: usize, class: &str, label: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

fn result_rows(index: usize, result: &EnvResult, locale: &str) -> Markup {
    let output_id = format!("output-{index}");
    let duration_str = result
        .duration()
        .map(|d| format!("{:.2}s", d.as_secs_f64()))
        .unwrap_or_else(|| "N/A".to_string());
    let attempts = result.attempts();

    html! {
        tr {
            td {
                (result.env_name())
                @let detail = result.detail_str(locale);
                @if !detail.is_empty() {
                    div class="detail" { (detail) }
                }
            }
            td class="status-col" {
                div class={ "status-cell " (result.status_class()) } { (result.status_str(locale)) }
                @if result.is_failure() {
                    div class="output-toggle" onclick={ "toggleOutput('" (output_id) "')" } {
                        (t!("html_report.toggle_output", locale = locale))
                    }
                }
            }
            td class="duration-cell" { (duration_str) }
            td class="attempts-cell" {
                @if attempts > 1 { (attempts) }
            }
        }
        @if result.is_failure() {
            tr id=(output_id) style="display:none;" {
                td colspan="4" {
                    pre class="output-content" { (result.output()) }
                }
            }
        }
    }
}

/// Generates an HTML report from the results and writes it to `output_path`.
///
/// 从结果生成 HTML 报告并写入 `output_path`。
///
/// # Errors / 错误
/// Returns an error if the file cannot be written.
/// 如果无法写入文件，则返回错误。
pub fn generate_html_report(results: &[EnvResult], output_path: &Path, locale: &str) -> Result<()> {
    let page = render_html_report(results, locale);
    fs::write(output_path, page.into_string())
        .with_context(|| format!("Failed to write HTML report: {}", output_path.display()))
}
