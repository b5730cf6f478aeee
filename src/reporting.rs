//! # Reporting Module / 报告模块
//!
//! This module handles the display and export of run results: a coloured
//! console summary, a self-contained HTML page and a JSON document.
//!
//! 此模块处理运行结果的显示和导出：彩色控制台摘要、独立的 HTML 页面和 JSON 文档。

pub mod console;
pub mod html;
pub mod json;

pub use console::{print_summary, print_unexpected_failure_details};
pub use html::generate_html_report;
pub use json::generate_json_report;
