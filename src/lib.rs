//! # env-matrix Library / env-matrix 库
//!
//! This library provides the core functionality for the env-matrix tool,
//! a configuration-driven runner that executes a Python project's test suite
//! across a matrix of interpreter and dependency versions.
//!
//! 此库为 env-matrix 工具提供核心功能，
//! 这是一个配置驱动的运行器，可在解释器与依赖版本构成的矩阵上执行 Python 项目的测试套件。
//!
//! ## Modules / 模块
//!
//! - `core` - Matrix expansion, configuration and the environment execution engine
//! - `infra` - Infrastructure services like process execution and file system operations
//! - `reporting` - Result reporting (console, HTML, JSON)
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 矩阵展开、配置和环境执行引擎
//! - `infra` - 基础设施服务，如进程执行和文件系统操作
//! - `reporting` - 结果报告（控制台、HTML、JSON）
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::matrix;
pub use core::models;

/// Resolves a requested language against the bundled translations.
///
/// Tries the full locale first (e.g. "zh-CN"), then the language part only
/// (e.g. "en" from "en-US"), and finally falls back to "en".
///
/// 将请求的语言与内置翻译匹配：先尝试完整区域设置，再尝试语言部分，最后回退到 "en"。
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();
    if available_locales.iter().any(|l| *l == requested) {
        return requested.to_string();
    }
    requested
        .split(['-', '_'])
        .next()
        .and_then(|code| available_locales.iter().find(|l| **l == code || l.starts_with(&format!("{code}-"))))
        .map(|l| l.to_string())
        .unwrap_or_else(|| "en".to_string())
}

/// Initializes the application's internationalization (i18n) based on the system locale.
/// 根据系统区域设置初始化应用程序的国际化。
pub fn init() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let lang = resolve_locale(&locale);
    rust_i18n::set_locale(&lang);
    lang
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
