//! # Matrix Initialization Module / 矩阵初始化模块
//!
//! This module provides functionality for initializing a new `EnvMatrix.toml`
//! through an interactive command-line wizard, or from a default template.
//!
//! 此模块通过交互式命令行向导或默认模板提供初始化新 `EnvMatrix.toml` 的功能。
//!
//! ## Features / 功能特性
//!
//! - **Interactive Wizard**: interpreter versions, dependencies and the test command
//! - **CI Mapping**: a `[gh-actions]` entry for every selected interpreter
//! - **Overwrite Protection**: confirmation prompt before overwriting an existing file
//!
//! - **交互式向导**: 解释器版本、依赖和测试命令
//! - **CI 映射**: 为每个选定的解释器生成 `[gh-actions]` 条目
//! - **覆盖保护**: 覆盖现有配置前的确认提示

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::config::{EnvMatrix, GhActions, TestEnvConfig, DEFAULT_CONFIG_FILE};
use crate::infra::t;

/// Interpreter versions offered by the wizard, as `(version, factor)`.
pub const PYTHON_VERSIONS: &[(&str, &str)] = &[
    ("3.8", "py38"),
    ("3.9", "py39"),
    ("3.10", "py310"),
    ("3.11", "py311"),
    ("3.12", "py312"),
    ("3.13", "py313"),
];

/// Versions preselected in the wizard and used by the default template.
const DEFAULT_VERSIONS: &[&str] = &["3.10", "3.11", "3.12"];

/// Runs the interactive wizard (or writes the default template) to generate
/// an `EnvMatrix.toml` file in the current directory.
///
/// 运行交互式向导（或写入默认模板）以在当前目录生成 `EnvMatrix.toml` 文件。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(DEFAULT_CONFIG_FILE);

    if non_interactive {
        let matrix = build_matrix(language, DEFAULT_VERSIONS, vec!["pytest".to_string()], "pytest {posargs}");
        return write_config(config_path, &matrix, language);
    }

    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init.welcome", locale = language).cyan().bold());
    println!("{}", t!("init.description", locale = language));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    let labels: Vec<String> = PYTHON_VERSIONS.iter().map(|(v, f)| format!("Python {v} ({f})")).collect();
    let defaults: Vec<bool> = PYTHON_VERSIONS
        .iter()
        .map(|(v, _)| DEFAULT_VERSIONS.contains(v))
        .collect();
    let selections = MultiSelect::with_theme(&theme)
        .with_prompt(t!("init.python_selection_prompt", locale = language))
        .items(&labels)
        .defaults(&defaults)
        .interact()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let versions: Vec<&str> = if selections.is_empty() {
        println!("{}", t!("init.no_versions_selected", locale = language).yellow());
        DEFAULT_VERSIONS.to_vec()
    } else {
        selections.iter().map(|&i| PYTHON_VERSIONS[i].0).collect()
    };

    let deps: String = Input::with_theme(&theme)
        .with_prompt(t!("init.deps_prompt", locale = language))
        .default("pytest".to_string())
        .interact_text()?;
    let deps: Vec<String> = deps
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();

    let command: String = Input::with_theme(&theme)
        .with_prompt(t!("init.command_prompt", locale = language))
        .default("pytest {posargs}".to_string())
        .interact_text()?;

    let mut matrix = build_matrix(language, &versions, deps, &command);
    matrix.isolated_build = Confirm::with_theme(&theme)
        .with_prompt(t!("init.isolated_build_prompt", locale = language))
        .default(true)
        .interact()?;
    matrix.skip_missing_interpreters = Confirm::with_theme(&theme)
        .with_prompt(t!("init.skip_missing_prompt", locale = language))
        .default(true)
        .interact()?;

    write_config(config_path, &matrix, language)
}

/// Builds a matrix with one environment per interpreter version and the
/// matching `[gh-actions]` entries.
pub fn build_matrix(language: &str, versions: &[&str], deps: Vec<String>, command: &str) -> EnvMatrix {
    let known: Vec<(&str, &str)> = versions
        .iter()
        .filter_map(|v| PYTHON_VERSIONS.iter().find(|(known, _)| known == v))
        .copied()
        .collect();
    let factors: Vec<&str> = known.iter().map(|(_, factor)| *factor).collect();

    let envlist = match factors.as_slice() {
        [single] => single.to_string(),
        many => format!(
            "py{{{}}}",
            many.iter()
                .map(|f| f.trim_start_matches("py"))
                .collect::<Vec<_>>()
                .join(",")
        ),
    };

    let python: BTreeMap<String, String> = known
        .iter()
        .map(|(v, f)| (v.to_string(), f.to_string()))
        .collect();

    EnvMatrix {
        language: language.to_string(),
        envlist: vec![envlist],
        isolated_build: true,
        skip_missing_interpreters: true,
        workdir: ".envmatrix".into(),
        package_python: "python3".to_string(),
        testenv: TestEnvConfig {
            deps: Some(deps),
            commands: Some(vec![command.to_string()]),
            ..TestEnvConfig::default()
        },
        env: BTreeMap::new(),
        gh_actions: GhActions { python },
    }
}

fn write_config(path: &Path, matrix: &EnvMatrix, language: &str) -> Result<()> {
    let toml_string = toml::to_string_pretty(matrix)
        .context(t!("init.serialize_failed", locale = language).to_string())?;

    fs::write(path, toml_string)
        .with_context(|| t!("init.write_failed", locale = language, path = path.display()))?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success_created", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init.usage_hint", locale = language));

    Ok(())
}
