//! # Configuration Module / 配置模块
//!
//! Loading and resolving the `EnvMatrix.toml` configuration file.
//!
//! 加载和解析 `EnvMatrix.toml` 配置文件。

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::factors::{select_lines, select_value};
use crate::core::matrix::{expand_envlist, MatrixError};
use crate::core::models::Environment;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "EnvMatrix.toml";

/// Settings for test environments. The same shape is used for the shared
/// `[testenv]` section and for per-environment `[env.<name>]` overrides; unset
/// fields of an override fall back to `[testenv]`.
///
/// 测试环境的设置。共享的 `[testenv]` 部分和每个环境的 `[env.<name>]` 覆盖使用相同结构；
/// 覆盖中未设置的字段回退到 `[testenv]`。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TestEnvConfig {
    /// Version-constrained dependencies, optionally factor-conditional.
    /// 受版本约束的依赖，可按 factor 条件选择。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deps: Option<Vec<String>>,
    /// Test command lines, run in order.
    /// 按顺序运行的测试命令行。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    /// Explicit interpreter, overriding the one derived from the factors.
    /// 显式指定的解释器，覆盖从 factors 推导出的解释器。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basepython: Option<String>,
    /// Environment variables set for every command. Merged with `[testenv]`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub setenv: BTreeMap<String, String>,
    /// Host variables passed through to commands. `*` suffix is a wildcard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenv: Option<Vec<String>>,
    /// Do not install the project itself into the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_install: Option<bool>,
    /// Report failures without failing the run.
    /// 只报告失败而不使整个运行失败。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_outcome: Option<bool>,
    /// Operating systems (as in `std::env::consts::OS`) the environment runs on.
    /// Empty means every platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Vec<String>>,
    /// Timeout for one attempt, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// How many times a failed environment is re-run. Timeouts are not retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u8>,
}

/// The `[gh-actions]` table: maps the CI interpreter version to factors.
/// `[gh-actions]` 表：将 CI 解释器版本映射到 factors。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GhActions {
    /// `"3.8" = "py38"`; a value may list several factors separated by commas
    /// or whitespace.
    #[serde(default)]
    pub python: BTreeMap<String, String>,
}

impl GhActions {
    pub fn is_empty(&self) -> bool {
        self.python.is_empty()
    }

    /// The factors mapped to an interpreter version, if any.
    /// Accepts `3.11.4` as well as `3.11`.
    pub fn factors_for(&self, version: &str) -> Option<Vec<String>> {
        let version = version.trim();
        let short: String = version.split('.').take(2).collect::<Vec<_>>().join(".");
        self.python
            .get(version)
            .or_else(|| self.python.get(&short))
            .map(|value| split_factor_list(value))
    }
}

fn split_factor_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Represents the entire environment matrix configuration, loaded from a TOML file.
///
/// 代表从 TOML 文件加载的整个环境矩阵配置。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvMatrix {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// Defaults to "en" if not specified.
    ///
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    /// 如果未指定，则默认为 "en"。
    #[serde(default = "default_language")]
    pub language: String,

    /// Environment tags, with brace expansion over the matrix axes.
    /// 环境标签，支持对矩阵轴进行花括号展开。
    pub envlist: Vec<String>,

    /// Build the project package once, in isolation, before testing.
    /// 在测试之前以隔离方式构建一次项目包。
    #[serde(default)]
    pub isolated_build: bool,

    /// Skip environments whose interpreter is absent instead of failing them.
    /// 跳过解释器缺失的环境，而不是将其标记为失败。
    #[serde(default)]
    pub skip_missing_interpreters: bool,

    /// Directory holding the virtual environments, relative to the project root.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// Interpreter used by the isolated packaging step.
    #[serde(default = "default_package_python")]
    pub package_python: String,

    /// Settings shared by every environment.
    #[serde(default)]
    pub testenv: TestEnvConfig,

    /// Per-environment overrides. Names not in the envlist define extra
    /// environments that can be selected explicitly.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, TestEnvConfig>,

    #[serde(default, rename = "gh-actions", skip_serializing_if = "GhActions::is_empty")]
    pub gh_actions: GhActions,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".envmatrix")
}

fn default_package_python() -> String {
    "python3".to_string()
}

/// The settings of one environment after applying overrides and selecting the
/// lines whose factor conditions match.
///
/// 应用覆盖并选择 factor 条件匹配的行之后，单个环境的设置。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvSettings {
    pub deps: Vec<String>,
    pub commands: Vec<String>,
    pub basepython: Option<String>,
    pub setenv: BTreeMap<String, String>,
    pub passenv: Vec<String>,
    pub skip_install: bool,
    pub ignore_outcome: bool,
    pub platform: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub retries: u8,
}

impl EnvMatrix {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let matrix: EnvMatrix = toml::from_str(content)?;
        matrix.validate()?;
        Ok(matrix)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.environments()?;
        for (version, value) in &self.gh_actions.python {
            if split_factor_list(value).is_empty() {
                bail!("gh-actions mapping for python {version} names no factor");
            }
        }
        Ok(())
    }

    /// The environments declared by the envlist, in declaration order.
    /// envlist 声明的环境，按声明顺序排列。
    pub fn environments(&self) -> Result<Vec<Environment>, MatrixError> {
        expand_envlist(&self.envlist)
    }

    /// Every environment that can be selected: the envlist followed by the
    /// extra environments defined only through `[env.<name>]`.
    pub fn known_environments(&self) -> Result<Vec<Environment>, MatrixError> {
        let mut envs = self.environments()?;
        for name in self.env.keys() {
            if !envs.iter().any(|e| &e.name == name) {
                envs.push(Environment::new(name.clone()));
            }
        }
        Ok(envs)
    }

    /// Resolves the settings of one environment.
    pub fn settings_for(&self, env: &Environment) -> Result<EnvSettings, MatrixError> {
        let base = &self.testenv;
        let over = self.env.get(&env.name);

        let pick = |f: fn(&TestEnvConfig) -> Option<Vec<String>>| -> Vec<String> {
            over.and_then(f).or_else(|| f(base)).unwrap_or_default()
        };
        let deps = pick(|c| c.deps.clone());
        let commands = pick(|c| c.commands.clone());
        let passenv = pick(|c| c.passenv.clone());
        let platform = pick(|c| c.platform.clone());

        let mut setenv = BTreeMap::new();
        let layers = std::iter::once(&base.setenv).chain(over.map(|o| &o.setenv));
        for layer in layers {
            for (key, value) in layer {
                match select_value(value, &env.factors)? {
                    Some(value) => {
                        setenv.insert(key.clone(), value);
                    }
                    None => {
                        setenv.remove(key);
                    }
                }
            }
        }

        Ok(EnvSettings {
            deps: select_lines(&deps, &env.factors)?,
            commands: select_lines(&commands, &env.factors)?,
            basepython: over
                .and_then(|o| o.basepython.clone())
                .or_else(|| base.basepython.clone()),
            setenv,
            passenv,
            skip_install: over
                .and_then(|o| o.skip_install)
                .or(base.skip_install)
                .unwrap_or(false),
            ignore_outcome: over
                .and_then(|o| o.ignore_outcome)
                .or(base.ignore_outcome)
                .unwrap_or(false),
            platform,
            timeout_secs: over.and_then(|o| o.timeout_secs).or(base.timeout_secs),
            retries: over.and_then(|o| o.retries).or(base.retries).unwrap_or(0),
        })
    }
}

/// Reads and parses the configuration file at `path`.
/// 读取并解析 `path` 处的配置文件。
pub fn load_env_matrix(path: &Path) -> Result<EnvMatrix> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    EnvMatrix::from_toml_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}
