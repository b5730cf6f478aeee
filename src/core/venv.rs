//! # Virtual Environment Module / 虚拟环境模块
//!
//! Creating, reusing and populating the isolated per-environment virtual
//! environments. An environment directory is reused across runs while its
//! fingerprint (interpreter and dependency list) is unchanged, which makes
//! repeated runs with the same inputs behave identically.
//!
//! 创建、复用和填充每个环境独立的虚拟环境。
//! 只要环境目录的指纹（解释器和依赖列表）不变，它就会在多次运行之间被复用，
//! 从而使相同输入的重复运行表现一致。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::interpreter::Interpreter;
use crate::infra::command::spawn_and_capture;
use crate::infra::fs::{remove_dir_if_exists, venv_bin_dir, venv_python};

/// File inside an environment directory holding its fingerprint.
pub const FINGERPRINT_FILE: &str = ".env-matrix.json";

/// Everything that, when changed, requires rebuilding an environment.
/// 任何一项发生变化时都需要重建环境的信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFingerprint {
    pub interpreter: PathBuf,
    pub version: String,
    pub deps: Vec<String>,
}

impl EnvFingerprint {
    pub fn new(interpreter: &Interpreter, deps: &[String]) -> Self {
        Self {
            interpreter: interpreter.path.clone(),
            version: interpreter.version.clone(),
            deps: deps.to_vec(),
        }
    }

    /// Reads the fingerprint stored in an environment directory, if any.
    pub fn read(envdir: &Path) -> Option<Self> {
        let content = fs::read_to_string(envdir.join(FINGERPRINT_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn write(&self, envdir: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(envdir.join(FINGERPRINT_FILE), content)
            .with_context(|| format!("Failed to write fingerprint in {}", envdir.display()))
    }
}

/// A provisioned virtual environment.
#[derive(Debug, Clone)]
pub struct VirtualEnv {
    pub dir: PathBuf,
    pub bin_dir: PathBuf,
    pub python: PathBuf,
}

impl VirtualEnv {
    pub fn at(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            bin_dir: venv_bin_dir(dir),
            python: venv_python(dir),
        }
    }
}

/// Outcome of a provisioning step: success flag plus the step's log.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub success: bool,
    pub log: String,
}

/// Whether an existing environment directory can be reused as-is.
/// 现有环境目录是否可以原样复用。
pub fn is_reusable(envdir: &Path, wanted: &EnvFingerprint) -> bool {
    venv_python(envdir).is_file() && EnvFingerprint::read(envdir).as_ref() == Some(wanted)
}

async fn run_step(mut cmd: tokio::process::Command, display: String) -> StepOutput {
    cmd.kill_on_drop(true);
    let (status, output) = spawn_and_capture(cmd).await;
    let mut log = format!("$ {display}\n");
    log.push_str(&output);
    match status {
        Ok(status) => StepOutput {
            success: status.success(),
            log,
        },
        Err(e) => {
            log.push_str(&format!("{e}\n"));
            StepOutput { success: false, log }
        }
    }
}

/// Creates a fresh virtual environment, deleting any previous one.
/// 创建一个新的虚拟环境，并删除之前的环境。
pub async fn create(interpreter: &Interpreter, envdir: &Path) -> Result<StepOutput> {
    remove_dir_if_exists(envdir)?;
    if let Some(parent) = envdir.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create work directory: {}", parent.display()))?;
    }

    let mut cmd = tokio::process::Command::new(&interpreter.path);
    cmd.arg("-m").arg("venv").arg(envdir);
    let display = format!("{} -m venv {}", interpreter.path.display(), envdir.display());
    Ok(run_step(cmd, display).await)
}

/// Runs `python -m pip install <args>` inside the environment.
pub async fn pip_install(venv: &VirtualEnv, args: &[String]) -> StepOutput {
    let mut cmd = tokio::process::Command::new(&venv.python);
    cmd.arg("-m")
        .arg("pip")
        .arg("install")
        .arg("--disable-pip-version-check")
        .args(args)
        .env("VIRTUAL_ENV", &venv.dir)
        .env("PIP_NO_INPUT", "1");
    let display = format!("python -m pip install {}", args.join(" "));
    run_step(cmd, display).await
}
