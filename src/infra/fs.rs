//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for file system operations,
//! such as laying out environment directories and staging project copies.
//!
//! 此模块提供文件系统操作的实用功能，
//! 如布置环境目录和暂存项目副本。

use anyhow::{Context, Result};
use fs_extra::dir::{copy, CopyOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Entries never copied into a packaging staging directory.
const STAGING_EXCLUDES: &[&str] = &[
    ".git",
    ".hg",
    ".venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "__pycache__",
    "build",
    "dist",
];

/// Turns an environment name into a safe directory name.
/// 将环境名称转换为安全的目录名称。
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The directory of one environment inside the work directory.
pub fn env_dir(workdir: &Path, env_name: &str) -> PathBuf {
    workdir.join(sanitize_name(env_name))
}

/// The `bin` (or `Scripts` on Windows) directory of a virtual environment.
pub fn venv_bin_dir(envdir: &Path) -> PathBuf {
    if cfg!(windows) {
        envdir.join("Scripts")
    } else {
        envdir.join("bin")
    }
}

/// The interpreter inside a virtual environment.
pub fn venv_python(envdir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_bin_dir(envdir).join("python.exe")
    } else {
        venv_bin_dir(envdir).join("python")
    }
}

/// Removes a directory tree if it exists.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Copies a project into a fresh temporary directory for an isolated build.
/// VCS metadata, caches, build outputs and the work directory itself are left
/// behind. The copy is deleted when the returned `TempDir` is dropped.
///
/// 将项目复制到一个新的临时目录中以进行隔离构建。
/// VCS 元数据、缓存、构建输出以及工作目录本身不会被复制。
/// 返回的 `TempDir` 被丢弃时副本会被删除。
pub fn stage_project(project_root: &Path, workdir: &Path) -> Result<TempDir> {
    let staging = tempfile::Builder::new()
        .prefix("env_matrix_stage_")
        .tempdir()
        .context("Failed to create staging directory")?;

    let mut options = CopyOptions::new();
    options.overwrite = true;

    let entries = fs::read_dir(project_root)
        .with_context(|| format!("Failed to read project directory: {}", project_root.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let skip = STAGING_EXCLUDES.iter().any(|ex| name == *ex)
            || path == workdir
            || name.to_string_lossy().ends_with(".egg-info");
        if skip {
            continue;
        }

        if entry.file_type()?.is_dir() {
            copy(&path, staging.path(), &options)
                .with_context(|| format!("Failed to copy {}", path.display()))?;
        } else {
            fs::copy(&path, staging.path().join(&name))
                .with_context(|| format!("Failed to copy {}", path.display()))?;
        }
    }

    Ok(staging)
}
