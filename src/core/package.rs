//! # Packaging Module / 打包模块
//!
//! With `isolated_build`, the project is built into a wheel exactly once per run,
//! from a staged copy of the sources, and every environment installs that wheel.
//! The build is started by the first environment that needs it; the others wait
//! for the same result.
//!
//! 启用 `isolated_build` 时，项目在每次运行中仅从源码的暂存副本构建一次 wheel，
//! 所有环境都安装该 wheel。构建由第一个需要它的环境触发；其他环境等待同一结果。

use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

use crate::core::interpreter::{discover, InterpreterSpec};
use crate::infra::command::spawn_and_capture;
use crate::infra::fs::{remove_dir_if_exists, stage_project};

/// What an environment installs as "the project".
/// 环境安装的“项目”来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A wheel built by the isolated packaging step.
    Wheel(PathBuf),
    /// The project directory, installed directly by pip.
    Directory(PathBuf),
}

impl PackageSource {
    pub fn as_pip_arg(&self) -> String {
        match self {
            PackageSource::Wheel(path) | PackageSource::Directory(path) => {
                path.display().to_string()
            }
        }
    }
}

/// Result of the packaging step: the package, or the build log on failure.
pub type PackageResult = Result<PackageSource, String>;

/// Builds (once) and hands out the project package.
#[derive(Debug)]
pub struct Packager {
    project_root: PathBuf,
    workdir: PathBuf,
    package_python: String,
    isolated: bool,
    built: OnceCell<PackageResult>,
}

impl Packager {
    pub fn new(project_root: &Path, workdir: &Path, package_python: &str, isolated: bool) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            workdir: workdir.to_path_buf(),
            package_python: package_python.to_string(),
            isolated,
            built: OnceCell::new(),
        }
    }

    /// The package to install, building it on first use when isolated.
    pub async fn package(&self) -> PackageResult {
        if !self.isolated {
            return Ok(PackageSource::Directory(self.project_root.clone()));
        }
        self.built.get_or_init(|| self.build_wheel()).await.clone()
    }

    async fn build_wheel(&self) -> PackageResult {
        let spec = InterpreterSpec::new(self.package_python.clone(), None);
        let interpreter = discover(&spec)
            .await
            .ok_or_else(|| format!("packaging interpreter '{}' not found", self.package_python))?;

        let staging =
            stage_project(&self.project_root, &self.workdir).map_err(|e| format!("{e:#}"))?;
        let dist_dir = self.workdir.join("dist");
        remove_dir_if_exists(&dist_dir).map_err(|e| format!("{e:#}"))?;

        let mut cmd = tokio::process::Command::new(&interpreter.path);
        cmd.arg("-m")
            .arg("pip")
            .arg("wheel")
            .arg("--disable-pip-version-check")
            .arg("--no-deps")
            .arg("--wheel-dir")
            .arg(&dist_dir)
            .arg(staging.path())
            .kill_on_drop(true);

        let (status, output) = spawn_and_capture(cmd).await;
        match status {
            Ok(status) if status.success() => {}
            Ok(_) => return Err(output),
            Err(e) => return Err(format!("{output}{e}")),
        }

        find_wheel(&dist_dir)
            .map(PackageSource::Wheel)
            .ok_or_else(|| format!("{output}no wheel produced in {}", dist_dir.display()))
    }
}

fn find_wheel(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|e| e.to_str()) == Some("whl"))
}
