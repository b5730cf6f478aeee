// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Creates a minimal Python project layout in a temporary directory.
pub fn setup_test_project() -> TempDir {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let root = temp_dir.path();
    fs::create_dir_all(root.join("src/sample")).expect("Failed to create src directory");
    fs::write(
        root.join("pyproject.toml"),
        "[project]\nname = \"sample\"\nversion = \"0.1.0\"\n",
    )
    .expect("Failed to write pyproject.toml");
    fs::write(root.join("src/sample/__init__.py"), "VERSION = '0.1.0'\n")
        .expect("Failed to write __init__.py");
    temp_dir
}

/// Writes `EnvMatrix.toml` into `dir` and returns its path.
pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("EnvMatrix.toml");
    fs::write(&path, content).expect("Failed to write EnvMatrix.toml");
    path
}

/// A shell script that behaves like just enough of a Python interpreter for
/// the runner: it answers the version probe, "creates" a venv by copying
/// itself, logs pip invocations and fakes `pip wheel` output.
#[cfg(unix)]
const FAKE_PYTHON: &str = r#"#!/bin/sh
if [ "$1" = "-c" ]; then
  echo "3.11.4"
  exit 0
fi
if [ "$1" = "-m" ] && [ "$2" = "venv" ]; then
  mkdir -p "$3/bin"
  cp "$0" "$3/bin/python"
  chmod +x "$3/bin/python"
  exit 0
fi
if [ "$1" = "-m" ] && [ "$2" = "pip" ]; then
  echo "pip $*" >> "$(dirname "$0")/../pip.log"
  if [ "$3" = "wheel" ]; then
    while [ $# -gt 0 ]; do
      if [ "$1" = "--wheel-dir" ]; then
        mkdir -p "$2"
        touch "$2/sample-0.1.0-py3-none-any.whl"
      fi
      shift
    done
  fi
  exit 0
fi
exit 0
"#;

/// Installs the fake interpreter as `<dir>/fakebin/python3.11` and returns its path.
#[cfg(unix)]
pub fn install_fake_python(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("fakebin");
    fs::create_dir_all(&bin).expect("Failed to create fakebin directory");
    let path = bin.join("python3.11");
    fs::write(&path, FAKE_PYTHON).expect("Failed to write fake interpreter");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to make fake interpreter executable");
    path
}

/// Reads the pip log the fake interpreter keeps next to its directory.
#[cfg(unix)]
pub fn fake_pip_log(fake_python: &Path) -> String {
    let log = fake_python
        .parent()
        .and_then(Path::parent)
        .map(|dir| dir.join("pip.log"));
    log.and_then(|p| fs::read_to_string(p).ok()).unwrap_or_default()
}
