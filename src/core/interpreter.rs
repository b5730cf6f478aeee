//! # Interpreter Discovery Module / 解释器发现模块
//!
//! Maps environment factors to a Python interpreter, finds it on the host and
//! probes its version. Probe results are cached for the whole process since
//! many environments share the same interpreter.
//!
//! 将环境 factors 映射到 Python 解释器，在主机上查找并探测其版本。
//! 由于许多环境共享同一个解释器，探测结果在整个进程中被缓存。

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::models::Environment;
use crate::infra::command::spawn_and_capture;

/// What an environment asks for: an executable name and, when the factor
/// encodes one, the `major.minor` version it must report.
///
/// 环境所请求的解释器：可执行文件名，以及（当 factor 编码了版本时）它必须报告的 `major.minor` 版本。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterpreterSpec {
    pub executable: String,
    pub version: Option<(u32, u32)>,
}

impl InterpreterSpec {
    pub fn new(executable: impl Into<String>, version: Option<(u32, u32)>) -> Self {
        Self {
            executable: executable.into(),
            version,
        }
    }
}

/// An interpreter found on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub path: PathBuf,
    /// `major.minor.micro` as reported by the interpreter.
    pub version: String,
}

impl Interpreter {
    /// The `(major, minor)` pair of the reported version.
    pub fn major_minor(&self) -> Option<(u32, u32)> {
        parse_major_minor(&self.version)
    }
}

fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Interprets the digits after `py`/`pypy`: `3` → 3, `38` → 3.8, `310` → 3.10,
/// `3.11` → 3.11.
fn parse_version_digits(digits: &str) -> Option<(Option<u32>, Option<u32>)> {
    if digits.is_empty() {
        return Some((None, None));
    }
    if let Some((major, minor)) = digits.split_once('.') {
        return Some((Some(major.parse().ok()?), Some(minor.parse().ok()?)));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (major, minor) = digits.split_at(1);
    let major = major.parse().ok()?;
    if minor.is_empty() {
        Some((Some(major), None))
    } else {
        Some((Some(major), Some(minor.parse().ok()?)))
    }
}

/// Derives the interpreter spec from a single factor, if it names one.
///
/// ```
/// use env_matrix::core::interpreter::{spec_from_factor, InterpreterSpec};
///
/// assert_eq!(spec_from_factor("py310"), Some(InterpreterSpec::new("python3.10", Some((3, 10)))));
/// assert_eq!(spec_from_factor("django2x"), None);
/// ```
pub fn spec_from_factor(factor: &str) -> Option<InterpreterSpec> {
    let (base, digits) = if let Some(rest) = factor.strip_prefix("pypy") {
        ("pypy", rest)
    } else if let Some(rest) = factor.strip_prefix("py") {
        ("python", rest)
    } else {
        return None;
    };

    match parse_version_digits(digits)? {
        (None, _) => Some(InterpreterSpec::new(base, None)),
        (Some(major), None) => Some(InterpreterSpec::new(format!("{base}{major}"), None)),
        (Some(major), Some(minor)) => Some(InterpreterSpec::new(
            format!("{base}{major}.{minor}"),
            Some((major, minor)),
        )),
    }
}

/// Chooses the interpreter for an environment: an explicit `basepython` wins,
/// then the first factor naming an interpreter, then `python3`.
///
/// 为环境选择解释器：显式的 `basepython` 优先，其次是第一个指明解释器的 factor，最后是 `python3`。
pub fn spec_for_env(env: &Environment, basepython: Option<&str>) -> InterpreterSpec {
    if let Some(base) = basepython {
        let file_name = Path::new(base)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(base);
        let version = file_name
            .strip_prefix("python")
            .or_else(|| file_name.strip_prefix("pypy"))
            .and_then(parse_version_digits)
            .and_then(|v| match v {
                (Some(major), Some(minor)) => Some((major, minor)),
                _ => None,
            });
        return InterpreterSpec::new(base, version);
    }

    env.factors
        .iter()
        .find_map(|f| spec_from_factor(f))
        .unwrap_or_else(|| InterpreterSpec::new("python3", None))
}

/// Searches `PATH` for an executable. Names containing a path separator are
/// checked directly.
///
/// 在 `PATH` 中搜索可执行文件。包含路径分隔符的名称会被直接检查。
pub fn find_executable(name: &str) -> Option<PathBuf> {
    find_in_path(name, &env::var_os("PATH")?)
}

/// Same as [`find_executable`] but against an explicit `PATH` value, such as
/// the one built for a test environment.
pub fn find_in_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    env::split_paths(path_var).find_map(|dir| {
        let full = dir.join(name);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{name}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

const VERSION_PROBE: &str = "import sys; print('%d.%d.%d' % sys.version_info[:3])";

static PROBE_CACHE: Lazy<Mutex<HashMap<InterpreterSpec, Option<Interpreter>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Locates and probes the interpreter for a spec. Returns `None` if it is not
/// installed, does not run, or reports a different `major.minor` than requested.
///
/// 定位并探测某个规格对应的解释器。如果未安装、无法运行或报告的 `major.minor`
/// 与请求不同，则返回 `None`。
pub async fn discover(spec: &InterpreterSpec) -> Option<Interpreter> {
    if let Ok(cache) = PROBE_CACHE.lock() {
        if let Some(hit) = cache.get(spec) {
            return hit.clone();
        }
    }

    let found = probe(spec).await;
    if let Ok(mut cache) = PROBE_CACHE.lock() {
        cache.insert(spec.clone(), found.clone());
    }
    found
}

async fn probe(spec: &InterpreterSpec) -> Option<Interpreter> {
    let path = find_executable(&spec.executable)?;

    let mut cmd = tokio::process::Command::new(&path);
    cmd.arg("-c").arg(VERSION_PROBE).kill_on_drop(true);
    let (status, output) = spawn_and_capture(cmd).await;
    if !status.ok()?.success() {
        return None;
    }

    let version = output.lines().next()?.trim().to_string();
    let interpreter = Interpreter { path, version };
    match (spec.version, interpreter.major_minor()) {
        (Some(wanted), Some(actual)) if wanted != actual => None,
        _ => Some(interpreter),
    }
}

/// Reads the `major.minor` version of the default `python3` on the host.
/// Used to pick the CI factor mapping when running under GitHub Actions.
pub async fn host_python_version() -> Option<String> {
    let interpreter = discover(&InterpreterSpec::new("python3", None)).await?;
    let (major, minor) = interpreter.major_minor()?;
    Some(format!("{major}.{minor}"))
}
