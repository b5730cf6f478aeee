//! # Command Execution Module / 命令执行模块
//!
//! Spawning child processes with captured output, and turning configured
//! command lines into argument vectors.
//!
//! 派生子进程并捕获其输出，以及将配置的命令行转换为参数向量。

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::SplitStream, StreamExt};

/// Spawns a command, captures its stdout and stderr.
/// Both streams are read concurrently and interleaved line by line into a
/// single string, in the order the lines arrive.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 两个输出流被并发读取，并按到达顺序逐行交错合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<ExitStatus>, String) {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other("failed to capture child output")),
            String::new(),
        );
    };

    let stdout_lines = SplitStream::new(BufReader::new(stdout).split(b'\n'));
    let stderr_lines = SplitStream::new(BufReader::new(stderr).split(b'\n'));
    let mut merged = stdout_lines.merge(stderr_lines);

    let mut output = String::new();
    while let Some(line) = merged.next().await {
        match line {
            Ok(bytes) => {
                // Invalid UTF-8 is kept with replacement characters.
                let line = String::from_utf8_lossy(&bytes);
                output.push_str(line.strip_suffix('\r').unwrap_or(&*line));
                output.push('\n');
            }
            // A failed read carries no output.
            Err(_) => continue,
        }
    }

    (child.wait().await, output)
}

/// A configured command line, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// A leading `-` in the configuration: the exit status is ignored.
    /// 配置中以 `-` 开头：忽略退出状态。
    pub ignore_exit: bool,
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// The command as it will be shown in logs, re-quoted where needed.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shlex::try_quote(part).map(|q| q.into_owned()).unwrap_or_else(|_| part.clone()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Replaces `{name}` placeholders. Unknown placeholders are left untouched so
/// literal braces (e.g. in `python -c` snippets) survive.
///
/// 替换 `{name}` 占位符。未知占位符保持不变，以便字面花括号（例如 `python -c` 代码片段中）得以保留。
pub fn substitute(line: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if vars.contains_key(&after[..end]) => {
                out.push_str(&vars[&after[..end]]);
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

const POSARGS: &str = "posargs";

/// A stand-in for a placeholder that survives `$VAR` expansion and shell splitting.
fn marker(name: &str) -> String {
    format!("\u{1}{name}\u{1}")
}

/// Turns a configured line into a `CommandLine`: strips the ignore marker,
/// expands `$VAR` against `env`, splits with shell quoting rules, then fills
/// in the placeholders. A placeholder value never adds or splits words, and a
/// standalone `{posargs}` becomes the user arguments as separate words.
///
/// 将配置的行转换为 `CommandLine`：去掉忽略标记，根据 `env` 展开 `$VAR`，
/// 按 shell 引号规则拆分，最后填入占位符。占位符的值不会增加或拆分参数。
pub fn parse_command_line(
    line: &str,
    vars: &BTreeMap<&str, String>,
    posargs: &[String],
    env: &BTreeMap<String, String>,
) -> Result<CommandLine> {
    let trimmed = line.trim();
    let (ignore_exit, body) = match trimmed.strip_prefix('-') {
        Some(rest) if rest.starts_with(char::is_whitespace) || rest.is_empty() => {
            (true, rest.trim_start())
        }
        _ => (false, trimmed),
    };

    // Placeholders go in as markers and are resolved after splitting, so
    // values containing whitespace or quotes stay inside their word.
    let markers: BTreeMap<&str, String> = vars
        .keys()
        .copied()
        .chain(std::iter::once(POSARGS))
        .map(|name| (name, marker(name)))
        .collect();
    let substituted = substitute(body, &markers);
    let expanded = shellexpand::env_with_context_no_errors(&substituted, |name: &str| env.get(name));

    let words = shlex::split(&expanded)
        .ok_or_else(|| anyhow!("Failed to parse command: {}", expanded))?;

    let posargs_marker = marker(POSARGS);
    let joined_posargs = posargs.join(" ");
    let mut argv = Vec::with_capacity(words.len() + posargs.len());
    for word in words {
        if word == posargs_marker {
            argv.extend(posargs.iter().cloned());
            continue;
        }
        let mut word = word.replace(&posargs_marker, &joined_posargs);
        for (name, value) in vars {
            word = word.replace(&marker(name), value);
        }
        argv.push(word);
    }

    let mut argv = argv.into_iter();
    let program = argv
        .next()
        .ok_or_else(|| anyhow!("Empty command after parsing: '{}'", line))?;

    Ok(CommandLine {
        ignore_exit,
        program,
        args: argv.collect(),
    })
}
