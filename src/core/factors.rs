//! # Factor Conditions Module / Factor 条件模块
//!
//! Settings lines (`deps`, `commands`, `setenv` values) may be restricted to
//! environments carrying certain factors:
//!
//! ```text
//! django2x: Django>=2.0,<3.0        only environments with the `django2x` factor
//! py38,py39: backports.zoneinfo     either factor (OR)
//! py311-jwt2x: cryptography         both factors (AND)
//! !py38: typing-extensions          every environment without `py38`
//! django{3x,4x}: asgiref            brace groups expand to alternatives
//! ```
//!
//! 设置行（`deps`、`commands`、`setenv` 值）可以被限制为仅适用于带有特定 factor 的环境。

use crate::core::matrix::{expand_pattern, split_top_level, MatrixError};

/// A single factor test, possibly negated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorTerm {
    pub factor: String,
    pub negated: bool,
}

/// An OR of alternatives, each an AND of factor terms.
/// 由多个备选项组成的“或”，每个备选项是若干 factor 项的“与”。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub alternatives: Vec<Vec<FactorTerm>>,
}

impl Condition {
    /// Parses a condition prefix such as `py38,py39-!jwt1x`.
    pub fn parse(text: &str) -> Result<Self, MatrixError> {
        let mut alternatives = Vec::new();
        for raw in split_top_level(text) {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(MatrixError::InvalidCondition(text.to_string()));
            }
            for expanded in expand_pattern(raw)? {
                let terms = expanded
                    .split('-')
                    .map(|part| {
                        let (negated, factor) = match part.strip_prefix('!') {
                            Some(rest) => (true, rest),
                            None => (false, part),
                        };
                        if factor.is_empty() {
                            Err(MatrixError::InvalidCondition(text.to_string()))
                        } else {
                            Ok(FactorTerm {
                                factor: factor.to_string(),
                                negated,
                            })
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                alternatives.push(terms);
            }
        }
        Ok(Self { alternatives })
    }

    /// Returns `true` if any alternative is satisfied by the given factors.
    pub fn matches<S: AsRef<str>>(&self, factors: &[S]) -> bool {
        self.alternatives.iter().any(|terms| {
            terms.iter().all(|term| {
                let present = factors.iter().any(|f| f.as_ref() == term.factor);
                present != term.negated
            })
        })
    }
}

/// A settings line split into its optional condition and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalLine<'a> {
    pub condition: Option<&'a str>,
    pub value: &'a str,
}

fn is_condition_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '!' | ',' | '{' | '}' | '-')
}

/// Splits `cond: value` lines. A prefix only counts as a condition when it is
/// made of factor characters and the colon is followed by whitespace, so
/// `git+https://...` or `Django>=2.0` stay unconditional.
///
/// 拆分 `cond: value` 行。只有当前缀由 factor 字符组成且冒号后跟空白时，
/// 才视为条件，因此 `git+https://...` 或 `Django>=2.0` 仍为无条件行。
pub fn split_condition(line: &str) -> ConditionalLine<'_> {
    let trimmed = line.trim();
    if let Some(colon) = trimmed.find(':') {
        let (prefix, rest) = trimmed.split_at(colon);
        let after = &rest[1..];
        let followed_by_space = after.starts_with(char::is_whitespace);
        if !prefix.is_empty() && followed_by_space && prefix.chars().all(is_condition_char) {
            return ConditionalLine {
                condition: Some(prefix),
                value: after.trim(),
            };
        }
    }
    ConditionalLine {
        condition: None,
        value: trimmed,
    }
}

/// Keeps the lines that apply to an environment with the given factors, with
/// their condition prefixes removed. Blank results are dropped.
///
/// 保留适用于具有给定 factors 的环境的行，并移除其条件前缀。空结果会被丢弃。
pub fn select_lines<S: AsRef<str>>(
    lines: &[String],
    factors: &[S],
) -> Result<Vec<String>, MatrixError> {
    let mut selected = Vec::new();
    for line in lines {
        let parsed = split_condition(line);
        let applies = match parsed.condition {
            Some(cond) => Condition::parse(cond)?.matches(factors),
            None => true,
        };
        if applies && !parsed.value.is_empty() {
            selected.push(parsed.value.to_string());
        }
    }
    Ok(selected)
}

/// Evaluates a single condition-prefixed string value (used by `setenv`).
/// Returns `None` when the condition does not apply.
pub fn select_value<S: AsRef<str>>(
    value: &str,
    factors: &[S],
) -> Result<Option<String>, MatrixError> {
    let parsed = split_condition(value);
    match parsed.condition {
        Some(cond) if !Condition::parse(cond)?.matches(factors) => Ok(None),
        _ => Ok(Some(parsed.value.to_string())),
    }
}
