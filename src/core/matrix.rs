//! # Matrix Expansion Module / 矩阵展开模块
//!
//! Turns envlist entries such as `py{38,39}-django{111,2x}` into the concrete
//! environments they denote. Each brace group is one axis of the matrix and the
//! result is the Cartesian product of all axes, in declaration order.
//!
//! 将诸如 `py{38,39}-django{111,2x}` 的 envlist 条目转换为其表示的具体环境。
//! 每个花括号组是矩阵的一个轴，结果是所有轴按声明顺序的笛卡尔积。

use std::collections::HashSet;
use thiserror::Error;

use crate::core::models::Environment;

/// Errors raised while expanding envlist patterns or factor conditions.
/// 展开 envlist 模式或 factor 条件时产生的错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("envlist is empty: at least one environment must be declared")]
    EmptyEnvlist,
    #[error("empty pattern in envlist entry '{0}'")]
    EmptyPattern(String),
    #[error("unbalanced brace in pattern '{pattern}' at byte {position}")]
    UnbalancedBrace { pattern: String, position: usize },
    #[error("nested braces are not supported in pattern '{0}'")]
    NestedBrace(String),
    #[error("empty brace group '{{}}' in pattern '{0}'")]
    EmptyGroup(String),
    #[error("invalid factor condition '{0}'")]
    InvalidCondition(String),
}

/// One piece of a parsed pattern: literal text or a group of alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(Vec<String>),
}

/// Computes the Cartesian product of ordered axes.
/// The first axis varies slowest. An empty list of axes yields a single empty
/// tuple; any empty axis yields no tuples.
///
/// 计算有序轴的笛卡尔积。
/// 第一个轴变化最慢。空轴列表产生一个空元组；任何空轴都不产生元组。
pub fn cartesian_product<T: Clone>(axes: &[Vec<T>]) -> Vec<Vec<T>> {
    axes.iter().fold(vec![Vec::new()], |acc, axis| {
        acc.iter()
            .flat_map(|prefix| {
                axis.iter().map(move |value| {
                    let mut tuple = prefix.clone();
                    tuple.push(value.clone());
                    tuple
                })
            })
            .collect()
    })
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, MatrixError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut body = String::new();
    // Byte offset of the currently open brace, if any.
    let mut open: Option<usize> = None;

    for (pos, c) in pattern.char_indices() {
        match (c, open) {
            ('{', None) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                open = Some(pos);
            }
            ('{', Some(_)) => return Err(MatrixError::NestedBrace(pattern.to_string())),
            ('}', None) => {
                return Err(MatrixError::UnbalancedBrace {
                    pattern: pattern.to_string(),
                    position: pos,
                });
            }
            ('}', Some(_)) => {
                open = None;
                let group = std::mem::take(&mut body);
                if group.trim().is_empty() {
                    return Err(MatrixError::EmptyGroup(pattern.to_string()));
                }
                let alternatives = group.split(',').map(|a| a.trim().to_string()).collect();
                segments.push(Segment::Group(alternatives));
            }
            (c, Some(_)) => body.push(c),
            (c, None) => literal.push(c),
        }
    }

    if let Some(position) = open {
        return Err(MatrixError::UnbalancedBrace {
            pattern: pattern.to_string(),
            position,
        });
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Expands a single brace pattern into the names it denotes.
///
/// ```
/// use env_matrix::core::matrix::expand_pattern;
///
/// let names = expand_pattern("py{38,39}-jwt{1x,2x}").unwrap();
/// assert_eq!(names, ["py38-jwt1x", "py38-jwt2x", "py39-jwt1x", "py39-jwt2x"]);
/// ```
pub fn expand_pattern(pattern: &str) -> Result<Vec<String>, MatrixError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(MatrixError::EmptyPattern(pattern.to_string()));
    }

    let axes: Vec<Vec<String>> = parse_pattern(trimmed)?
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(text) => vec![text],
            Segment::Group(alternatives) => alternatives,
        })
        .collect();

    Ok(cartesian_product(&axes)
        .into_iter()
        .map(|parts| parts.concat())
        .collect())
}

/// Splits an envlist entry on commas that are not inside a brace group.
/// 按不在花括号组内的逗号拆分 envlist 条目。
pub fn split_top_level(entry: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, c) in entry.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&entry[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&entry[start..]);
    parts
}

/// Expands every envlist entry into environments.
/// Entries may hold several comma-separated patterns. Duplicates are dropped,
/// keeping the first occurrence, so the declared order is preserved.
///
/// 将每个 envlist 条目展开为环境。
/// 条目可以包含多个以逗号分隔的模式。重复项会被丢弃（保留第一次出现），
/// 从而保持声明顺序。
pub fn expand_envlist<S: AsRef<str>>(entries: &[S]) -> Result<Vec<Environment>, MatrixError> {
    let mut seen = HashSet::new();
    let mut envs = Vec::new();

    for entry in entries {
        for pattern in split_top_level(entry.as_ref()) {
            if pattern.trim().is_empty() {
                continue;
            }
            for name in expand_pattern(pattern)? {
                if seen.insert(name.clone()) {
                    envs.push(Environment::new(name));
                }
            }
        }
    }

    if envs.is_empty() {
        return Err(MatrixError::EmptyEnvlist);
    }
    Ok(envs)
}
