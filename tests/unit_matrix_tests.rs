//! # Matrix Expansion Unit Tests / 矩阵展开单元测试
//!
//! Tests for brace expansion of envlist entries into concrete environments.
//!
//! 测试将 envlist 条目花括号展开为具体环境。

use env_matrix::core::matrix::{cartesian_product, expand_envlist, expand_pattern, split_top_level, MatrixError};
use std::collections::HashSet;

#[test]
fn test_full_django_jwt_matrix_has_32_unique_environments() {
    let envs = expand_envlist(&["py{38,39,310,311}-django{111,2x,3x,4x}-jwt{1x,2x}"]).unwrap();
    assert_eq!(envs.len(), 32);

    let names: HashSet<&str> = envs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names.len(), 32, "every combination must appear exactly once");

    assert_eq!(envs[0].name, "py38-django111-jwt1x");
    assert_eq!(envs[1].name, "py38-django111-jwt2x");
    assert_eq!(envs[31].name, "py311-django4x-jwt2x");

    for py in ["py38", "py39", "py310", "py311"] {
        for dj in ["django111", "django2x", "django3x", "django4x"] {
            for jwt in ["jwt1x", "jwt2x"] {
                let name = format!("{py}-{dj}-{jwt}");
                assert!(names.contains(name.as_str()), "missing {name}");
            }
        }
    }
}

#[test]
fn test_factors_follow_the_name() {
    let envs = expand_envlist(&["py{38,311}-django2x"]).unwrap();
    assert_eq!(envs[1].factors, vec!["py311".to_string(), "django2x".to_string()]);
    assert!(envs[1].has_factor("django2x"));
    assert!(!envs[1].has_factor("django"));
}

#[test]
fn test_plain_entries_and_commas() {
    let envs = expand_envlist(&["lint, docs", "py311"]).unwrap();
    let names: Vec<&str> = envs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["lint", "docs", "py311"]);
}

#[test]
fn test_duplicates_keep_first_occurrence() {
    let envs = expand_envlist(&["py{38,39}", "py38", "py{39,310}"]).unwrap();
    let names: Vec<&str> = envs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["py38", "py39", "py310"]);
}

#[test]
fn test_comma_inside_braces_is_not_a_separator() {
    assert_eq!(split_top_level("py{38,39}-a, lint"), vec!["py{38,39}-a", " lint"]);
}

#[test]
fn test_empty_alternative_in_group() {
    let names = expand_pattern("py311-django{,4x}").unwrap();
    assert_eq!(names, vec!["py311-django", "py311-django4x"]);
}

#[test]
fn test_single_alternative_group() {
    assert_eq!(expand_pattern("py{311}").unwrap(), vec!["py311"]);
}

#[test]
fn test_cartesian_product_counts() {
    let axes = vec![vec![1, 2, 3], vec![10, 20], vec![100]];
    let product = cartesian_product(&axes);
    assert_eq!(product.len(), 6);
    assert_eq!(product[0], vec![1, 10, 100]);
    assert_eq!(product[5], vec![3, 20, 100]);
}

#[test]
fn test_empty_envlist_is_rejected() {
    let entries: Vec<String> = vec![];
    assert!(matches!(expand_envlist(entries.as_slice()), Err(MatrixError::EmptyEnvlist)));
    assert!(matches!(expand_envlist(&["  ", ","]), Err(MatrixError::EmptyEnvlist)));
}

#[test]
fn test_unbalanced_braces_are_rejected() {
    assert!(matches!(
        expand_pattern("py{38,39"),
        Err(MatrixError::UnbalancedBrace { .. })
    ));
    assert!(matches!(
        expand_pattern("py38}"),
        Err(MatrixError::UnbalancedBrace { .. })
    ));
}

#[test]
fn test_nested_braces_are_rejected() {
    assert!(matches!(
        expand_pattern("py{3{8,9}}"),
        Err(MatrixError::NestedBrace(_))
    ));
}

#[test]
fn test_empty_group_is_rejected() {
    assert!(matches!(expand_pattern("py{}"), Err(MatrixError::EmptyGroup(_))));
}

#[test]
fn test_error_messages_name_the_pattern() {
    let err = expand_pattern("py{38,39").unwrap_err();
    assert!(err.to_string().contains("py{38,39"));
}
