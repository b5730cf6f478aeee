//! # Models Module Unit Tests / Models 模块单元测试
//!
//! Tests for environment results, their classification and tallies.
//!
//! 测试环境结果及其分类和计数。

use env_matrix::core::models::{EnvResult, Environment, FailureReason, SkipReason, Tally};
use std::time::Duration;

fn passed(name: &str, attempts: u8) -> EnvResult {
    EnvResult::Passed {
        env: Environment::new(name),
        output: "ok".to_string(),
        duration: Duration::from_secs(3),
        attempts,
    }
}

fn failed(name: &str, reason: FailureReason, ignore_outcome: bool) -> EnvResult {
    EnvResult::Failed {
        env: Environment::new(name),
        output: "boom".to_string(),
        reason,
        duration: Duration::from_millis(1500),
        ignore_outcome,
    }
}

fn skipped(name: &str) -> EnvResult {
    EnvResult::Skipped {
        env: Environment::new(name),
        reason: SkipReason::MissingInterpreter("python3.8".to_string()),
    }
}

#[test]
fn test_environment_factors() {
    let env = Environment::new("py38-django2x-jwt1x");
    assert_eq!(env.factors, vec!["py38", "django2x", "jwt1x"]);
    assert_eq!(env.to_string(), "py38-django2x-jwt1x");
}

#[test]
fn test_failure_classification() {
    let unexpected = failed("py39", FailureReason::Commands, false);
    assert!(unexpected.is_failure());
    assert!(unexpected.is_unexpected_failure());
    assert!(!unexpected.is_allowed_failure());

    let allowed = failed("py39", FailureReason::Commands, true);
    assert!(allowed.is_failure());
    assert!(!allowed.is_unexpected_failure());
    assert!(allowed.is_allowed_failure());

    assert!(!skipped("py38").is_failure());
    assert!(skipped("py38").is_skipped());
    assert!(!passed("py311", 1).is_skipped());
    assert!(!passed("py311", 1).is_unexpected_failure());
}

#[test]
fn test_status_classes() {
    assert_eq!(passed("a", 1).status_class(), "status-passed");
    assert_eq!(failed("a", FailureReason::Commands, false).status_class(), "status-failed");
    assert_eq!(failed("a", FailureReason::Timeout, false).status_class(), "status-timeout");
    assert_eq!(failed("a", FailureReason::Timeout, true).status_class(), "status-allowed-failure");
    assert_eq!(skipped("a").status_class(), "status-skipped");
}

#[test]
fn test_localized_strings() {
    assert_eq!(passed("a", 1).status_str("en"), "Passed");
    assert_eq!(skipped("a").status_str("zh-CN"), "跳过");
    assert_eq!(skipped("a").detail_str("en"), "interpreter python3.8 not found");
    assert_eq!(
        failed("a", FailureReason::DepsInstall, false).detail_str("en"),
        "dependency installation failed"
    );
    assert!(passed("a", 1).detail_str("en").is_empty());
}

#[test]
fn test_accessors() {
    let p = passed("py311", 2);
    assert_eq!(p.env_name(), "py311");
    assert_eq!(p.attempts(), 2);
    assert_eq!(p.duration(), Some(Duration::from_secs(3)));
    assert_eq!(p.output(), "ok");

    let s = skipped("py38");
    assert_eq!(s.duration(), None);
    assert_eq!(s.output(), "");
    assert_eq!(s.attempts(), 0);

    assert!(failed("x", FailureReason::Timeout, false).is_timeout());
}

#[test]
fn test_provisioning_reasons() {
    assert!(FailureReason::InterpreterNotFound.is_provisioning());
    assert!(FailureReason::DepsInstall.is_provisioning());
    assert!(FailureReason::Package.is_provisioning());
    assert!(!FailureReason::Commands.is_provisioning());
    assert!(!FailureReason::Timeout.is_provisioning());
}

#[test]
fn test_tally() {
    let results = vec![
        passed("a", 1),
        passed("b", 1),
        failed("c", FailureReason::Commands, false),
        failed("d", FailureReason::Commands, true),
        skipped("e"),
    ];
    let tally = Tally::from_results(&results);
    assert_eq!(tally.total, 5);
    assert_eq!(tally.passed, 2);
    assert_eq!(tally.failed, 1);
    assert_eq!(tally.allowed_failures, 1);
    assert_eq!(tally.skipped, 1);
}
