//! Business Rule Tests: Command Validator
//!
//! Integration-level checks on configuration-driven validator behavior,
//! complementing the pure-function unit tests that live alongside
//! `validator.rs`.

mod common;

use common::fixtures::*;
use remediator::validator::{AllowlistEntry, Decision, Risk, SafePipe, ValidationContext, Validator, ValidatorConfig};

fn lab_config() -> ValidatorConfig {
    ValidatorConfig {
        self_identities: vec!["sentinel-remediator".into(), "remediator-core".into()],
        blocklist_patterns: vec!["rm -rf /*".into(), "mkfs*".into()],
        safe_pipes: vec![SafePipe { left_head: "docker".into(), right_head: "grep".into() }],
        allowlist: vec![
            AllowlistEntry { head: "docker".into(), allowed_flags: vec![], diagnostic: false },
            AllowlistEntry { head: "systemctl".into(), allowed_flags: vec!["--no-pager".into()], diagnostic: false },
            AllowlistEntry { head: "journalctl".into(), allowed_flags: vec![], diagnostic: true },
        ],
    }
}

fn ctx<'a>() -> ValidationContext<'a> {
    ValidationContext { host: hosts::NEXUS, alertname: alerts::CONTAINER_DOWN }
}

#[test]
fn test_glob_blocklist_pattern_denies_mkfs_variants() {
    let v = Validator::new(lab_config());
    let decision = v.validate("mkfs.ext4 /dev/sdb1", &ctx());
    assert!(matches!(decision, Decision::Deny { risk: Risk::High, .. }));
}

#[test]
fn test_allowlisted_flag_is_accepted() {
    let v = Validator::new(lab_config());
    let decision = v.validate("systemctl --no-pager restart nginx", &ctx());
    assert!(decision.is_allow());
}

#[test]
fn test_unlisted_flag_is_rejected() {
    let v = Validator::new(lab_config());
    let decision = v.validate("systemctl --force restart nginx", &ctx());
    assert!(matches!(decision, Decision::Deny { .. }));
}

#[test]
fn test_multiple_self_identities_are_all_protected() {
    let v = Validator::new(lab_config());
    assert!(matches!(v.validate("docker kill remediator-core", &ctx()), Decision::Deny { .. }));
    assert!(matches!(v.validate("docker kill sentinel-remediator", &ctx()), Decision::Deny { .. }));
}

#[test]
fn test_self_identity_mention_without_mutating_verb_is_not_blocked_by_identity_rule() {
    let v = Validator::new(lab_config());
    // "ps" isn't a mutating verb, so this falls through to allowlist evaluation
    // instead of being caught by the self-protection rule.
    let decision = v.validate("docker ps sentinel-remediator", &ctx());
    assert!(decision.is_allow());
}

#[test]
fn test_diagnostic_allowlist_entry_reports_none_risk() {
    let v = Validator::new(lab_config());
    let decision = v.validate("journalctl -u nginx", &ctx());
    assert_eq!(decision, Decision::Allow { risk: Risk::None });
}

#[test]
fn test_non_diagnostic_allowlist_entry_reports_low_risk() {
    let v = Validator::new(lab_config());
    let decision = v.validate("docker restart nginx", &ctx());
    assert_eq!(decision, Decision::Allow { risk: Risk::Low });
}
