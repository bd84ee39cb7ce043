//! Operational configuration: TOML-file settings loaded through
//! [`ConfigManager`]. Sensitive values live in [`secrets`] instead.

pub mod manager;
pub mod secrets;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use manager::ConfigManager;
pub use secrets::SecretsLoader;

use crate::models::TargetHost;
use crate::suppressor::{CascadePair, SuppressorConfig};
use crate::validator::{AllowlistEntry, SafePipe, ValidatorConfig};

/// Top-level configuration, assembled from `main.toml` plus every per-host
/// file under the same directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_address: String,
    pub bind_port: u16,
    pub database_path: String,
    pub monitoring_url: String,
    pub log_aggregator_url: String,
    pub llm_base_url: String,
    #[serde(default)]
    pub llm_model: String,

    pub signature_labels: Vec<String>,
    pub attempt_window_seconds: u64,
    pub escalation_cooldown_seconds: u64,
    pub dedup_cooldown_seconds: u64,
    pub verification_deadline_seconds: u64,
    #[serde(default)]
    pub max_attempts_overrides: HashMap<String, u32>,

    #[serde(default)]
    pub self_identities: Vec<String>,
    #[serde(default)]
    pub blocklist_patterns: Vec<String>,
    #[serde(default)]
    pub safe_pipes: Vec<SafePipeConfig>,
    #[serde(default)]
    pub allowlist: Vec<AllowlistEntryConfig>,

    #[serde(default)]
    pub cascade_pairs: Vec<CascadePairConfig>,
    #[serde(default)]
    pub dependency_map: HashMap<String, Vec<String>>,

    /// Populated from per-host files discovered alongside `main.toml`; never
    /// present in `main.toml` itself.
    #[serde(skip)]
    pub hosts: HashMap<String, TargetHost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafePipeConfig {
    pub left_head: String,
    pub right_head: String,
}

impl From<SafePipeConfig> for SafePipe {
    fn from(c: SafePipeConfig) -> Self {
        SafePipe { left_head: c.left_head, right_head: c.right_head }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistEntryConfig {
    pub head: String,
    #[serde(default)]
    pub allowed_flags: Vec<String>,
    #[serde(default)]
    pub diagnostic: bool,
}

impl From<AllowlistEntryConfig> for AllowlistEntry {
    fn from(c: AllowlistEntryConfig) -> Self {
        AllowlistEntry { head: c.head, allowed_flags: c.allowed_flags, diagnostic: c.diagnostic }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadePairConfig {
    pub a: String,
    pub b: String,
    pub root: String,
}

impl From<CascadePairConfig> for CascadePair {
    fn from(c: CascadePairConfig) -> Self {
        CascadePair { a: c.a, b: c.b, root: c.root }
    }
}

/// One `config/<host>.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfigFile {
    pub host: TargetHost,
}

impl Config {
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            self_identities: self.self_identities.clone(),
            blocklist_patterns: self.blocklist_patterns.clone(),
            safe_pipes: self.safe_pipes.iter().cloned().map(Into::into).collect(),
            allowlist: self.allowlist.iter().cloned().map(Into::into).collect(),
        }
    }

    pub fn suppressor_config(&self) -> SuppressorConfig {
        SuppressorConfig {
            cascade_pairs: self.cascade_pairs.iter().cloned().map(Into::into).collect(),
            dependency_map: self.dependency_map.clone(),
        }
    }

    pub fn host_list(&self) -> Vec<TargetHost> {
        self.hosts.values().cloned().collect()
    }
}
