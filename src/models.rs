//! Core data model: the entities every component reads or writes.
//!
//! One struct per entity, grouped by the logical identifier named in the
//! data model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Firing or resolved state of an [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// Immutable envelope of one firing/resolved notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alertname: String,
    pub instance: String,
    pub severity: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: AlertStatus,
    pub fingerprint: String,
}

impl Alert {
    /// Deterministic fingerprint used when the upstream notifier omits one.
    pub fn synthesize_fingerprint(alertname: &str, instance: &str, starts_at: DateTime<Utc>) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        alertname.hash(&mut hasher);
        instance.hash(&mut hasher);
        starts_at.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn key(&self) -> (String, String) {
        (self.alertname.clone(), self.instance.clone())
    }
}

/// Logical identity of an execution target, as loaded from host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetHost {
    pub name: String,
    pub address: String,
    pub login: String,
    pub key_path: String,
    pub localhost: bool,
}

/// Reachability state tracked by the Host Monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    Online,
    Flaky,
    Offline,
    Unknown,
}

impl Default for HostState {
    fn default() -> Self {
        HostState::Unknown
    }
}

/// Last-observed reachability of a [`TargetHost`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostStatus {
    pub host: String,
    pub state: HostState,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// When the current unbroken run of failures began; reset whenever a
    /// success is reported or the gap since the last failure exceeds the
    /// offline escalation window.
    pub failure_streak_started_at: Option<DateTime<Utc>>,
}

impl HostStatus {
    pub fn unknown(host: impl Into<String>) -> Self {
        HostStatus {
            host: host.into(),
            state: HostState::Unknown,
            last_success_at: None,
            last_failure_at: None,
            consecutive_failures: 0,
            failure_streak_started_at: None,
        }
    }

    /// `true` for online/unknown, `true` with a caveat for flaky, `false` for offline.
    pub fn is_available(&self) -> bool {
        !matches!(self.state, HostState::Offline)
    }
}

/// One remediation episode against one alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub alert_fingerprint: String,
    pub alertname: String,
    pub instance: String,
    pub attempt_number: u32,
    pub severity: String,
    pub analysis_text: String,
    pub commands_executed: Vec<String>,
    pub exit_codes: Vec<i32>,
    /// `false` when every executed command was diagnostic-only; diagnostic
    /// attempts do not consume the alert's attempt budget.
    pub actionable: bool,
    pub success: bool,
    pub escalated: bool,
    pub error: Option<String>,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
    pub investigation_steps: serde_json::Value,
}

/// A learned solution keyed by `(alertname, symptom_fingerprint)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub alertname: String,
    pub symptom_fingerprint: String,
    pub commands: Vec<String>,
    pub success_count: u64,
    pub failure_count: u64,
    pub confidence_score: f64,
    pub last_used_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Pattern {
    /// `confidence = (success / (success + failure)) * exp(-age_days / 30)`, clamped to [0, 1].
    pub fn recompute_confidence(&mut self, now: DateTime<Utc>) {
        let total = self.success_count + self.failure_count;
        let ratio = if total == 0 {
            0.0
        } else {
            self.success_count as f64 / total as f64
        };
        let age_days = (now - self.last_used_at).num_seconds() as f64 / 86_400.0;
        let recency_decay = (-age_days.max(0.0) / crate::constants::learning::CONFIDENCE_DECAY_DAYS).exp();
        self.confidence_score = (ratio * recency_decay).clamp(0.0, 1.0);
    }
}

/// A command sequence known to have failed for an alertname; avoided on future matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePattern {
    pub alertname: String,
    pub pattern_signature: String,
    pub commands_attempted: Vec<String>,
    pub failure_reason: String,
    pub failure_count: u64,
    pub last_failed_at: DateTime<Utc>,
}

/// Last time a fingerprint was admitted to processing; used for dedup cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub fingerprint: String,
    pub admitted_at: DateTime<Utc>,
}

/// Timestamp of last escalation for `(alertname, instance)`; cleared on resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationCooldown {
    pub alertname: String,
    pub instance: String,
    pub escalated_at: DateTime<Utc>,
}

/// A declared maintenance window; `host = None` means global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: Uuid,
    pub host: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub created_by: String,
    pub is_active: bool,
}

/// Pre-change observation of a container or service, used for rollback decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub snapshot_id: Uuid,
    pub host: String,
    pub service_name: String,
    pub inspect: serde_json::Value,
    pub recent_logs: Vec<String>,
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_synthesis_is_deterministic() {
        let ts = Utc::now();
        let a = Alert::synthesize_fingerprint("ContainerDown", "nexus:9323", ts);
        let b = Alert::synthesize_fingerprint("ContainerDown", "nexus:9323", ts);
        assert_eq!(a, b);
    }

    #[test]
    fn confidence_never_decreases_on_repeated_success_at_same_instant() {
        let now = Utc::now();
        let mut p = Pattern {
            alertname: "ContainerDown".into(),
            symptom_fingerprint: "ContainerDown|host:nexus".into(),
            commands: vec!["docker restart nginx".into()],
            success_count: 5,
            failure_count: 0,
            confidence_score: 0.0,
            last_used_at: now,
            metadata: serde_json::Value::Null,
            created_at: now,
        };
        p.recompute_confidence(now);
        let first = p.confidence_score;
        p.success_count += 1;
        p.last_used_at = now;
        p.recompute_confidence(now);
        assert!(p.confidence_score >= first);
    }

    #[test]
    fn host_offline_is_unavailable() {
        let mut status = HostStatus::unknown("outpost");
        status.state = HostState::Offline;
        assert!(!status.is_available());
        status.state = HostState::Flaky;
        assert!(status.is_available());
    }
}
