//! Narrow interface contracts injected into the Orchestrator.
//!
//! The original system wires Orchestrator, Learning Engine, Persistent Store
//! and Notifier in a cycle. Each of these traits cuts one edge of that cycle
//! so every component can be driven and tested with an in-memory double
//! instead of the real `sqlx`/`reqwest`/`async_ssh2_tokio` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::errors::RemediatorError;
use crate::models::{
    Attempt, EscalationCooldown, FailurePattern, FingerprintEntry, HostStatus, MaintenanceWindow, Pattern,
    StateSnapshot,
};

pub type Result<T> = std::result::Result<T, RemediatorError>;

/// Durable attempt accounting, fingerprint cooldown, escalation cooldown,
/// and maintenance windows. Implemented once against `sqlx` (`database::Store`)
/// and once as an in-memory double for tests.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn append_attempt(&self, attempt: &Attempt) -> Result<()>;

    async fn count_actionable_attempts(
        &self,
        alertname: &str,
        instance: &str,
        window: Duration,
    ) -> Result<u32>;

    /// Admits `fingerprint` unless it was admitted within `cooldown`. Returns
    /// `(admitted, prior_timestamp)`. Must be implemented as a single
    /// conditional upsert so concurrent callers never both observe `true`.
    async fn admit_fingerprint(
        &self,
        fingerprint: &str,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> Result<(bool, Option<DateTime<Utc>>)>;

    async fn set_escalation_cooldown(&self, alertname: &str, instance: &str, now: DateTime<Utc>) -> Result<()>;
    async fn get_escalation_cooldown(&self, alertname: &str, instance: &str) -> Result<Option<EscalationCooldown>>;
    async fn clear_escalation_cooldown(&self, alertname: &str, instance: &str) -> Result<()>;

    async fn start_maintenance(&self, window: &MaintenanceWindow) -> Result<()>;
    async fn end_maintenance(&self, id: uuid::Uuid, ended_at: DateTime<Utc>) -> Result<()>;
    async fn list_active_maintenance(&self) -> Result<Vec<MaintenanceWindow>>;
    async fn is_suppressed(&self, host: &str, now: DateTime<Utc>) -> Result<(bool, Option<String>)>;

    async fn insert_snapshot(&self, snapshot: &StateSnapshot) -> Result<()>;
    async fn get_snapshot(&self, id: uuid::Uuid) -> Result<Option<StateSnapshot>>;

    async fn recent_attempts(&self, limit: u32) -> Result<Vec<Attempt>>;
}

/// Pattern and failure-pattern persistence, with conditional-upsert semantics
/// for idempotent concurrent inserts.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn find_pattern(&self, alertname: &str, symptom_fingerprint: &str) -> Result<Option<Pattern>>;
    async fn recent_patterns_for_alertname(&self, alertname: &str, limit: u32) -> Result<Vec<Pattern>>;
    async fn upsert_pattern_success(
        &self,
        alertname: &str,
        symptom_fingerprint: &str,
        commands: &[String],
        now: DateTime<Utc>,
    ) -> Result<Pattern>;
    async fn record_failure(
        &self,
        alertname: &str,
        symptom_fingerprint: &str,
        commands: &[String],
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;
    async fn find_failure_pattern(&self, alertname: &str, pattern_signature: &str) -> Result<Option<FailurePattern>>;
}

/// Monitoring system: instant/range queries, active-alert listing, and
/// resolution verification.
#[async_trait]
pub trait Monitoring: Send + Sync {
    async fn query_instant(&self, expr: &str) -> Result<serde_json::Value>;
    async fn query_range(&self, expr: &str, start: DateTime<Utc>, end: DateTime<Utc>, step_s: u64) -> Result<serde_json::Value>;
    async fn active_alerts(&self) -> Result<Vec<ActiveAlert>>;
    async fn verify_resolution(
        &self,
        alertname: &str,
        instance: &str,
        deadline: std::time::Duration,
        poll: std::time::Duration,
    ) -> Result<(bool, String)>;
    async fn trend(&self, metric: &str, instance: &str, window_h: u64) -> Result<Trend>;
    async fn predict_exhaustion(&self, metric: &str, instance: &str, threshold: f64) -> Result<ExhaustionPrediction>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActiveAlert {
    pub alertname: String,
    pub instance: String,
    pub state: String,
    pub labels: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Trend {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub slope: f64,
    pub direction: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExhaustionPrediction {
    pub prediction: String,
    pub hours_remaining: Option<f64>,
}

/// Log aggregator search.
#[async_trait]
pub trait LogSearch: Send + Sync {
    async fn query(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<LogLine>>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogLine {
    pub ts: DateTime<Utc>,
    pub message: String,
    pub labels: std::collections::HashMap<String, String>,
}

/// Pooled, per-host command execution.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, host: &str, command: &str, timeout: std::time::Duration) -> Result<ExecOutcome>;
    async fn close_all(&self);
}

#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Outbound notification delivery. Implementations must never block the
/// pipeline: retry at most once, then drop.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: String,
    pub dedup_key: String,
}
