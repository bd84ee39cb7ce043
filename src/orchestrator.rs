//! Remediation Orchestrator: the per-alert state machine tying every other
//! component together. One call to [`Orchestrator::handle_alert`] drives one
//! admitted alert from `Received` through to a terminal state, holding the
//! per-`(alertname, instance)` lease for its entire duration via a keyed
//! `tokio::sync::Mutex` registry, since the lease guards a whole pipeline
//! rather than one call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, instrument, warn};

use crate::agent::types::AgentError;
use crate::agent::{Hint, ReasoningAgent, Verdict};
use crate::clock::{Clock, RandomSource};
use crate::constants::{monitoring as monitoring_consts, orchestrator as orchestrator_consts, store as store_consts};
use crate::errors::RemediatorError;
use crate::learning::{LearningEngine, LookupTier};
use crate::models::{Alert, AlertStatus, Attempt, StateSnapshot, TargetHost};
use crate::suppressor::{Suppressor, SuppressionVerdict};
use crate::traits::{AttemptStore, Executor, Monitoring, Notification, Notifier};
use crate::validator::{Decision, ValidationContext, Validator};
use crate::host_monitor::HostMonitor;

/// Terminal or informational outcome of one `handle_alert` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Deduplicated,
    Queued,
    SuppressedMaintenance { reason: Option<String> },
    SuppressedByCascade { root: String },
    HostOffline { host: String },
    ClearCooldowns,
    Succeeded { attempts: u32 },
    Failed { attempts: u32, reason: String },
    Escalated { reason: String, attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Alert labels used to build the Learning Engine's symptom fingerprint.
    pub signature_labels: Vec<String>,
    /// Per-alertname override of the actionable-attempt budget; falls back
    /// to `orchestrator::DEFAULT_MAX_ATTEMPTS`.
    pub max_attempts_overrides: HashMap<String, u32>,
    pub attempt_window: Duration,
    pub escalation_cooldown: Duration,
    pub dedup_cooldown: Duration,
    pub verification_deadline: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            signature_labels: vec!["host".to_string()],
            max_attempts_overrides: HashMap::new(),
            attempt_window: store_consts::DEFAULT_ATTEMPT_WINDOW,
            escalation_cooldown: store_consts::DEFAULT_ESCALATION_COOLDOWN,
            dedup_cooldown: store_consts::DEFAULT_DEDUP_COOLDOWN,
            verification_deadline: crate::constants::timeouts::VERIFICATION_DEADLINE,
        }
    }
}

impl OrchestratorConfig {
    fn max_attempts_for(&self, alertname: &str) -> u32 {
        self.max_attempts_overrides
            .get(alertname)
            .copied()
            .unwrap_or(orchestrator_consts::DEFAULT_MAX_ATTEMPTS)
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    hosts: HashMap<String, TargetHost>,
    attempt_store: Arc<dyn AttemptStore>,
    learning: Arc<LearningEngine>,
    suppressor: Arc<Suppressor>,
    host_monitor: Arc<HostMonitor>,
    validator: Arc<Validator>,
    executor: Arc<dyn Executor>,
    monitoring: Arc<dyn Monitoring>,
    agent: Arc<ReasoningAgent>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    key_locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
    /// Handoffs flagged for cancellation by the control surface. Consumed
    /// (one-shot) at the point just before commands are executed.
    cancelled: Mutex<std::collections::HashSet<(String, String)>>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        hosts: Vec<TargetHost>,
        attempt_store: Arc<dyn AttemptStore>,
        learning: Arc<LearningEngine>,
        suppressor: Arc<Suppressor>,
        host_monitor: Arc<HostMonitor>,
        validator: Arc<Validator>,
        executor: Arc<dyn Executor>,
        monitoring: Arc<dyn Monitoring>,
        agent: Arc<ReasoningAgent>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Orchestrator {
            config,
            hosts: hosts.into_iter().map(|h| (h.name.clone(), h)).collect(),
            attempt_store,
            learning,
            suppressor,
            host_monitor,
            validator,
            executor,
            monitoring,
            agent,
            notifier,
            clock,
            random,
            key_locks: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Flags a pending or in-flight handoff for cancellation. Checked (and
    /// consumed) just before the next command would be executed.
    pub async fn cancel(&self, alertname: &str, instance: &str) {
        self.cancelled.lock().await.insert((alertname.to_string(), instance.to_string()));
    }

    /// Clears both a pending cancellation flag and an escalation cooldown,
    /// so a self-initiated restart can resume normal handling.
    pub async fn resume(&self, alertname: &str, instance: &str) -> Result<(), RemediatorError> {
        self.cancelled.lock().await.remove(&(alertname.to_string(), instance.to_string()));
        self.attempt_store.clear_escalation_cooldown(alertname, instance).await
    }

    async fn lease(&self, alertname: &str, instance: &str) -> OwnedMutexGuard<()> {
        let key = (alertname.to_string(), instance.to_string());
        let mutex = {
            let mut locks = self.key_locks.lock().await;
            locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        mutex.lock_owned().await
    }

    fn resolve_host(&self, alert: &Alert) -> Option<&TargetHost> {
        if let Some(name) = alert.labels.get("host") {
            if let Some(host) = self.hosts.get(name) {
                return Some(host);
            }
        }
        let prefix = alert.instance.split(':').next().unwrap_or(&alert.instance);
        self.hosts.get(prefix)
    }

    #[instrument(skip(self, alert), fields(alertname = %alert.alertname, instance = %alert.instance, fingerprint = %alert.fingerprint))]
    pub async fn handle_alert(&self, alert: Alert) -> Outcome {
        if alert.status == AlertStatus::Resolved {
            return self.handle_resolved(&alert).await;
        }

        let _lease = self.lease(&alert.alertname, &alert.instance).await;
        let now = self.clock.now();

        match self
            .attempt_store
            .admit_fingerprint(&alert.fingerprint, self.config.dedup_cooldown, now)
            .await
        {
            Ok((admitted, _)) => {
                if !admitted {
                    info!("duplicate fingerprint within cooldown, skipping");
                    return Outcome::Deduplicated;
                }
            }
            Err(RemediatorError::StorageUnavailable(_)) => {
                warn!("persistent store unavailable during admission, enqueuing");
                return Outcome::Queued;
            }
            Err(err) => {
                error!(%err, "fingerprint admission failed unexpectedly");
                return Outcome::Failed { attempts: 0, reason: err.to_string() };
            }
        }

        let host = self.resolve_host(&alert).cloned();

        if let Some(host) = &host {
            match self.attempt_store.is_suppressed(&host.name, now).await {
                Ok((true, reason)) => return Outcome::SuppressedMaintenance { reason },
                Ok((false, _)) => {}
                Err(err) => warn!(%err, "maintenance lookup failed, proceeding without gating"),
            }
        }

        let currently_firing = self.currently_firing_alertnames(&alert.alertname).await;
        let suppression = self.suppressor.evaluate(&alert.alertname, &currently_firing).await;
        self.suppressor.record(&alert.alertname).await;
        match suppression {
            SuppressionVerdict::SuppressedByCascade { root } => return Outcome::SuppressedByCascade { root },
            SuppressionVerdict::SuppressedByDependency { dependency } => {
                return Outcome::SuppressedByCascade { root: dependency }
            }
            SuppressionVerdict::Proceed => {}
        }

        if let Some(host) = &host {
            if !self.host_monitor.is_available(&host.name).await {
                info!(host = %host.name, "host offline, skipping without counting an attempt");
                return Outcome::HostOffline { host: host.name.clone() };
            }
        }

        let max_attempts = self.config.max_attempts_for(&alert.alertname);
        let existing = self
            .attempt_store
            .count_actionable_attempts(&alert.alertname, &alert.instance, self.config.attempt_window)
            .await
            .unwrap_or(0);

        if existing >= max_attempts {
            if let Ok(Some(_)) = self.attempt_store.get_escalation_cooldown(&alert.alertname, &alert.instance).await {
                info!("already escalated within cooldown, suppressing duplicate escalation");
                return Outcome::Escalated { reason: "attempts exhausted (cooldown active)".into(), attempts: existing };
            }
            return self.escalate(&alert, "attempts exhausted before investigation", existing).await;
        }

        let Some(host) = host else {
            return self.escalate(&alert, "no configured host resolves this alert", existing).await;
        };

        self.run_episode(&alert, &host, existing, max_attempts).await
    }

    async fn handle_resolved(&self, alert: &Alert) -> Outcome {
        if let Err(err) = self.attempt_store.clear_escalation_cooldown(&alert.alertname, &alert.instance).await {
            warn!(%err, "failed to clear escalation cooldown on resolve");
        }
        let _ = self
            .notifier
            .notify(Notification {
                title: format!("{} resolved", alert.alertname),
                body: format!("{} on {} has resolved", alert.alertname, alert.instance),
                severity: "info".into(),
                dedup_key: alert.fingerprint.clone(),
            })
            .await;
        Outcome::ClearCooldowns
    }

    async fn currently_firing_alertnames(&self, exclude: &str) -> Vec<String> {
        match self.monitoring.active_alerts().await {
            Ok(alerts) => alerts
                .into_iter()
                .map(|a| a.alertname)
                .filter(|name| name != exclude)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn run_episode(&self, alert: &Alert, host: &TargetHost, existing_attempts: u32, max_attempts: u32) -> Outcome {
        let symptom_fp = LearningEngine::symptom_fingerprint(&alert.alertname, &alert.labels, &self.config.signature_labels);

        let tier = self.learning.lookup(&alert.alertname, &symptom_fp).await.unwrap_or(LookupTier::Tier2);

        let (commands, rationale, confidence, used_cache) = match tier {
            LookupTier::Tier0 { commands } => (commands, "cached pattern (tier 0)".to_string(), 1.0, true),
            LookupTier::Tier1 { hint_commands, similarity } => {
                match self
                    .agent
                    .investigate(alert, Some(Hint { commands: hint_commands, similarity }))
                    .await
                {
                    Ok(Verdict::ProposedAction { commands, rationale, confidence, .. }) => (commands, rationale, confidence, false),
                    Ok(Verdict::NoActionableFinding { reason }) => {
                        return self.record_failed_attempt(alert, host, existing_attempts, max_attempts, vec![], vec![], &reason, false).await;
                    }
                    Err(AgentError::BudgetExhausted) => {
                        return self.escalate(alert, "deadline", existing_attempts).await;
                    }
                    Err(err) => {
                        return self
                            .record_failed_attempt(alert, host, existing_attempts, max_attempts, vec![], vec![], &err.to_string(), false)
                            .await;
                    }
                }
            }
            LookupTier::Tier2 => match self.agent.investigate(alert, None).await {
                Ok(Verdict::ProposedAction { commands, rationale, confidence, .. }) => (commands, rationale, confidence, false),
                Ok(Verdict::NoActionableFinding { reason }) => {
                    return self.record_failed_attempt(alert, host, existing_attempts, max_attempts, vec![], vec![], &reason, false).await;
                }
                Err(AgentError::BudgetExhausted) => {
                    return self.escalate(alert, "deadline", existing_attempts).await;
                }
                Err(err) => {
                    return self
                        .record_failed_attempt(alert, host, existing_attempts, max_attempts, vec![], vec![], &err.to_string(), false)
                        .await;
                }
            },
        };

        let ctx = ValidationContext { host: &host.name, alertname: &alert.alertname };
        for command in &commands {
            if let Decision::Deny { reason, .. } = self.validator.validate(command, &ctx) {
                return self
                    .record_policy_deny(alert, host, existing_attempts, commands.clone(), &reason)
                    .await;
            }
        }

        if self.cancelled.lock().await.remove(&(alert.alertname.clone(), alert.instance.clone())) {
            return self.escalate(alert, "handoff cancelled before execution", existing_attempts).await;
        }

        self.capture_snapshot(host, alert).await;

        let started_at = self.clock.now();
        let mut exit_codes = Vec::with_capacity(commands.len());
        let mut all_succeeded = true;
        for command in &commands {
            match self.executor.execute(&host.name, command, crate::constants::ssh::COMMAND_TIMEOUT).await {
                Ok(outcome) => {
                    exit_codes.push(outcome.exit_code);
                    if outcome.exit_code != 0 {
                        all_succeeded = false;
                    }
                }
                Err(err) => {
                    warn!(%err, command, "command execution failed");
                    exit_codes.push(-1);
                    all_succeeded = false;
                }
            }
        }

        let verification = self
            .monitoring
            .verify_resolution(&alert.alertname, &alert.instance, self.config.verification_deadline, monitoring_consts::VERIFY_POLL_INTERVAL)
            .await;

        let duration_seconds = (self.clock.now() - started_at).num_milliseconds() as f64 / 1000.0;

        match verification {
            Ok((true, _)) if all_succeeded => {
                self.persist_attempt(alert, existing_attempts + 1, &rationale, commands.clone(), exit_codes, true, false, None, duration_seconds).await;
                self.learning.record_success(&alert.alertname, &symptom_fp, &commands).await.ok();
                let _ = self
                    .notifier
                    .notify(Notification {
                        title: format!("{} remediated", alert.alertname),
                        body: format!("confidence {:.2}, used_cache={}", confidence, used_cache),
                        severity: "info".into(),
                        dedup_key: alert.fingerprint.clone(),
                    })
                    .await;
                Outcome::Succeeded { attempts: existing_attempts + 1 }
            }
            Ok((false, reason)) => {
                self.learning.record_failure(&alert.alertname, &symptom_fp, &commands, &reason).await.ok();
                self.finish_failed_attempt(alert, existing_attempts, max_attempts, commands, exit_codes, &reason, duration_seconds).await
            }
            Err(err) => {
                // UnknownOutcome: counted for pacing, but no FailurePattern recorded.
                self.finish_failed_attempt(alert, existing_attempts, max_attempts, commands, exit_codes, &err.to_string(), duration_seconds).await
            }
        }
    }

    async fn capture_snapshot(&self, host: &TargetHost, alert: &Alert) {
        let command = format!("docker inspect {}", alert.labels.get("container").unwrap_or(&alert.alertname));
        match self.executor.execute(&host.name, &command, Duration::from_secs(5)).await {
            Ok(outcome) => {
                let snapshot = StateSnapshot {
                    snapshot_id: self.random.new_id(),
                    host: host.name.clone(),
                    service_name: alert.labels.get("container").cloned().unwrap_or_else(|| alert.alertname.clone()),
                    inspect: serde_json::Value::String(outcome.stdout),
                    recent_logs: Vec::new(),
                    taken_at: self.clock.now(),
                };
                if let Err(err) = self.attempt_store.insert_snapshot(&snapshot).await {
                    warn!(%err, "failed to persist pre-change snapshot");
                }
            }
            Err(err) => warn!(%err, "snapshot capture failed, proceeding without it"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_failed_attempt(
        &self,
        alert: &Alert,
        host: &TargetHost,
        existing_attempts: u32,
        max_attempts: u32,
        commands: Vec<String>,
        exit_codes: Vec<i32>,
        reason: &str,
        escalate_immediately: bool,
    ) -> Outcome {
        let _ = host;
        if escalate_immediately {
            return self.escalate(alert, reason, existing_attempts).await;
        }
        self.finish_failed_attempt(alert, existing_attempts, max_attempts, commands, exit_codes, reason, 0.0).await
    }

    async fn finish_failed_attempt(
        &self,
        alert: &Alert,
        existing_attempts: u32,
        max_attempts: u32,
        commands: Vec<String>,
        exit_codes: Vec<i32>,
        reason: &str,
        duration_seconds: f64,
    ) -> Outcome {
        let attempts = existing_attempts + 1;
        self.persist_attempt(alert, attempts, reason, commands, exit_codes, false, attempts >= max_attempts, Some(reason.to_string()), duration_seconds)
            .await;

        if attempts >= max_attempts {
            self.escalate(alert, reason, attempts).await
        } else {
            Outcome::Failed { attempts, reason: reason.to_string() }
        }
    }

    async fn record_policy_deny(&self, alert: &Alert, host: &TargetHost, existing_attempts: u32, commands: Vec<String>, reason: &str) -> Outcome {
        let _ = host;
        let attempts = existing_attempts + 1;
        let full_reason = format!("PolicyDeny: {}", reason);
        self.persist_attempt(alert, attempts, &full_reason, commands, vec![], false, true, Some(full_reason.clone()), 0.0).await;
        self.escalate(alert, &full_reason, attempts).await
    }

    async fn escalate(&self, alert: &Alert, reason: &str, attempts: u32) -> Outcome {
        if let Err(err) = self.attempt_store.set_escalation_cooldown(&alert.alertname, &alert.instance, self.clock.now()).await {
            warn!(%err, "failed to persist escalation cooldown");
        }
        let _ = self
            .notifier
            .notify(Notification {
                title: format!("{} escalated", alert.alertname),
                body: format!("instance={} attempts={} reason={}", alert.instance, attempts, reason),
                severity: "critical".into(),
                dedup_key: alert.fingerprint.clone(),
            })
            .await;
        Outcome::Escalated { reason: reason.to_string(), attempts }
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_attempt(
        &self,
        alert: &Alert,
        attempt_number: u32,
        analysis_text: &str,
        commands_executed: Vec<String>,
        exit_codes: Vec<i32>,
        success: bool,
        escalated: bool,
        error: Option<String>,
        duration_seconds: f64,
    ) {
        let actionable = commands_executed.iter().any(|c| !self.validator.is_diagnostic(c));
        let attempt = Attempt {
            id: self.random.new_id(),
            alert_fingerprint: alert.fingerprint.clone(),
            alertname: alert.alertname.clone(),
            instance: alert.instance.clone(),
            attempt_number,
            severity: alert.severity.clone(),
            analysis_text: analysis_text.to_string(),
            commands_executed,
            exit_codes,
            actionable,
            success,
            escalated,
            error,
            duration_seconds,
            timestamp: self.clock.now(),
            investigation_steps: serde_json::Value::Null,
        };
        if let Err(err) = self.attempt_store.append_attempt(&attempt).await {
            error!(%err, "failed to persist attempt record");
        }
    }
}
