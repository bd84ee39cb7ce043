//! Persistent Store: durable attempt accounting, pattern learning, fingerprint
//! dedup, escalation cooldowns, maintenance windows, and state snapshots,
//! backed by SQLite.
//!
//! A pool wrapped in a thin struct, a `new()` that connects then walks table
//! creation step by step with per-step logging, and a startup self-test,
//! plus a connect-retry loop: a degraded store should not take the whole
//! process down while alerts can still be queued.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use tracing::{error, info, warn};

use crate::constants::store as store_constants;
use crate::errors::{RemediatorError, StorageError};
use crate::models::{
    Attempt, EscalationCooldown, FailurePattern, FingerprintEntry, MaintenanceWindow, Pattern, StateSnapshot,
};
use crate::traits::{AttemptStore, PatternStore, Result};

pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Exposed for integration tests that want to assert on raw rows.
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        info!("starting persistent store initialization");
        info!(path = %database_path, "store database path");

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!(?parent, %e, "failed to create store parent directory");
                    return Err(RemediatorError::StorageUnavailable(StorageError::ConnectFailed(e.to_string())));
                }
            }
        }

        let pool = Self::connect_with_retry(database_path).await?;
        let store = Store { pool };

        info!("creating tables");
        store.initialize_tables().await?;

        info!("cleaning up stuck maintenance windows from a prior run");
        match store.cleanup_stuck_maintenance().await {
            Ok(n) if n > 0 => warn!(count = n, "closed stuck maintenance windows on startup"),
            Ok(_) => info!("no stuck maintenance windows found"),
            Err(e) => warn!(%e, "maintenance cleanup failed, continuing startup anyway"),
        }

        info!("running store self-test");
        store.self_test().await?;

        info!("persistent store initialization complete");
        Ok(store)
    }

    async fn connect_with_retry(database_path: &str) -> Result<Pool<Sqlite>> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", database_path))
            .map_err(|e| RemediatorError::StorageUnavailable(StorageError::ConnectFailed(e.to_string())))?
            .create_if_missing(true);

        let mut delay = store_constants::CONNECT_RETRY_BASE;
        let mut last_err = None;

        for attempt in 1..=store_constants::CONNECT_MAX_ATTEMPTS {
            match SqlitePoolOptions::new().max_connections(5).connect_with(options.clone()).await {
                Ok(pool) => {
                    info!(attempt, "connected to store database");
                    return Ok(pool);
                }
                Err(e) => {
                    warn!(attempt, %e, "store connection attempt failed");
                    last_err = Some(e.to_string());
                    if attempt < store_constants::CONNECT_MAX_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(store_constants::CONNECT_RETRY_CAP);
                    }
                }
            }
        }

        Err(RemediatorError::StorageUnavailable(StorageError::ConnectFailed(
            last_err.unwrap_or_else(|| "exhausted connection attempts".into()),
        )))
    }

    async fn run_step(&self, step: u32, label: &str, sql: &str) -> Result<()> {
        info!(step, "{}", label);
        sqlx::query(sql).execute(&self.pool).await.map_err(|e| {
            error!(step, %e, "{} failed", label);
            RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string()))
        })?;
        Ok(())
    }

    async fn initialize_tables(&self) -> Result<()> {
        self.run_step(
            1,
            "creating attempts table",
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id TEXT PRIMARY KEY,
                alert_fingerprint TEXT NOT NULL,
                alertname TEXT NOT NULL,
                instance TEXT NOT NULL,
                attempt_number INTEGER NOT NULL,
                severity TEXT NOT NULL,
                analysis_text TEXT NOT NULL,
                commands_executed TEXT NOT NULL,
                exit_codes TEXT NOT NULL,
                actionable INTEGER NOT NULL DEFAULT 1,
                success INTEGER NOT NULL,
                escalated INTEGER NOT NULL,
                error TEXT,
                duration_seconds REAL NOT NULL,
                timestamp DATETIME NOT NULL,
                investigation_steps TEXT NOT NULL
            )
            "#,
        )
        .await?;

        self.run_step(
            2,
            "creating attempts index",
            "CREATE INDEX IF NOT EXISTS idx_attempts_alertname_instance ON attempts(alertname, instance, timestamp DESC)",
        )
        .await?;

        self.run_step(
            3,
            "creating patterns table",
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                alertname TEXT NOT NULL,
                symptom_fingerprint TEXT NOT NULL,
                commands TEXT NOT NULL,
                success_count INTEGER NOT NULL DEFAULT 0,
                failure_count INTEGER NOT NULL DEFAULT 0,
                confidence_score REAL NOT NULL DEFAULT 0,
                last_used_at DATETIME NOT NULL,
                metadata TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                PRIMARY KEY (alertname, symptom_fingerprint)
            )
            "#,
        )
        .await?;

        self.run_step(
            4,
            "creating failure_patterns table",
            r#"
            CREATE TABLE IF NOT EXISTS failure_patterns (
                alertname TEXT NOT NULL,
                pattern_signature TEXT NOT NULL,
                commands_attempted TEXT NOT NULL,
                failure_reason TEXT NOT NULL,
                failure_count INTEGER NOT NULL DEFAULT 0,
                last_failed_at DATETIME NOT NULL,
                PRIMARY KEY (alertname, pattern_signature)
            )
            "#,
        )
        .await?;

        self.run_step(
            5,
            "creating fingerprint_cache table",
            r#"
            CREATE TABLE IF NOT EXISTS fingerprint_cache (
                fingerprint TEXT PRIMARY KEY,
                admitted_at DATETIME NOT NULL
            )
            "#,
        )
        .await?;

        self.run_step(
            6,
            "creating escalation_cooldowns table",
            r#"
            CREATE TABLE IF NOT EXISTS escalation_cooldowns (
                alertname TEXT NOT NULL,
                instance TEXT NOT NULL,
                escalated_at DATETIME NOT NULL,
                PRIMARY KEY (alertname, instance)
            )
            "#,
        )
        .await?;

        self.run_step(
            7,
            "creating maintenance_windows table",
            r#"
            CREATE TABLE IF NOT EXISTS maintenance_windows (
                id TEXT PRIMARY KEY,
                host TEXT,
                started_at DATETIME NOT NULL,
                ended_at DATETIME,
                reason TEXT NOT NULL,
                created_by TEXT NOT NULL,
                is_active INTEGER NOT NULL
            )
            "#,
        )
        .await?;

        self.run_step(
            8,
            "creating maintenance_windows index",
            "CREATE INDEX IF NOT EXISTS idx_maintenance_active ON maintenance_windows(is_active, host)",
        )
        .await?;

        self.run_step(
            9,
            "creating host_status table",
            r#"
            CREATE TABLE IF NOT EXISTS host_status (
                host TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                last_success_at DATETIME,
                last_failure_at DATETIME,
                consecutive_failures INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .await?;

        self.run_step(
            10,
            "creating state_snapshots table",
            r#"
            CREATE TABLE IF NOT EXISTS state_snapshots (
                snapshot_id TEXT PRIMARY KEY,
                host TEXT NOT NULL,
                service_name TEXT NOT NULL,
                inspect TEXT NOT NULL,
                recent_logs TEXT NOT NULL,
                taken_at DATETIME NOT NULL
            )
            "#,
        )
        .await?;

        info!("all store tables and indexes created");
        Ok(())
    }

    /// A maintenance window left `is_active` from a crash mid-window is
    /// closed at cleanup time rather than silently suppressing forever.
    async fn cleanup_stuck_maintenance(&self) -> Result<u32> {
        let rows = sqlx::query(
            "SELECT id FROM maintenance_windows WHERE is_active = 1 AND started_at < datetime('now', '-1 day')",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string())))?;

        if rows.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut cleaned = 0u32;
        for row in &rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string())))?;
            let result = sqlx::query("UPDATE maintenance_windows SET is_active = 0, ended_at = ? WHERE id = ?")
                .bind(now)
                .bind(&id)
                .execute(&self.pool)
                .await;
            match result {
                Ok(_) => cleaned += 1,
                Err(e) => error!(%id, %e, "failed to close stuck maintenance window"),
            }
        }
        Ok(cleaned)
    }

    /// Deletes attempt records older than `retention_days`; run periodically
    /// so the attempts table doesn't grow unbounded.
    pub async fn cleanup_old_attempts(&self, retention_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let result = sqlx::query("DELETE FROM attempts WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(qfail)?;
        Ok(result.rows_affected())
    }

    async fn self_test(&self) -> Result<()> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('attempts', 'patterns', 'host_status')",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string())))?;

        if tables.len() != 3 {
            error!(found = ?tables, "store self-test: expected tables missing");
            return Err(RemediatorError::StorageUnavailable(StorageError::QueryFailed(
                "core tables not present after initialization".into(),
            )));
        }
        info!("store self-test passed");
        Ok(())
    }
}

fn qfail(e: sqlx::Error) -> RemediatorError {
    RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string()))
}

#[async_trait::async_trait]
impl AttemptStore for Store {
    async fn append_attempt(&self, attempt: &Attempt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attempts
                (id, alert_fingerprint, alertname, instance, attempt_number, severity,
                 analysis_text, commands_executed, exit_codes, actionable, success, escalated, error,
                 duration_seconds, timestamp, investigation_steps)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attempt.id.to_string())
        .bind(&attempt.alert_fingerprint)
        .bind(&attempt.alertname)
        .bind(&attempt.instance)
        .bind(attempt.attempt_number)
        .bind(&attempt.severity)
        .bind(&attempt.analysis_text)
        .bind(serde_json::to_string(&attempt.commands_executed).unwrap_or_default())
        .bind(serde_json::to_string(&attempt.exit_codes).unwrap_or_default())
        .bind(attempt.actionable)
        .bind(attempt.success)
        .bind(attempt.escalated)
        .bind(&attempt.error)
        .bind(attempt.duration_seconds)
        .bind(attempt.timestamp)
        .bind(attempt.investigation_steps.to_string())
        .execute(&self.pool)
        .await
        .map_err(qfail)?;
        Ok(())
    }

    async fn count_actionable_attempts(&self, alertname: &str, instance: &str, window: Duration) -> Result<u32> {
        let since = Utc::now() - window;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM attempts WHERE alertname = ? AND instance = ? AND timestamp >= ? AND actionable = 1",
        )
        .bind(alertname)
        .bind(instance)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(qfail)?;
        Ok(count as u32)
    }

    async fn admit_fingerprint(
        &self,
        fingerprint: &str,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> Result<(bool, Option<DateTime<Utc>>)> {
        // A single conditional upsert: the row is only overwritten (and the
        // caller only told "admitted") when the prior admission has aged out
        // of the cooldown window. Concurrent callers racing this statement
        // can never both observe `true`, because SQLite serializes writers.
        let cutoff = now - cooldown;
        let result = sqlx::query(
            r#"
            INSERT INTO fingerprint_cache (fingerprint, admitted_at)
            VALUES (?, ?)
            ON CONFLICT(fingerprint) DO UPDATE SET admitted_at = excluded.admitted_at
            WHERE fingerprint_cache.admitted_at < ?
            "#,
        )
        .bind(fingerprint)
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(qfail)?;

        if result.rows_affected() > 0 {
            return Ok((true, None));
        }

        let prior: Option<FingerprintEntry> = sqlx::query_as::<_, FingerprintRow>(
            "SELECT fingerprint, admitted_at FROM fingerprint_cache WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(qfail)?
        .map(Into::into);

        Ok((false, prior.map(|p| p.admitted_at)))
    }

    async fn set_escalation_cooldown(&self, alertname: &str, instance: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO escalation_cooldowns (alertname, instance, escalated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(alertname, instance) DO UPDATE SET escalated_at = excluded.escalated_at
            "#,
        )
        .bind(alertname)
        .bind(instance)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(qfail)?;
        Ok(())
    }

    async fn get_escalation_cooldown(&self, alertname: &str, instance: &str) -> Result<Option<EscalationCooldown>> {
        let row = sqlx::query_as::<_, EscalationCooldownRow>(
            "SELECT alertname, instance, escalated_at FROM escalation_cooldowns WHERE alertname = ? AND instance = ?",
        )
        .bind(alertname)
        .bind(instance)
        .fetch_optional(&self.pool)
        .await
        .map_err(qfail)?;
        Ok(row.map(Into::into))
    }

    async fn clear_escalation_cooldown(&self, alertname: &str, instance: &str) -> Result<()> {
        sqlx::query("DELETE FROM escalation_cooldowns WHERE alertname = ? AND instance = ?")
            .bind(alertname)
            .bind(instance)
            .execute(&self.pool)
            .await
            .map_err(qfail)?;
        Ok(())
    }

    async fn start_maintenance(&self, window: &MaintenanceWindow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO maintenance_windows (id, host, started_at, ended_at, reason, created_by, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(window.id.to_string())
        .bind(&window.host)
        .bind(window.started_at)
        .bind(window.ended_at)
        .bind(&window.reason)
        .bind(&window.created_by)
        .bind(window.is_active)
        .execute(&self.pool)
        .await
        .map_err(qfail)?;
        Ok(())
    }

    async fn end_maintenance(&self, id: uuid::Uuid, ended_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE maintenance_windows SET is_active = 0, ended_at = ? WHERE id = ?")
            .bind(ended_at)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(qfail)?;
        Ok(())
    }

    async fn list_active_maintenance(&self) -> Result<Vec<MaintenanceWindow>> {
        let rows = sqlx::query_as::<_, MaintenanceWindowRow>(
            "SELECT id, host, started_at, ended_at, reason, created_by, is_active FROM maintenance_windows WHERE is_active = 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(qfail)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn is_suppressed(&self, host: &str, now: DateTime<Utc>) -> Result<(bool, Option<String>)> {
        let row = sqlx::query(
            r#"
            SELECT reason FROM maintenance_windows
            WHERE is_active = 1 AND started_at <= ? AND (host = ? COLLATE NOCASE OR host IS NULL)
            ORDER BY started_at DESC LIMIT 1
            "#,
        )
        .bind(now)
        .bind(host)
        .fetch_optional(&self.pool)
        .await
        .map_err(qfail)?;

        match row {
            Some(row) => {
                let reason: String = row.try_get("reason").map_err(qfail)?;
                Ok((true, Some(reason)))
            }
            None => Ok((false, None)),
        }
    }

    async fn insert_snapshot(&self, snapshot: &StateSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO state_snapshots (snapshot_id, host, service_name, inspect, recent_logs, taken_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.snapshot_id.to_string())
        .bind(&snapshot.host)
        .bind(&snapshot.service_name)
        .bind(snapshot.inspect.to_string())
        .bind(serde_json::to_string(&snapshot.recent_logs).unwrap_or_default())
        .bind(snapshot.taken_at)
        .execute(&self.pool)
        .await
        .map_err(qfail)?;
        Ok(())
    }

    async fn get_snapshot(&self, id: uuid::Uuid) -> Result<Option<StateSnapshot>> {
        let row = sqlx::query_as::<_, StateSnapshotRow>(
            "SELECT snapshot_id, host, service_name, inspect, recent_logs, taken_at FROM state_snapshots WHERE snapshot_id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(qfail)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn recent_attempts(&self, limit: u32) -> Result<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>("SELECT * FROM attempts ORDER BY timestamp DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(qfail)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait::async_trait]
impl PatternStore for Store {
    async fn find_pattern(&self, alertname: &str, symptom_fingerprint: &str) -> Result<Option<Pattern>> {
        let row = sqlx::query_as::<_, PatternRow>("SELECT * FROM patterns WHERE alertname = ? AND symptom_fingerprint = ?")
            .bind(alertname)
            .bind(symptom_fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(qfail)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn recent_patterns_for_alertname(&self, alertname: &str, limit: u32) -> Result<Vec<Pattern>> {
        let rows = sqlx::query_as::<_, PatternRow>(
            "SELECT * FROM patterns WHERE alertname = ? ORDER BY last_used_at DESC LIMIT ?",
        )
        .bind(alertname)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(qfail)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_pattern_success(
        &self,
        alertname: &str,
        symptom_fingerprint: &str,
        commands: &[String],
        now: DateTime<Utc>,
    ) -> Result<Pattern> {
        let commands_json = serde_json::to_string(commands).unwrap_or_default();
        // Conditional upsert: a fresh pattern starts at one success; an
        // existing one gets its success count bumped and commands refreshed
        // to the latest observed sequence in one statement, so concurrent
        // successes for the same fingerprint never clobber each other's count.
        sqlx::query(
            r#"
            INSERT INTO patterns (alertname, symptom_fingerprint, commands, success_count, failure_count, confidence_score, last_used_at, metadata, created_at)
            VALUES (?, ?, ?, 1, 0, 1.0, ?, '{}', ?)
            ON CONFLICT(alertname, symptom_fingerprint) DO UPDATE SET
                commands = excluded.commands,
                success_count = patterns.success_count + 1,
                last_used_at = excluded.last_used_at
            "#,
        )
        .bind(alertname)
        .bind(symptom_fingerprint)
        .bind(&commands_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(qfail)?;

        let mut pattern: Pattern = self
            .find_pattern(alertname, symptom_fingerprint)
            .await?
            .ok_or_else(|| RemediatorError::StorageUnavailable(StorageError::QueryFailed("pattern upsert did not persist".into())))?;
        pattern.recompute_confidence(now);

        sqlx::query("UPDATE patterns SET confidence_score = ? WHERE alertname = ? AND symptom_fingerprint = ?")
            .bind(pattern.confidence_score)
            .bind(alertname)
            .bind(symptom_fingerprint)
            .execute(&self.pool)
            .await
            .map_err(qfail)?;

        Ok(pattern)
    }

    async fn record_failure(
        &self,
        alertname: &str,
        symptom_fingerprint: &str,
        commands: &[String],
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let commands_json = serde_json::to_string(commands).unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO failure_patterns (alertname, pattern_signature, commands_attempted, failure_reason, failure_count, last_failed_at)
            VALUES (?, ?, ?, ?, 1, ?)
            ON CONFLICT(alertname, pattern_signature) DO UPDATE SET
                commands_attempted = excluded.commands_attempted,
                failure_reason = excluded.failure_reason,
                failure_count = failure_patterns.failure_count + 1,
                last_failed_at = excluded.last_failed_at
            "#,
        )
        .bind(alertname)
        .bind(symptom_fingerprint)
        .bind(&commands_json)
        .bind(reason)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(qfail)?;

        sqlx::query(
            r#"
            UPDATE patterns SET failure_count = failure_count + 1, last_used_at = ?
            WHERE alertname = ? AND symptom_fingerprint = ?
            "#,
        )
        .bind(now)
        .bind(alertname)
        .bind(symptom_fingerprint)
        .execute(&self.pool)
        .await
        .map_err(qfail)?;

        Ok(())
    }

    async fn find_failure_pattern(&self, alertname: &str, pattern_signature: &str) -> Result<Option<FailurePattern>> {
        let row = sqlx::query_as::<_, FailurePatternRow>(
            "SELECT * FROM failure_patterns WHERE alertname = ? AND pattern_signature = ?",
        )
        .bind(alertname)
        .bind(pattern_signature)
        .fetch_optional(&self.pool)
        .await
        .map_err(qfail)?;
        Ok(row.map(Into::into))
    }
}

// --- Row adapters -----------------------------------------------------
//
// sqlx's derive maps columns positionally/by-name onto plain structs; the
// domain types in `models` carry Vec<String>/serde_json::Value fields that
// need a JSON round trip, so each table gets a `*Row` shadow type and a
// `From`/`TryFrom` conversion rather than implementing `FromRow` by hand on
// the domain type itself.

#[derive(sqlx::FromRow)]
struct FingerprintRow {
    fingerprint: String,
    admitted_at: DateTime<Utc>,
}

impl From<FingerprintRow> for FingerprintEntry {
    fn from(row: FingerprintRow) -> Self {
        FingerprintEntry { fingerprint: row.fingerprint, admitted_at: row.admitted_at }
    }
}

#[derive(sqlx::FromRow)]
struct EscalationCooldownRow {
    alertname: String,
    instance: String,
    escalated_at: DateTime<Utc>,
}

impl From<EscalationCooldownRow> for EscalationCooldown {
    fn from(row: EscalationCooldownRow) -> Self {
        EscalationCooldown { alertname: row.alertname, instance: row.instance, escalated_at: row.escalated_at }
    }
}

#[derive(sqlx::FromRow)]
struct MaintenanceWindowRow {
    id: String,
    host: Option<String>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    reason: String,
    created_by: String,
    is_active: bool,
}

impl TryFrom<MaintenanceWindowRow> for MaintenanceWindow {
    type Error = RemediatorError;

    fn try_from(row: MaintenanceWindowRow) -> Result<Self> {
        Ok(MaintenanceWindow {
            id: uuid::Uuid::parse_str(&row.id)
                .map_err(|e| RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string())))?,
            host: row.host,
            started_at: row.started_at,
            ended_at: row.ended_at,
            reason: row.reason,
            created_by: row.created_by,
            is_active: row.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StateSnapshotRow {
    snapshot_id: String,
    host: String,
    service_name: String,
    inspect: String,
    recent_logs: String,
    taken_at: DateTime<Utc>,
}

impl TryFrom<StateSnapshotRow> for StateSnapshot {
    type Error = RemediatorError;

    fn try_from(row: StateSnapshotRow) -> Result<Self> {
        Ok(StateSnapshot {
            snapshot_id: uuid::Uuid::parse_str(&row.snapshot_id)
                .map_err(|e| RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string())))?,
            host: row.host,
            service_name: row.service_name,
            inspect: serde_json::from_str(&row.inspect).unwrap_or(serde_json::Value::Null),
            recent_logs: serde_json::from_str(&row.recent_logs).unwrap_or_default(),
            taken_at: row.taken_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    id: String,
    alert_fingerprint: String,
    alertname: String,
    instance: String,
    attempt_number: i64,
    severity: String,
    analysis_text: String,
    commands_executed: String,
    exit_codes: String,
    actionable: bool,
    success: bool,
    escalated: bool,
    error: Option<String>,
    duration_seconds: f64,
    timestamp: DateTime<Utc>,
    investigation_steps: String,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = RemediatorError;

    fn try_from(row: AttemptRow) -> Result<Self> {
        Ok(Attempt {
            id: uuid::Uuid::parse_str(&row.id)
                .map_err(|e| RemediatorError::StorageUnavailable(StorageError::QueryFailed(e.to_string())))?,
            alert_fingerprint: row.alert_fingerprint,
            alertname: row.alertname,
            instance: row.instance,
            attempt_number: row.attempt_number as u32,
            severity: row.severity,
            analysis_text: row.analysis_text,
            commands_executed: serde_json::from_str(&row.commands_executed).unwrap_or_default(),
            exit_codes: serde_json::from_str(&row.exit_codes).unwrap_or_default(),
            actionable: row.actionable,
            success: row.success,
            escalated: row.escalated,
            error: row.error,
            duration_seconds: row.duration_seconds,
            timestamp: row.timestamp,
            investigation_steps: serde_json::from_str(&row.investigation_steps).unwrap_or(serde_json::Value::Null),
        })
    }
}

#[derive(sqlx::FromRow)]
struct PatternRow {
    alertname: String,
    symptom_fingerprint: String,
    commands: String,
    success_count: i64,
    failure_count: i64,
    confidence_score: f64,
    last_used_at: DateTime<Utc>,
    metadata: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PatternRow> for Pattern {
    type Error = RemediatorError;

    fn try_from(row: PatternRow) -> Result<Self> {
        Ok(Pattern {
            alertname: row.alertname,
            symptom_fingerprint: row.symptom_fingerprint,
            commands: serde_json::from_str(&row.commands).unwrap_or_default(),
            success_count: row.success_count as u64,
            failure_count: row.failure_count as u64,
            confidence_score: row.confidence_score,
            last_used_at: row.last_used_at,
            metadata: serde_json::from_str(&row.metadata).unwrap_or(serde_json::Value::Null),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FailurePatternRow {
    alertname: String,
    pattern_signature: String,
    commands_attempted: String,
    failure_reason: String,
    failure_count: i64,
    last_failed_at: DateTime<Utc>,
}

impl From<FailurePatternRow> for FailurePattern {
    fn from(row: FailurePatternRow) -> Self {
        FailurePattern {
            alertname: row.alertname,
            pattern_signature: row.pattern_signature,
            commands_attempted: serde_json::from_str(&row.commands_attempted).unwrap_or_default(),
            failure_reason: row.failure_reason,
            failure_count: row.failure_count as u64,
            last_failed_at: row.last_failed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> Store {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remediator-test.db");
        // leaked deliberately: the pool must outlive this helper's scope
        std::mem::forget(dir);
        Store::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn fingerprint_admission_is_exclusive_within_cooldown() {
        let store = temp_store().await;
        let now = Utc::now();
        let cooldown = Duration::seconds(300);

        let (first, _) = store.admit_fingerprint("fp1", cooldown, now).await.unwrap();
        assert!(first);

        let (second, prior) = store.admit_fingerprint("fp1", cooldown, now + Duration::seconds(10)).await.unwrap();
        assert!(!second);
        assert!(prior.is_some());

        let (third, _) = store.admit_fingerprint("fp1", cooldown, now + Duration::seconds(400)).await.unwrap();
        assert!(third);
    }

    #[tokio::test]
    async fn pattern_success_accumulates_and_raises_confidence() {
        let store = temp_store().await;
        let now = Utc::now();
        let commands = vec!["docker restart nginx".to_string()];

        let p1 = store.upsert_pattern_success("ContainerDown", "fp", &commands, now).await.unwrap();
        assert_eq!(p1.success_count, 1);

        let p2 = store.upsert_pattern_success("ContainerDown", "fp", &commands, now).await.unwrap();
        assert_eq!(p2.success_count, 2);
        assert!(p2.confidence_score > 0.0);
    }

    #[tokio::test]
    async fn escalation_cooldown_round_trips_and_clears() {
        let store = temp_store().await;
        let now = Utc::now();

        store.set_escalation_cooldown("ContainerDown", "nexus:9323", now).await.unwrap();
        let cooldown = store.get_escalation_cooldown("ContainerDown", "nexus:9323").await.unwrap();
        assert!(cooldown.is_some());

        store.clear_escalation_cooldown("ContainerDown", "nexus:9323").await.unwrap();
        let cleared = store.get_escalation_cooldown("ContainerDown", "nexus:9323").await.unwrap();
        assert!(cleared.is_none());
    }

    #[tokio::test]
    async fn maintenance_window_suppresses_matching_host() {
        let store = temp_store().await;
        let now = Utc::now();

        let window = MaintenanceWindow {
            id: uuid::Uuid::new_v4(),
            host: Some("nexus".into()),
            started_at: now - Duration::seconds(10),
            ended_at: None,
            reason: "planned upgrade".into(),
            created_by: "operator".into(),
            is_active: true,
        };
        store.start_maintenance(&window).await.unwrap();

        let (suppressed, reason) = store.is_suppressed("nexus", now).await.unwrap();
        assert!(suppressed);
        assert_eq!(reason.as_deref(), Some("planned upgrade"));

        let (other_host, _) = store.is_suppressed("outpost", now).await.unwrap();
        assert!(!other_host);

        store.end_maintenance(window.id, now).await.unwrap();
        let (after_end, _) = store.is_suppressed("nexus", now).await.unwrap();
        assert!(!after_end);
    }
}
