//! Central repository for timeouts, limits, and threshold constants.
//!
//! One `pub mod` per concern rather than a flat list, so call sites read as
//! `constants::ssh::MAX_ATTEMPTS` instead of a bare magic number.

#![allow(dead_code)]

use std::time::Duration;

/// Command Validator limits.
pub mod validator {
    /// Hard cap on command string length before validation even inspects it.
    pub const MAX_COMMAND_LEN: usize = 4096;
}

/// SSH Executor retry/backoff/pooling constants.
pub mod ssh {
    use super::Duration;

    /// Base delay for the first retry.
    pub const BACKOFF_BASE: Duration = Duration::from_secs(1);

    /// Multiplier applied to the backoff delay after each attempt.
    pub const BACKOFF_FACTOR: u32 = 2;

    /// Ceiling on the backoff delay regardless of attempt count.
    pub const BACKOFF_CAP: Duration = Duration::from_secs(30);

    /// Maximum attempts (including the first) before giving up.
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Idle duration after which a pooled connection is considered stale
    /// and is torn down on next acquire rather than reused.
    pub const KEEPALIVE_IDLE: Duration = Duration::from_secs(60);

    /// Per-command execution timeout.
    pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

    /// Required (and only accepted) permission bits on a private key file.
    pub const REQUIRED_KEY_MODE: u32 = 0o600;
}

/// Monitoring Client timeouts/retries.
pub mod monitoring {
    use super::Duration;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const MAX_RETRIES: u32 = 2;
    pub const VERIFY_POLL_INTERVAL: Duration = Duration::from_secs(5);
}

/// Log Client bounds.
pub mod logs {
    use super::Duration;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const MAX_LINE_CHARS: usize = 500;
    pub const MAX_LINES_PER_CALL: usize = 100;
}

/// Persistent Store connection and retention policy.
pub mod store {
    use super::Duration;

    /// Base delay before the first reconnect attempt at startup.
    pub const CONNECT_RETRY_BASE: Duration = Duration::from_secs(1);

    /// Ceiling on the reconnect backoff delay.
    pub const CONNECT_RETRY_CAP: Duration = Duration::from_secs(30);

    /// Maximum reconnect attempts at startup before giving up.
    pub const CONNECT_MAX_ATTEMPTS: u32 = 10;

    /// Default window for "recent attempts" queries feeding the learning engine.
    pub const DEFAULT_ATTEMPT_WINDOW: Duration = Duration::from_secs(2 * 3600);

    /// Default cooldown before the same (alertname, instance) pair may escalate again.
    pub const DEFAULT_ESCALATION_COOLDOWN: Duration = Duration::from_secs(4 * 3600);

    /// Default fingerprint admission cooldown for deduplication.
    pub const DEFAULT_DEDUP_COOLDOWN: Duration = Duration::from_secs(300);
}

/// Remediation Orchestrator defaults (tunable per alertname via configuration).
pub mod orchestrator {
    /// Actionable attempts permitted within the rolling attempt window before escalating.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
}

/// Alert Queue bounds.
pub mod queue {
    use super::Duration;

    /// Maximum number of alerts held in the queue at once.
    pub const CAPACITY: usize = 1000;

    /// Per-entry time-to-live before it's dropped as stale.
    pub const ENTRY_TTL: Duration = Duration::from_secs(3600);
}

/// Suppressor ring buffer and cascade handling.
pub mod suppressor {
    use super::Duration;

    /// Window during which a related alert is treated as part of the same cascade.
    pub const RING_WINDOW: Duration = Duration::from_secs(120);
}

/// Learning Engine thresholds.
pub mod learning {
    use super::Duration;

    /// Tier 0 (exact fingerprint match) minimum confidence to auto-apply.
    pub const TIER0_MIN_CONFIDENCE: f64 = 0.75;

    /// Tier 0 minimum observed successes before a pattern is trusted.
    pub const TIER0_MIN_SUCCESS_COUNT: u64 = 5;

    /// Tier 1 (similarity match) minimum weighted-Jaccard similarity.
    pub const TIER1_MIN_SIMILARITY: f64 = 0.6;

    /// How long a looked-up pattern is cached in memory before re-querying the store.
    pub const PATTERN_CACHE_TTL: Duration = Duration::from_secs(60);

    /// Recency decay half-life-like divisor (days) applied to pattern confidence.
    pub const CONFIDENCE_DECAY_DAYS: f64 = 30.0;
}

/// Reasoning Agent bounds and confidence gates.
pub mod agent {
    use super::Duration;

    /// Maximum tool-call steps per reasoning episode.
    pub const MAX_STEPS: u32 = 8;

    /// Wall-clock budget for one reasoning episode.
    pub const MAX_DURATION: Duration = Duration::from_secs(60);

    /// Minimum confidence required to execute a proposed action at all.
    pub const MIN_CONFIDENCE_TO_ACT: f64 = 0.70;

    /// Minimum confidence required to act without human confirmation.
    pub const MIN_CONFIDENCE_TO_AUTO_APPLY: f64 = 0.90;
}

/// Cross-cutting concurrency and deadline constants.
pub mod timeouts {
    use super::Duration;

    pub const LLM_CALL: Duration = Duration::from_secs(60);
    pub const SSH_COMMAND: Duration = Duration::from_secs(30);
    pub const MONITORING_QUERY: Duration = Duration::from_secs(10);
    pub const VERIFICATION_DEADLINE: Duration = Duration::from_secs(120);
    pub const PATTERN_LOOKUP: Duration = Duration::from_secs(2);
    pub const QUEUE_ENTRY: Duration = Duration::from_secs(3600);
}

/// Background task cadences.
pub mod cleanup {
    pub const CLEANUP_INTERVAL_SECONDS: u64 = 3600;
    pub const HOST_PROBE_INTERVAL_SECONDS: u64 = 60;
    pub const ATTEMPT_RETENTION_DAYS: i64 = 30;
}

/// Notification sink constants.
pub mod notify {
    use super::Duration;

    pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(3);
    pub const MAX_RETRIES: u32 = 1;
}
