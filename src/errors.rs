//! Error taxonomy for the remediation core.
//!
//! Variants mirror the error categories the Orchestrator reasons about:
//! Validation, TransientNetwork, RemoteUnavailable, StorageUnavailable,
//! PolicyDeny, Timeout, UnknownOutcome. Each carries enough context to
//! produce a terminal Attempt record without the caller re-deriving it.

use std::fmt;

/// Top-level error type threaded through the remediation pipeline.
#[derive(Debug)]
pub enum RemediatorError {
    /// Command validator rejected a proposed action.
    Validation(ValidationError),

    /// Retryable failure talking to a remote collaborator (SSH, monitoring, LLM).
    TransientNetwork(TransientNetworkError),

    /// A remote host is unreachable for reasons the executor can't retry past.
    RemoteUnavailable(String),

    /// Persistent store is unavailable or degraded.
    StorageUnavailable(StorageError),

    /// Policy explicitly refused an action (cooldown, maintenance window, escalation cap).
    PolicyDeny(String),

    /// A bounded operation ran past its deadline.
    Timeout(String),

    /// Outcome could not be determined (e.g. verification inconclusive).
    UnknownOutcome(String),
}

impl fmt::Display for RemediatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediatorError::Validation(e) => write!(f, "validation error: {}", e),
            RemediatorError::TransientNetwork(e) => write!(f, "transient network error: {}", e),
            RemediatorError::RemoteUnavailable(msg) => write!(f, "remote unavailable: {}", msg),
            RemediatorError::StorageUnavailable(e) => write!(f, "storage unavailable: {}", e),
            RemediatorError::PolicyDeny(reason) => write!(f, "policy deny: {}", reason),
            RemediatorError::Timeout(msg) => write!(f, "timeout: {}", msg),
            RemediatorError::UnknownOutcome(msg) => write!(f, "unknown outcome: {}", msg),
        }
    }
}

impl std::error::Error for RemediatorError {}

impl From<anyhow::Error> for RemediatorError {
    fn from(e: anyhow::Error) -> Self {
        RemediatorError::TransientNetwork(TransientNetworkError::Other(e.to_string()))
    }
}

impl From<ValidationError> for RemediatorError {
    fn from(e: ValidationError) -> Self {
        RemediatorError::Validation(e)
    }
}

impl From<StorageError> for RemediatorError {
    fn from(e: StorageError) -> Self {
        RemediatorError::StorageUnavailable(e)
    }
}

impl From<TransientNetworkError> for RemediatorError {
    fn from(e: TransientNetworkError) -> Self {
        RemediatorError::TransientNetwork(e)
    }
}

impl From<SshError> for RemediatorError {
    fn from(e: SshError) -> Self {
        match e {
            SshError::Transient(t) => RemediatorError::TransientNetwork(t),
            SshError::AuthFailed { host, reason } => {
                RemediatorError::RemoteUnavailable(format!("ssh auth failed on {}: {}", host, reason))
            }
            SshError::KeyPreflightFailed { path, reason } => {
                RemediatorError::RemoteUnavailable(format!("ssh key preflight failed for {}: {}", path, reason))
            }
        }
    }
}

/// Reasons the Command Validator refused to hand a command to the executor.
#[derive(Debug)]
pub enum ValidationError {
    CommandTooLong { len: usize, max: usize },
    SelfProtected { identity: String },
    Blocklisted { pattern: String },
    UnsafePipe { command: String },
    NotOnAllowlist { command: String },
    MalformedWebhook(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CommandTooLong { len, max } => {
                write!(f, "command length {} exceeds cap {}", len, max)
            }
            ValidationError::SelfProtected { identity } => {
                write!(f, "command targets protected identity: {}", identity)
            }
            ValidationError::Blocklisted { pattern } => {
                write!(f, "command matches blocklist pattern: {}", pattern)
            }
            ValidationError::UnsafePipe { command } => {
                write!(f, "piped command not on safe-pipe whitelist: {}", command)
            }
            ValidationError::NotOnAllowlist { command } => {
                write!(f, "command head not on allowlist: {}", command)
            }
            ValidationError::MalformedWebhook(msg) => write!(f, "malformed webhook payload: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Retryable failures from remote collaborators.
#[derive(Debug)]
pub enum TransientNetworkError {
    SshTimeout { host: String },
    SshChannelFailed { host: String, reason: String },
    AuthNotReady { host: String },
    MonitoringServerError { status: u16 },
    LogServerError { status: u16 },
    LlmRateLimited,
    LlmServerError { status: u16 },
    Other(String),
}

impl fmt::Display for TransientNetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientNetworkError::SshTimeout { host } => write!(f, "SSH timeout on {}", host),
            TransientNetworkError::SshChannelFailed { host, reason } => {
                write!(f, "SSH channel failed on {}: {}", host, reason)
            }
            TransientNetworkError::AuthNotReady { host } => {
                write!(f, "SSH auth not yet ready on {}", host)
            }
            TransientNetworkError::MonitoringServerError { status } => {
                write!(f, "monitoring server returned {}", status)
            }
            TransientNetworkError::LogServerError { status } => {
                write!(f, "log aggregator returned {}", status)
            }
            TransientNetworkError::LlmRateLimited => write!(f, "LLM provider rate limited"),
            TransientNetworkError::LlmServerError { status } => {
                write!(f, "LLM provider returned {}", status)
            }
            TransientNetworkError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransientNetworkError {}

/// Non-retryable SSH failures (auth/permission) are kept distinct from the
/// transient set so the executor can short-circuit its backoff loop.
#[derive(Debug)]
pub enum SshError {
    Transient(TransientNetworkError),
    AuthFailed { host: String, reason: String },
    KeyPreflightFailed { path: String, reason: String },
}

impl fmt::Display for SshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshError::Transient(e) => write!(f, "{}", e),
            SshError::AuthFailed { host, reason } => {
                write!(f, "SSH auth failed on {}: {}", host, reason)
            }
            SshError::KeyPreflightFailed { path, reason } => {
                write!(f, "SSH key preflight failed for {}: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for SshError {}

/// Persistent store failures.
#[derive(Debug)]
pub enum StorageError {
    ConnectFailed(String),
    QueryFailed(String),
    PoolExhausted,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectFailed(msg) => write!(f, "connect failed: {}", msg),
            StorageError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
            StorageError::PoolExhausted => write!(f, "connection pool exhausted"),
        }
    }
}

impl std::error::Error for StorageError {}
