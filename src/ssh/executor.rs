use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command as LocalCommand;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::constants::ssh as ssh_consts;
use crate::errors::{RemediatorError, SshError, TransientNetworkError};
use crate::host_monitor::HostMonitor;
use crate::models::TargetHost;
use crate::ssh::connection::{preflight_key, SshConnection};
use crate::traits::{ExecOutcome, Executor, Result};

struct PooledConnection {
    conn: SshConnection,
    last_used: Instant,
}

/// Pooled, per-host SSH executor. One live connection per host, reused while
/// healthy; a keepalive probe is issued if idle past [`ssh_consts::KEEPALIVE_IDLE`].
pub struct SshExecutor {
    hosts: HashMap<String, TargetHost>,
    connections: Arc<RwLock<HashMap<String, Arc<Mutex<PooledConnection>>>>>,
    host_monitor: Arc<HostMonitor>,
}

impl SshExecutor {
    /// Runs key preflight for every non-localhost host before accepting
    /// traffic; a failure here aborts startup (§4.2 is fail-fast by design).
    pub async fn new(hosts: Vec<TargetHost>, host_monitor: Arc<HostMonitor>) -> Result<Self> {
        for host in &hosts {
            if !host.localhost {
                preflight_key(&host.key_path).await.map_err(RemediatorError::from)?;
            }
        }

        Ok(SshExecutor {
            hosts: hosts.into_iter().map(|h| (h.name.clone(), h)).collect(),
            connections: Arc::new(RwLock::new(HashMap::new())),
            host_monitor,
        })
    }

    async fn get_or_create_connection(&self, host: &TargetHost) -> std::result::Result<Arc<Mutex<PooledConnection>>, SshError> {
        {
            let conns = self.connections.read().await;
            if let Some(existing) = conns.get(&host.name) {
                let age_ok = existing.lock().await.last_used.elapsed() < ssh_consts::KEEPALIVE_IDLE;
                if age_ok {
                    return Ok(existing.clone());
                }
            }
        }

        let conn = SshConnection::connect(&host.address, &host.login, &host.key_path, ssh_consts::COMMAND_TIMEOUT).await?;
        let pooled = Arc::new(Mutex::new(PooledConnection {
            conn,
            last_used: Instant::now(),
        }));
        self.connections.write().await.insert(host.name.clone(), pooled.clone());
        Ok(pooled)
    }

    async fn remove_connection(&self, host: &str) {
        self.connections.write().await.remove(host);
    }

    async fn execute_remote(&self, host: &TargetHost, command: &str, timeout: Duration) -> std::result::Result<ExecOutcome, SshError> {
        let mut attempt = 0u32;
        let mut delay = ssh_consts::BACKOFF_BASE;

        loop {
            attempt += 1;
            let conn = self.get_or_create_connection(host).await?;

            let run = async {
                let mut guard = conn.lock().await;
                guard.last_used = Instant::now();
                guard.conn.execute(command).await
            };

            let result = tokio::time::timeout(timeout, run).await;

            match result {
                Ok(Ok((stdout, stderr, exit_code))) => {
                    return Ok(ExecOutcome { stdout, stderr, exit_code });
                }
                Ok(Err(SshError::AuthFailed { host, reason })) => {
                    return Err(SshError::AuthFailed { host, reason });
                }
                Ok(Err(transient)) => {
                    self.remove_connection(&host.name).await;
                    if attempt >= ssh_consts::MAX_ATTEMPTS {
                        return Err(transient);
                    }
                    warn!(host = %host.name, attempt, "ssh command failed, retrying after backoff");
                }
                Err(_elapsed) => {
                    self.remove_connection(&host.name).await;
                    if attempt >= ssh_consts::MAX_ATTEMPTS {
                        return Err(SshError::Transient(TransientNetworkError::SshTimeout { host: host.name.clone() }));
                    }
                    warn!(host = %host.name, attempt, "ssh command timed out, retrying after backoff");
                }
            }

            tokio::time::sleep(delay).await;
            delay = (delay * ssh_consts::BACKOFF_FACTOR).min(ssh_consts::BACKOFF_CAP);
        }
    }

    async fn execute_local(&self, command: &str) -> std::result::Result<ExecOutcome, SshError> {
        // The service runs unprivileged inside a container; sudo would only
        // ever fail here, so the prefix is stripped rather than rejected.
        let stripped = command.strip_prefix("sudo ").unwrap_or(command);
        debug!(command = %stripped, "executing local command");

        let output = LocalCommand::new("sh")
            .arg("-c")
            .arg(stripped)
            .output()
            .await
            .map_err(|e| SshError::Transient(TransientNetworkError::Other(e.to_string())))?;

        Ok(ExecOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[async_trait]
impl Executor for SshExecutor {
    async fn execute(&self, host: &str, command: &str, timeout: Duration) -> Result<ExecOutcome> {
        let target = self
            .hosts
            .get(host)
            .ok_or_else(|| RemediatorError::RemoteUnavailable(format!("unknown host {}", host)))?;

        let outcome = if target.localhost {
            self.execute_local(command).await
        } else {
            self.execute_remote(target, command, timeout).await
        };

        match &outcome {
            Ok(_) => self.host_monitor.report_success(host).await,
            Err(SshError::AuthFailed { .. }) => {}
            Err(_) => self.host_monitor.report_failure(host).await,
        }

        outcome.map_err(|e| {
            error!(host, "ssh execution failed: {}", e);
            RemediatorError::from(e)
        })
    }

    async fn close_all(&self) {
        self.connections.write().await.clear();
    }
}
