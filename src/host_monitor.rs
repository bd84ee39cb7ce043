//! Host Monitor: tracks host reachability from observed SSH outcomes and
//! background pings. State machine per host: `unknown → online ⇄ flaky → offline`.
//!
//! An `Arc<RwLock<HashMap<...>>>`-keyed tracker with a periodic background
//! TCP probe loop for hosts currently marked offline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::models::{HostState, HostStatus, TargetHost};

/// Consecutive failures within `OFFLINE_FAILURE_WINDOW` escalate a host to `offline`.
const OFFLINE_FAILURE_THRESHOLD: u32 = 3;
const OFFLINE_FAILURE_WINDOW: Duration = Duration::from_secs(5 * 60);

pub struct HostMonitor {
    statuses: Arc<RwLock<HashMap<String, HostStatus>>>,
    clock: Arc<dyn Clock>,
}

impl HostMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        HostMonitor {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    #[instrument(skip(self))]
    pub async fn report_success(&self, host: &str) {
        let mut statuses = self.statuses.write().await;
        let entry = statuses
            .entry(host.to_string())
            .or_insert_with(|| HostStatus::unknown(host));
        entry.consecutive_failures = 0;
        entry.failure_streak_started_at = None;
        entry.state = HostState::Online;
        entry.last_success_at = Some(self.clock.now());
    }

    #[instrument(skip(self))]
    pub async fn report_failure(&self, host: &str) {
        let mut statuses = self.statuses.write().await;
        let entry = statuses
            .entry(host.to_string())
            .or_insert_with(|| HostStatus::unknown(host));
        let now = self.clock.now();
        let window = chrono::Duration::from_std(OFFLINE_FAILURE_WINDOW).unwrap_or_default();

        let within_streak = entry
            .failure_streak_started_at
            .map(|start| now - start <= window)
            .unwrap_or(false);
        if within_streak {
            entry.consecutive_failures += 1;
        } else {
            entry.failure_streak_started_at = Some(now);
            entry.consecutive_failures = 1;
        }
        entry.last_failure_at = Some(now);

        let streak_start = entry.failure_streak_started_at.unwrap_or(now);
        entry.state = if entry.consecutive_failures >= OFFLINE_FAILURE_THRESHOLD && now - streak_start <= window {
            warn!(%host, failures = entry.consecutive_failures, "host marked offline");
            HostState::Offline
        } else {
            HostState::Flaky
        };
    }

    pub async fn status(&self, host: &str) -> HostStatus {
        self.statuses
            .read()
            .await
            .get(host)
            .cloned()
            .unwrap_or_else(|| HostStatus::unknown(host))
    }

    /// `true` for online/unknown; `true` (with caller-visible flaky state) for
    /// flaky; `false` for offline.
    pub async fn is_available(&self, host: &str) -> bool {
        self.status(host).await.is_available()
    }

    pub async fn all_statuses(&self) -> Vec<HostStatus> {
        self.statuses.read().await.values().cloned().collect()
    }

    /// Cheap TCP-connect probe for hosts currently offline; a single success
    /// returns them to `online`.
    pub async fn probe_offline_hosts(&self, hosts: &[TargetHost]) {
        let offline: Vec<TargetHost> = {
            let statuses = self.statuses.read().await;
            hosts
                .iter()
                .filter(|h| {
                    statuses
                        .get(&h.name)
                        .map(|s| s.state == HostState::Offline)
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        };

        let probes = offline.iter().map(|host| async move { (host.name.clone(), tcp_probe(&host.address).await) });
        for (name, reachable) in join_all(probes).await {
            if reachable {
                info!(host = %name, "offline host responded to probe, marking online");
                self.report_success(&name).await;
            } else {
                debug!(host = %name, "offline probe still failing");
            }
        }
    }
}

async fn tcp_probe(address: &str) -> bool {
    let addr = if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:22", address)
    };
    tokio::time::timeout(Duration::from_secs(3), TcpStream::connect(&addr))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_doubles::FixedClock;

    fn monitor() -> HostMonitor {
        HostMonitor::new(Arc::new(FixedClock::at(Utc::now())))
    }

    #[tokio::test]
    async fn single_failure_marks_flaky() {
        let m = monitor();
        m.report_failure("nexus").await;
        assert_eq!(m.status("nexus").await.state, HostState::Flaky);
        assert!(m.is_available("nexus").await);
    }

    #[tokio::test]
    async fn three_consecutive_failures_mark_offline() {
        let m = monitor();
        for _ in 0..3 {
            m.report_failure("outpost").await;
        }
        assert_eq!(m.status("outpost").await.state, HostState::Offline);
        assert!(!m.is_available("outpost").await);
    }

    #[tokio::test]
    async fn three_failures_spread_beyond_window_do_not_mark_offline() {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let m = HostMonitor::new(clock.clone());
        m.report_failure("outpost").await;
        clock.advance(chrono::Duration::hours(1));
        m.report_failure("outpost").await;
        clock.advance(chrono::Duration::hours(1));
        m.report_failure("outpost").await;

        // Each failure landed outside the prior one's window, so the streak
        // keeps restarting instead of accumulating toward the threshold.
        assert_eq!(m.status("outpost").await.state, HostState::Flaky);
        assert!(m.is_available("outpost").await);
    }

    #[tokio::test]
    async fn three_failures_within_window_mark_offline() {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let m = HostMonitor::new(clock.clone());
        m.report_failure("outpost").await;
        clock.advance(chrono::Duration::minutes(2));
        m.report_failure("outpost").await;
        clock.advance(chrono::Duration::minutes(2));
        m.report_failure("outpost").await;

        assert_eq!(m.status("outpost").await.state, HostState::Offline);
        assert!(!m.is_available("outpost").await);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let m = monitor();
        m.report_failure("nexus").await;
        m.report_success("nexus").await;
        let status = m.status("nexus").await;
        assert_eq!(status.state, HostState::Online);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn unknown_host_is_available_by_default() {
        let m = monitor();
        assert!(m.is_available("never-seen").await);
    }
}
