//! Suppressor: in-memory correlation of recently observed alerts. Identifies
//! cascade roots (configured unordered pairs) and dependency-driven
//! suppression (service → dependencies).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::constants::suppressor as suppressor_consts;

/// An unordered cascade pair: if either member fires while the other is
/// already in the window, the non-root member is suppressed.
#[derive(Debug, Clone)]
pub struct CascadePair {
    pub a: String,
    pub b: String,
    pub root: String,
}

#[derive(Debug, Clone, Default)]
pub struct SuppressorConfig {
    pub cascade_pairs: Vec<CascadePair>,
    /// service -> list of services it depends on.
    pub dependency_map: HashMap<String, Vec<String>>,
}

struct RingEntry {
    alertname: String,
    seen_at: DateTime<Utc>,
}

pub struct Suppressor {
    config: SuppressorConfig,
    ring: RwLock<VecDeque<RingEntry>>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressionVerdict {
    Proceed,
    SuppressedByCascade { root: String },
    SuppressedByDependency { dependency: String },
}

impl Suppressor {
    pub fn new(config: SuppressorConfig, clock: Arc<dyn Clock>) -> Self {
        Suppressor {
            config,
            ring: RwLock::new(VecDeque::new()),
            clock,
        }
    }

    /// Records that `alertname` was observed now, then evicts entries
    /// outside the ring window.
    pub async fn record(&self, alertname: &str) {
        let now = self.clock.now();
        let mut ring = self.ring.write().await;
        ring.push_back(RingEntry {
            alertname: alertname.to_string(),
            seen_at: now,
        });
        self.evict_stale(&mut ring, now);
    }

    fn evict_stale(&self, ring: &mut VecDeque<RingEntry>, now: DateTime<Utc>) {
        while let Some(front) = ring.front() {
            let age = now - front.seen_at;
            if age.to_std().unwrap_or_default() > suppressor_consts::RING_WINDOW {
                ring.pop_front();
            } else {
                break;
            }
        }
    }

    /// Decides whether `alertname` should proceed, given what's currently in
    /// the window and which dependencies are firing. `currently_firing`
    /// should include every alertname the caller currently considers active
    /// (used for dependency-map suppression).
    pub async fn evaluate(&self, alertname: &str, currently_firing: &[String]) -> SuppressionVerdict {
        let ring = self.ring.read().await;

        for pair in &self.config.cascade_pairs {
            let (this, other) = if pair.a == alertname {
                (pair.a.as_str(), pair.b.as_str())
            } else if pair.b == alertname {
                (pair.b.as_str(), pair.a.as_str())
            } else {
                continue;
            };

            if this == pair.root {
                continue;
            }

            if ring.iter().any(|e| e.alertname == other) {
                return SuppressionVerdict::SuppressedByCascade { root: pair.root.clone() };
            }
        }
        drop(ring);

        if let Some(deps) = self.config.dependency_map.get(alertname) {
            if let Some(firing_dep) = deps.iter().find(|d| currently_firing.contains(d)) {
                return SuppressionVerdict::SuppressedByDependency {
                    dependency: firing_dep.clone(),
                };
            }
        }

        SuppressionVerdict::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_doubles::FixedClock;

    fn suppressor() -> (Suppressor, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let config = SuppressorConfig {
            cascade_pairs: vec![CascadePair {
                a: "WireGuardVPNDown".into(),
                b: "OutpostDown".into(),
                root: "WireGuardVPNDown".into(),
            }],
            dependency_map: HashMap::new(),
        };
        (Suppressor::new(config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn root_alert_proceeds() {
        let (s, _clock) = suppressor();
        s.record("WireGuardVPNDown").await;
        let verdict = s.evaluate("WireGuardVPNDown", &[]).await;
        assert_eq!(verdict, SuppressionVerdict::Proceed);
    }

    #[tokio::test]
    async fn dependent_alert_suppressed_when_root_in_window() {
        let (s, _clock) = suppressor();
        s.record("WireGuardVPNDown").await;
        let verdict = s.evaluate("OutpostDown", &[]).await;
        assert_eq!(
            verdict,
            SuppressionVerdict::SuppressedByCascade {
                root: "WireGuardVPNDown".into()
            }
        );
    }

    #[tokio::test]
    async fn cascade_expires_after_ring_window() {
        let (s, clock) = suppressor();
        s.record("WireGuardVPNDown").await;
        clock.advance(chrono::Duration::seconds(121));
        s.record("OutpostDown").await;
        let verdict = s.evaluate("OutpostDown", &[]).await;
        assert_eq!(verdict, SuppressionVerdict::Proceed);
    }

    #[tokio::test]
    async fn dependency_map_suppresses_downstream() {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let mut dependency_map = HashMap::new();
        dependency_map.insert("WebsiteDown".to_string(), vec!["DatabaseDown".to_string()]);
        let config = SuppressorConfig {
            cascade_pairs: vec![],
            dependency_map,
        };
        let s = Suppressor::new(config, clock);
        let verdict = s.evaluate("WebsiteDown", &["DatabaseDown".to_string()]).await;
        assert_eq!(
            verdict,
            SuppressionVerdict::SuppressedByDependency {
                dependency: "DatabaseDown".into()
            }
        );
    }
}
