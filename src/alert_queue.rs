//! Alert Queue: bounded in-memory FIFO used while the Persistent Store is
//! unreachable (degraded mode). Drained in order by a background task once
//! connectivity returns.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::warn;

use crate::clock::Clock;
use crate::constants::queue as queue_consts;
use crate::models::Alert;

pub struct QueuedAlert {
    pub alert: Alert,
    pub enqueued_at: DateTime<Utc>,
}

pub struct AlertQueue {
    entries: Arc<Mutex<VecDeque<QueuedAlert>>>,
    clock: Arc<dyn Clock>,
}

impl AlertQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        AlertQueue {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(queue_consts::CAPACITY))),
            clock,
        }
    }

    /// Enqueues an alert, dropping the oldest entry if the queue is at capacity.
    pub async fn push(&self, alert: Alert) {
        let mut entries = self.entries.lock().await;
        if entries.len() >= queue_consts::CAPACITY {
            if let Some(dropped) = entries.pop_front() {
                warn!(
                    fingerprint = %dropped.alert.fingerprint,
                    "alert queue at capacity, dropping oldest entry"
                );
            }
        }
        entries.push_back(QueuedAlert {
            alert,
            enqueued_at: self.clock.now(),
        });
    }

    /// Drains the queue in FIFO order, dropping entries older than the TTL.
    pub async fn drain(&self) -> Vec<Alert> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();
        let mut drained = Vec::with_capacity(entries.len());

        while let Some(entry) = entries.pop_front() {
            let age = now - entry.enqueued_at;
            if age.to_std().unwrap_or_default() > queue_consts::ENTRY_TTL {
                warn!(fingerprint = %entry.alert.fingerprint, "dropping stale queued alert past TTL");
                continue;
            }
            drained.push(entry.alert);
        }

        drained
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_doubles::FixedClock;
    use std::collections::HashMap;

    fn sample_alert(fingerprint: &str, starts_at: DateTime<Utc>) -> Alert {
        Alert {
            alertname: "ContainerDown".into(),
            instance: "nexus:9323".into(),
            severity: "critical".into(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
            starts_at,
            ends_at: None,
            status: crate::models::AlertStatus::Firing,
            fingerprint: fingerprint.into(),
        }
    }

    #[tokio::test]
    async fn drains_in_fifo_order() {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let queue = AlertQueue::new(clock);
        queue.push(sample_alert("F1", Utc::now())).await;
        queue.push(sample_alert("F2", Utc::now())).await;
        let drained = queue.drain().await;
        assert_eq!(drained[0].fingerprint, "F1");
        assert_eq!(drained[1].fingerprint, "F2");
    }

    #[tokio::test]
    async fn overflow_drops_oldest() {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let queue = AlertQueue::new(clock);
        for i in 0..queue_consts::CAPACITY + 5 {
            queue.push(sample_alert(&format!("F{}", i), Utc::now())).await;
        }
        assert_eq!(queue.len().await, queue_consts::CAPACITY);
        let drained = queue.drain().await;
        assert_eq!(drained[0].fingerprint, "F5");
    }

    #[tokio::test]
    async fn stale_entries_dropped_on_drain() {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let queue = AlertQueue::new(clock.clone());
        queue.push(sample_alert("F1", Utc::now())).await;
        clock.advance(chrono::Duration::seconds(3601));
        let drained = queue.drain().await;
        assert!(drained.is_empty());
    }
}
