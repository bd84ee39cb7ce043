//! Common test data: sample alerts and hosts shared across business-rule tests.

use std::collections::HashMap;

use chrono::Utc;
use remediator::models::{Alert, AlertStatus, TargetHost};

pub mod alerts {
    pub const CONTAINER_DOWN: &str = "ContainerDown";
    pub const DISK_PRESSURE: &str = "DiskPressure";
    pub const HIGH_MEMORY: &str = "HighMemoryUsage";
}

pub mod instances {
    pub const NEXUS: &str = "nexus:9323";
    pub const OUTPOST: &str = "outpost:9323";
}

pub mod hosts {
    pub const NEXUS: &str = "nexus";
    pub const OUTPOST: &str = "outpost";
}

/// A firing alert with a deterministic fingerprint, ready to hand to the orchestrator.
pub fn sample_alert(alertname: &str, instance: &str) -> Alert {
    let starts_at = Utc::now();
    let fingerprint = Alert::synthesize_fingerprint(alertname, instance, starts_at);
    Alert {
        alertname: alertname.to_string(),
        instance: instance.to_string(),
        severity: "warning".to_string(),
        labels: HashMap::new(),
        annotations: HashMap::new(),
        starts_at,
        ends_at: None,
        status: AlertStatus::Firing,
        fingerprint,
    }
}

pub fn sample_host(name: &str) -> TargetHost {
    TargetHost {
        name: name.to_string(),
        address: format!("{name}.lan"),
        login: "remediator".to_string(),
        key_path: "/dev/null".to_string(),
        localhost: false,
    }
}
