//! Alertmanager-style webhook intake.
//!
//! Accepts the standard `{status, alerts: [...]}` envelope. Each alert is
//! converted into an [`Alert`] and handed to the orchestrator individually;
//! an empty `alerts` array is a valid no-op, not an error.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{Alert, AlertStatus};
use crate::orchestrator::Outcome;
use crate::web::middleware::WebhookAuth;
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub status: Option<String>,
    #[serde(default)]
    pub alerts: Vec<WebhookAlert>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookAlert {
    pub status: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(rename = "startsAt")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(rename = "endsAt")]
    pub ends_at: Option<DateTime<Utc>>,
    pub fingerprint: Option<String>,
}

impl WebhookAlert {
    fn into_alert(self, envelope_status: Option<&str>) -> Option<Alert> {
        let alertname = self.labels.get("alertname").cloned()?;
        let instance = self.labels.get("instance").cloned().unwrap_or_else(|| alertname.clone());
        let severity = self.labels.get("severity").cloned().unwrap_or_else(|| "warning".to_string());
        let starts_at = self.starts_at.unwrap_or_else(Utc::now);
        let status = match self.status.as_deref().or(envelope_status) {
            Some("resolved") => AlertStatus::Resolved,
            _ => AlertStatus::Firing,
        };
        let fingerprint = self
            .fingerprint
            .unwrap_or_else(|| Alert::synthesize_fingerprint(&alertname, &instance, starts_at));

        Some(Alert {
            alertname,
            instance,
            severity,
            labels: self.labels,
            annotations: self.annotations,
            starts_at,
            ends_at: self.ends_at,
            status,
            fingerprint,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub processed: usize,
    pub queued: usize,
    pub results: Vec<AlertResult>,
}

#[derive(Debug, Serialize)]
pub struct AlertResult {
    pub alertname: String,
    pub instance: String,
    pub outcome: String,
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Deduplicated => "deduplicated".to_string(),
        Outcome::Queued => "queued".to_string(),
        Outcome::SuppressedMaintenance { reason } => {
            format!("suppressed_maintenance: {}", reason.as_deref().unwrap_or(""))
        }
        Outcome::SuppressedByCascade { root } => format!("suppressed_by_cascade: {}", root),
        Outcome::HostOffline { host } => format!("host_offline: {}", host),
        Outcome::ClearCooldowns => "resolved".to_string(),
        Outcome::Succeeded { attempts } => format!("succeeded after {} attempt(s)", attempts),
        Outcome::Failed { attempts, reason } => format!("failed after {} attempt(s): {}", attempts, reason),
        Outcome::Escalated { reason, attempts } => format!("escalated after {} attempt(s): {}", attempts, reason),
    }
}

pub async fn receive_alerts(
    _auth: WebhookAuth,
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<WebhookEnvelope>,
) -> (StatusCode, Json<WebhookResponse>) {
    let envelope_status = envelope.status.as_deref();
    let mut results = Vec::with_capacity(envelope.alerts.len());
    let mut queued = 0;

    for raw in envelope.alerts {
        let Some(alert) = raw.into_alert(envelope_status) else {
            warn!("dropping webhook alert with no alertname label");
            continue;
        };
        let alertname = alert.alertname.clone();
        let instance = alert.instance.clone();
        let outcome = state.orchestrator.handle_alert(alert.clone()).await;

        if outcome == Outcome::Queued {
            state.alert_queue.push(alert).await;
            queued += 1;
        }

        info!(alertname = %alertname, instance = %instance, outcome = %describe(&outcome), "webhook alert processed");
        results.push(AlertResult { alertname, instance, outcome: describe(&outcome) });
    }

    (StatusCode::OK, Json(WebhookResponse { processed: results.len(), queued, results }))
}
