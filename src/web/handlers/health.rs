//! Liveness/readiness probe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queued_alerts: usize,
    pub hosts_offline: usize,
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let queued_alerts = state.alert_queue.len().await;
    let hosts_offline = state
        .host_monitor
        .all_statuses()
        .await
        .into_iter()
        .filter(|s| !s.is_available())
        .count();

    let status = if queued_alerts > 0 { "degraded" } else { "healthy" };

    (StatusCode::OK, Json(HealthResponse { status, queued_alerts, hosts_offline }))
}
