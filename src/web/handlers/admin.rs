//! Administrative control-surface endpoints: maintenance windows, attempt and
//! pattern history, and the resume/cancel handoff controls named in the
//! external interfaces contract.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Attempt, MaintenanceWindow, Pattern};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct StartMaintenanceRequest {
    pub host: Option<String>,
    pub reason: String,
    pub created_by: String,
}

pub async fn start_maintenance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartMaintenanceRequest>,
) -> Result<Json<MaintenanceWindow>, StatusCode> {
    let window = MaintenanceWindow {
        id: state.random.new_id(),
        host: body.host,
        started_at: state.clock.now(),
        ended_at: None,
        reason: body.reason,
        created_by: body.created_by,
        is_active: true,
    };
    state.attempt_store.start_maintenance(&window).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(window))
}

#[derive(Debug, Deserialize)]
pub struct EndMaintenanceRequest {
    pub id: Uuid,
}

pub async fn end_maintenance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EndMaintenanceRequest>,
) -> Result<StatusCode, StatusCode> {
    state
        .attempt_store
        .end_maintenance(body.id, Utc::now())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_maintenance_windows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MaintenanceWindow>>, StatusCode> {
    state
        .attempt_store
        .list_active_maintenance()
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

pub async fn recent_attempts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Attempt>>, StatusCode> {
    let limit = query.limit.unwrap_or(50);
    state.attempt_store.recent_attempts(limit).await.map(Json).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    pub alertname: String,
    pub limit: Option<u32>,
}

pub async fn recent_patterns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatternQuery>,
) -> Result<Json<Vec<Pattern>>, StatusCode> {
    let limit = query.limit.unwrap_or(20);
    state
        .pattern_store
        .recent_patterns_for_alertname(&query.alertname, limit)
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Deserialize)]
pub struct HandoffKeyRequest {
    pub alertname: String,
    pub instance: String,
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub resumed: bool,
}

pub async fn resume_handoff(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HandoffKeyRequest>,
) -> Result<Json<ResumeResponse>, StatusCode> {
    state
        .orchestrator
        .resume(&body.alertname, &body.instance)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(ResumeResponse { resumed: true }))
}

/// `key` is `"{alertname}|{instance}"`; a colon-delimited key would be
/// ambiguous against instance strings that embed their own `host:port`.
pub async fn cancel_handoff(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> StatusCode {
    let Some((alertname, instance)) = key.rsplit_once('|') else {
        return StatusCode::BAD_REQUEST;
    };
    state.orchestrator.cancel(alertname, instance).await;
    StatusCode::NO_CONTENT
}
