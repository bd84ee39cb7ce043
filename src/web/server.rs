//! Binds the control surface: route table, CORS, and HTTP tracing, split
//! between `create_router` and `start_web_server`.

use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::web::{handlers, AppState};

pub async fn start_web_server(state: Arc<AppState>) -> Result<()> {
    let config = state.config_manager.current().await;
    let addr = format!("{}:{}", config.bind_address, config.bind_port);
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("remediator listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook/alerts", post(handlers::receive_alerts))
        .route("/healthz", get(handlers::healthz))
        .route("/maintenance/start", post(handlers::start_maintenance))
        .route("/maintenance/end", post(handlers::end_maintenance))
        .route("/maintenance/windows", get(handlers::list_maintenance_windows))
        .route("/attempts", get(handlers::recent_attempts))
        .route("/patterns", get(handlers::recent_patterns))
        .route("/resume", post(handlers::resume_handoff))
        .route("/cancel/{key}", post(handlers::cancel_handoff))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
