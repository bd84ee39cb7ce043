//! Basic-auth extractor for the webhook ingress endpoint.
//!
//! An `ApiKeyAuth`-style extractor generalized to HTTP Basic auth: requests
//! missing valid credentials are rejected with 401.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::AppState;

pub struct WebhookAuth;

impl FromRequestParts<Arc<AppState>> for WebhookAuth {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some((expected_user, expected_pass)) = state.webhook_ingress_credentials.as_ref() else {
            // No credentials configured: ingress auth is disabled, not bypassed silently
            // in a way that hides misconfiguration - the absence is logged at startup.
            return Ok(WebhookAuth);
        };

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let encoded = header.strip_prefix("Basic ").ok_or(StatusCode::UNAUTHORIZED)?;
        let decoded = STANDARD.decode(encoded).map_err(|_| StatusCode::UNAUTHORIZED)?;
        let decoded = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;
        let (user, pass) = decoded.split_once(':').ok_or(StatusCode::UNAUTHORIZED)?;

        if user == expected_user && pass == expected_pass {
            Ok(WebhookAuth)
        } else {
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
