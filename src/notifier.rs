//! Notification Sink: outbound webhook delivery for terminal and
//! informational remediation events.
//!
//! A `reqwest::Client` POSTing a JSON payload under `tokio::time::timeout`,
//! logging status/body on a non-2xx response and swallowing the send error
//! rather than failing the caller. Escalation pacing lives in the
//! Orchestrator, not here; this module only applies the one-retry-then-drop
//! bound the delivery contract requires.

use reqwest::Client;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::constants::notify;
use crate::traits::{Notification, Notifier, Result};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    body: &'a str,
    severity: &'a str,
    dedup_key: &'a str,
}

pub struct WebhookNotifier {
    webhook_url: String,
    client: Client,
    is_enabled: bool,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        let client = Client::builder()
            .timeout(notify::WEBHOOK_TIMEOUT)
            .build()
            .expect("failed to build notifier HTTP client");

        let is_enabled = !webhook_url.trim().is_empty();
        if !is_enabled {
            warn!("notifier initialized without a webhook URL - notifications will be dropped");
        }

        WebhookNotifier { webhook_url: webhook_url.trim().to_string(), client, is_enabled }
    }

    async fn post_once(&self, notification: &Notification) -> bool {
        let payload = WebhookPayload {
            title: &notification.title,
            body: &notification.body,
            severity: &notification.severity,
            dedup_key: &notification.dedup_key,
        };

        let send = timeout(
            notify::WEBHOOK_TIMEOUT,
            self.client.post(&self.webhook_url).header("Content-Type", "application/json").json(&payload).send(),
        )
        .await;

        match send {
            Ok(Ok(response)) if response.status().is_success() => true,
            Ok(Ok(response)) => {
                let status = response.status();
                warn!(%status, title = %notification.title, "notification webhook returned a non-success status");
                false
            }
            Ok(Err(err)) => {
                warn!(%err, title = %notification.title, "notification webhook request failed");
                false
            }
            Err(_) => {
                warn!(title = %notification.title, "notification webhook timed out");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        if !self.is_enabled {
            info!(title = %notification.title, "notifier disabled, dropping notification");
            return Ok(());
        }

        for attempt in 0..=notify::MAX_RETRIES {
            if self.post_once(&notification).await {
                return Ok(());
            }
            if attempt < notify::MAX_RETRIES {
                warn!(title = %notification.title, "retrying notification delivery once");
            }
        }

        error!(title = %notification.title, "notification delivery failed after retry, dropping");
        Ok(())
    }
}
