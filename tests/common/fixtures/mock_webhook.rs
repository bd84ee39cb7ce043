//! Mock notification webhook server.
//!
//! Simulates the endpoint `WebhookNotifier` posts to, capturing payloads so
//! tests can assert on title/severity/dedup_key without a real receiver.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Debug, Clone)]
pub struct CapturedNotification {
    pub body: Value,
}

pub struct MockWebhookServer {
    pub server: MockServer,
    captured: Arc<Mutex<Vec<CapturedNotification>>>,
}

impl MockWebhookServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server, captured: Arc::new(Mutex::new(Vec::new())) }
    }

    pub async fn mock_success(&self) {
        let captured = self.captured.clone();
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(move |req: &Request| {
                if let Ok(body) = req.body_json::<Value>() {
                    let captured = captured.clone();
                    tokio::spawn(async move {
                        captured.lock().await.push(CapturedNotification { body });
                    });
                }
                ResponseTemplate::new(200)
            })
            .mount(&self.server)
            .await;
    }

    pub async fn mock_failure(&self, status_code: u16) {
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(ResponseTemplate::new(status_code))
            .mount(&self.server)
            .await;
    }

    pub async fn captured(&self) -> Vec<CapturedNotification> {
        self.captured.lock().await.clone()
    }

    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.server.uri())
    }

    pub async fn sent_with_title_containing(&self, needle: &str) -> bool {
        self.captured()
            .await
            .iter()
            .any(|n| n.body.get("title").and_then(Value::as_str).map(|t| t.contains(needle)).unwrap_or(false))
    }
}
