//! Mock monitoring and log-aggregator servers for testing.
//!
//! Simulates the Prometheus-style `/api/v1/*` endpoints the
//! `MonitoringClient` queries and the Loki-style `/loki/api/v1/query_range`
//! endpoint the `LogClient` queries, without a real backend running.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct MockMonitoringServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockMonitoringServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// No alerts currently firing.
    pub async fn mock_no_active_alerts(&self) {
        Mock::given(method("GET"))
            .and(path("/api/v1/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "alerts": [] }
            })))
            .mount(&self.server)
            .await;
    }

    /// `alertname`/`instance` still firing, as `verify_resolution` would see mid-cooldown.
    pub async fn mock_alert_still_firing(&self, alertname: &str, instance: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v1/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "alerts": [{
                        "alertname": alertname,
                        "instance": instance,
                        "state": "firing",
                        "labels": {},
                    }]
                }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_instant_query(&self, result: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "result": result }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_unavailable(&self) {
        Mock::given(method("GET"))
            .and(path("/api/v1/alerts"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&self.server)
            .await;
    }
}

pub struct MockLogServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockLogServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    pub async fn mock_lines(&self, lines: Vec<(&str, &str)>) {
        let body: Vec<_> = lines
            .into_iter()
            .map(|(ts, message)| json!({ "ts": ts, "message": message, "labels": {} }))
            .collect();

        Mock::given(method("GET"))
            .and(path("/loki/api/v1/query_range"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}
