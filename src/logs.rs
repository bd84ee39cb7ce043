//! Log Client: bounded log-query expressions against the log aggregator.
//! No retries — logs are advisory context for the Reasoning Agent, not a
//! correctness-critical path worth retrying.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::constants::logs as logs_consts;
use crate::errors::{RemediatorError, TransientNetworkError};
use crate::traits::{LogLine, LogSearch, Result};

pub struct LogClient {
    http: Client,
    base_url: String,
}

impl LogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(logs_consts::REQUEST_TIMEOUT)
            .build()
            .expect("failed to build log client");
        LogClient {
            http,
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLogLine {
    ts: DateTime<Utc>,
    message: String,
    #[serde(default)]
    labels: std::collections::HashMap<String, String>,
}

#[async_trait]
impl LogSearch for LogClient {
    async fn query(&self, expr: &str, start: DateTime<Utc>, end: DateTime<Utc>, limit: usize) -> Result<Vec<LogLine>> {
        let bounded_limit = limit.min(logs_consts::MAX_LINES_PER_CALL);
        let url = format!("{}/loki/api/v1/query_range", self.base_url);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("query", expr.to_string()),
                ("start", start.timestamp_nanos_opt().unwrap_or_default().to_string()),
                ("end", end.timestamp_nanos_opt().unwrap_or_default().to_string()),
                ("limit", bounded_limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| RemediatorError::TransientNetwork(TransientNetworkError::Other(e.to_string())))?;

        if !resp.status().is_success() {
            return Err(RemediatorError::TransientNetwork(TransientNetworkError::LogServerError {
                status: resp.status().as_u16(),
            }));
        }

        let raw: Vec<RawLogLine> = resp
            .json()
            .await
            .map_err(|e| RemediatorError::from(anyhow::anyhow!(e)))?;

        Ok(raw
            .into_iter()
            .take(bounded_limit)
            .map(|l| LogLine {
                ts: l.ts,
                message: truncate_line(&l.message, logs_consts::MAX_LINE_CHARS),
                labels: l.labels,
            })
            .collect())
    }
}

fn truncate_line(line: &str, max_chars: usize) -> String {
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        line.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_lines_to_500_chars() {
        let long = "x".repeat(600);
        let truncated = truncate_line(&long, 500);
        assert_eq!(truncated.chars().count(), 500);
    }

    #[test]
    fn short_lines_pass_through_unchanged() {
        assert_eq!(truncate_line("short", 500), "short");
    }
}
