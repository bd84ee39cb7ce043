//! Monitoring Client: queries the monitoring system for instant values, range
//! series, and active-alert state, and polls for resolution.
//!
//! Built on the same `reqwest::Client` + `tokio::time::timeout` pattern used
//! throughout the other HTTP clients in this crate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use crate::constants::monitoring as monitoring_consts;
use crate::errors::{RemediatorError, TransientNetworkError};
use crate::traits::{ActiveAlert, ExhaustionPrediction, Monitoring, Result, Trend};

pub struct MonitoringClient {
    http: Client,
    base_url: String,
}

impl MonitoringClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(monitoring_consts::REQUEST_TIMEOUT)
            .build()
            .expect("failed to build monitoring HTTP client");
        MonitoringClient {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get_with_retry(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=monitoring_consts::MAX_RETRIES {
            let resp = self.http.get(&url).query(query).send().await;
            match resp {
                Ok(r) if r.status().is_success() => {
                    return r
                        .json::<serde_json::Value>()
                        .await
                        .map_err(|e| RemediatorError::from(anyhow::anyhow!(e)));
                }
                Ok(r) => {
                    let status = r.status().as_u16();
                    warn!(%url, status, attempt, "monitoring server returned non-success");
                    last_err = Some(TransientNetworkError::MonitoringServerError { status });
                }
                Err(e) => {
                    debug!(%url, attempt, "monitoring request error: {}", e);
                    last_err = Some(TransientNetworkError::Other(e.to_string()));
                }
            }
        }

        Err(RemediatorError::TransientNetwork(
            last_err.unwrap_or(TransientNetworkError::Other("unknown monitoring error".into())),
        ))
    }
}

#[async_trait]
impl Monitoring for MonitoringClient {
    async fn query_instant(&self, expr: &str) -> Result<serde_json::Value> {
        self.get_with_retry("/api/v1/query", &[("query", expr.to_string())]).await
    }

    async fn query_range(&self, expr: &str, start: DateTime<Utc>, end: DateTime<Utc>, step_s: u64) -> Result<serde_json::Value> {
        self.get_with_retry(
            "/api/v1/query_range",
            &[
                ("query", expr.to_string()),
                ("start", start.timestamp().to_string()),
                ("end", end.timestamp().to_string()),
                ("step", step_s.to_string()),
            ],
        )
        .await
    }

    async fn active_alerts(&self) -> Result<Vec<ActiveAlert>> {
        let value = self.get_with_retry("/api/v1/alerts", &[]).await?;
        let alerts = value
            .get("data")
            .and_then(|d| d.get("alerts"))
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        serde_json::from_value(alerts).map_err(|e| RemediatorError::from(anyhow::anyhow!(e)))
    }

    async fn verify_resolution(
        &self,
        alertname: &str,
        instance: &str,
        deadline: Duration,
        poll: Duration,
    ) -> Result<(bool, String)> {
        let deadline_at = tokio::time::Instant::now() + deadline;

        loop {
            match self.active_alerts().await {
                Ok(active) => {
                    let still_firing = active
                        .iter()
                        .any(|a| a.alertname == alertname && a.instance == instance && a.state == "firing");
                    if !still_firing {
                        return Ok((true, "no matching alert remains firing".to_string()));
                    }
                }
                Err(e) => {
                    debug!("verify_resolution poll error: {}", e);
                }
            }

            if tokio::time::Instant::now() >= deadline_at {
                return Ok((false, "verification deadline elapsed".to_string()));
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn trend(&self, metric: &str, instance: &str, window_h: u64) -> Result<Trend> {
        let end = Utc::now();
        let start = end - chrono::Duration::hours(window_h as i64);
        let expr = format!("{}{{instance=\"{}\"}}", metric, instance);
        let series = self.query_range(&expr, start, end, 60).await?;
        Ok(compute_trend(&series))
    }

    async fn predict_exhaustion(&self, metric: &str, instance: &str, threshold: f64) -> Result<ExhaustionPrediction> {
        let trend = self.trend(metric, instance, 6).await?;
        if trend.slope >= 0.0 {
            return Ok(ExhaustionPrediction {
                prediction: "not approaching threshold".to_string(),
                hours_remaining: None,
            });
        }
        let hours_remaining = (trend.current - threshold) / trend.slope.abs();
        Ok(ExhaustionPrediction {
            prediction: format!("{} reaches {} in ~{:.1}h at current trend", metric, threshold, hours_remaining),
            hours_remaining: Some(hours_remaining.max(0.0)),
        })
    }
}

/// Simple linear extrapolation over a flattened series of `(timestamp, value)`
/// pairs found in the raw monitoring JSON response.
fn compute_trend(series: &serde_json::Value) -> Trend {
    let points = extract_points(series);
    if points.is_empty() {
        return Trend {
            current: 0.0,
            min: 0.0,
            max: 0.0,
            avg: 0.0,
            slope: 0.0,
            direction: "unknown".to_string(),
        };
    }

    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let current = values.last().copied().unwrap_or(0.0);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let slope = linear_slope(&points);

    let direction = if slope > 0.01 {
        "rising"
    } else if slope < -0.01 {
        "falling"
    } else {
        "flat"
    };

    Trend {
        current,
        min,
        max,
        avg,
        slope,
        direction: direction.to_string(),
    }
}

fn extract_points(series: &serde_json::Value) -> Vec<(f64, f64)> {
    series
        .get("data")
        .and_then(|d| d.get("result"))
        .and_then(|r| r.as_array())
        .and_then(|arr| arr.first())
        .and_then(|first| first.get("values"))
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|pair| {
                    let arr = pair.as_array()?;
                    let ts = arr.first()?.as_f64()?;
                    let val: f64 = arr.get(1)?.as_str()?.parse().ok()?;
                    Some((ts, val))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn linear_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let numerator: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let denominator: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_on_empty_series_is_flat_and_zeroed() {
        let trend = compute_trend(&serde_json::json!({}));
        assert_eq!(trend.direction, "unknown");
        assert_eq!(trend.current, 0.0);
    }

    #[test]
    fn linear_slope_of_rising_series_is_positive() {
        let points = vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 4.0)];
        assert!(linear_slope(&points) > 0.0);
    }
}
