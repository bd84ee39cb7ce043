//! Reasoning Agent: a bounded tool-calling loop invoked once Tier 0 / Tier 1
//! lookups in the Learning Engine come up empty or only partially confident.
//! Investigation-first: the agent must gather evidence through read-only
//! tools before it is allowed to call `propose_action`, and a proposal only
//! becomes actionable once `update_confidence` has cleared the minimum gate.

pub mod provider;
pub mod tools;
pub mod types;

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::constants::agent as agent_consts;
use crate::models::Alert;
use crate::traits::{Executor, LogSearch, Monitoring};
use crate::validator::Validator;
use tools::{dispatch_read_only, parse, Tool, ToolOutcome};
use types::{
    AgentError, ChatMessage, CompletionRequest, LlmProvider, StopReason, ToolDefinition,
};

/// Outcome of one investigation episode.
#[derive(Debug, Clone)]
pub enum Verdict {
    ProposedAction {
        host: String,
        commands: Vec<String>,
        rationale: String,
        confidence: f64,
    },
    NoActionableFinding {
        reason: String,
    },
}

/// A Tier 1 hint carried into the episode: a similar past fix the model may
/// confirm, adapt, or discard.
#[derive(Debug, Clone)]
pub struct Hint {
    pub commands: Vec<String>,
    pub similarity: f64,
}

pub struct ReasoningAgent {
    provider: Arc<dyn LlmProvider>,
    validator: Arc<Validator>,
    executor: Arc<dyn Executor>,
    monitoring: Arc<dyn Monitoring>,
    logs: Arc<dyn LogSearch>,
    clock: Arc<dyn Clock>,
}

impl ReasoningAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        validator: Arc<Validator>,
        executor: Arc<dyn Executor>,
        monitoring: Arc<dyn Monitoring>,
        logs: Arc<dyn LogSearch>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ReasoningAgent {
            provider,
            validator,
            executor,
            monitoring,
            logs,
            clock,
        }
    }

    #[instrument(skip(self, hint), fields(alertname = %alert.alertname, instance = %alert.instance))]
    pub async fn investigate(&self, alert: &Alert, hint: Option<Hint>) -> Result<Verdict, AgentError> {
        let deadline = self.clock.now()
            + chrono::Duration::from_std(agent_consts::MAX_DURATION).unwrap_or_default();

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(opening_prompt(alert, hint.as_ref()))];

        let mut confidence: f64 = 0.0;
        let mut proposal: Option<(String, Vec<String>, String)> = None;

        for step in 0..agent_consts::MAX_STEPS {
            if self.clock.now() >= deadline {
                warn!(step, "reasoning episode exceeded its wall-clock budget");
                return Err(AgentError::BudgetExhausted);
            }

            let request = CompletionRequest {
                system: SYSTEM_PROMPT.to_string(),
                messages: messages.clone(),
                tools: tool_definitions(),
                max_tokens: 1024,
                temperature: 0.2,
            };

            let response = self.provider.complete(request).await?;
            messages.push(ChatMessage {
                role: types::Role::Assistant,
                content: response.content.clone(),
                tool_call: None,
                tool_call_id: None,
            });

            match response.stop_reason {
                StopReason::EndTurn | StopReason::MaxTokens => break,
                StopReason::ToolUse => {
                    if response.tool_calls.is_empty() {
                        break;
                    }
                    for call in &response.tool_calls {
                        let outcome = self.handle_call(call, &mut proposal, &mut confidence).await;
                        let rendered = match outcome {
                            Ok(text) => text,
                            Err(err) => format!("error: {}", err),
                        };
                        messages.push(ChatMessage::tool_result(call.id.clone(), rendered));
                    }
                }
            }
        }

        match proposal {
            Some((host, commands, rationale)) if confidence >= agent_consts::MIN_CONFIDENCE_TO_ACT => {
                info!(confidence, "episode produced an actionable proposal");
                Ok(Verdict::ProposedAction { host, commands, rationale, confidence })
            }
            Some(_) => Ok(Verdict::NoActionableFinding {
                reason: format!("confidence {:.2} below minimum {:.2}", confidence, agent_consts::MIN_CONFIDENCE_TO_ACT),
            }),
            None => Ok(Verdict::NoActionableFinding {
                reason: "no action proposed within the step budget".to_string(),
            }),
        }
    }

    /// Whether a proposal at `confidence` may be applied without a human
    /// confirmation step first.
    pub fn may_auto_apply(confidence: f64) -> bool {
        confidence >= agent_consts::MIN_CONFIDENCE_TO_AUTO_APPLY
    }

    async fn handle_call(
        &self,
        call: &types::ToolInvocation,
        proposal: &mut Option<(String, Vec<String>, String)>,
        confidence: &mut f64,
    ) -> Result<String, AgentError> {
        let tool = parse(call)?;
        match tool {
            Tool::ProposeAction { host, commands, rationale } => {
                let summary = format!("proposal recorded for host {} ({} command(s))", host, commands.len());
                *proposal = Some((host, commands, rationale));
                Ok(summary)
            }
            Tool::UpdateConfidence { new_value, rationale } => {
                *confidence = new_value.clamp(0.0, 1.0);
                Ok(format!("confidence set to {:.2}: {}", confidence, rationale))
            }
            other => {
                let outcome = dispatch_read_only(&other, &self.validator, &self.executor, &self.monitoring, &self.logs).await?;
                Ok(render_outcome(outcome))
            }
        }
    }
}

fn render_outcome(outcome: ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Text(text) => text,
        ToolOutcome::ActionProposed { host, commands, .. } => {
            format!("action already proposed for {}: {:?}", host, commands)
        }
        ToolOutcome::ConfidenceUpdated { new_value } => format!("confidence: {:.2}", new_value),
    }
}

const SYSTEM_PROMPT: &str = "\
You are an on-call remediation assistant for a small self-hosted infrastructure fleet. \
Investigate the alert using the read-only tools before proposing any action. \
Never propose a command you have not justified with diagnostic evidence. \
Call update_confidence before concluding, reflecting how certain you are that \
propose_action's commands will resolve the alert.";

fn opening_prompt(alert: &Alert, hint: Option<&Hint>) -> String {
    let mut prompt = format!(
        "Alert firing: {} on {} (severity: {}).\nLabels: {:?}\nAnnotations: {:?}",
        alert.alertname, alert.instance, alert.severity, alert.labels, alert.annotations
    );
    if let Some(hint) = hint {
        prompt.push_str(&format!(
            "\n\nA past remediation for a similar alert (similarity {:.2}) used: {:?}. \
            Confirm it still applies here before reusing it, or propose something else.",
            hint.similarity, hint.commands
        ));
    }
    prompt
}

fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "run_diagnostic".into(),
            description: "Run an allowlisted read-only diagnostic command on a host.".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "host": {"type": "string"},
                    "command": {"type": "string"}
                },
                "required": ["host", "command"]
            }),
        },
        ToolDefinition {
            name: "gather_logs".into(),
            description: "Fetch recent service logs from a host via journalctl.".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "host": {"type": "string"},
                    "service_type": {"type": "string"},
                    "service_name": {"type": "string"},
                    "lines": {"type": "integer"}
                },
                "required": ["host", "service_type", "service_name"]
            }),
        },
        ToolDefinition {
            name: "query_metric".into(),
            description: "Query the monitoring system for a metric, instant or ranged.".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "expr": {"type": "string"},
                    "range": {"type": "integer", "description": "hours of range, omit for an instant query"}
                },
                "required": ["expr"]
            }),
        },
        ToolDefinition {
            name: "query_logs".into(),
            description: "Search the log aggregator.".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "expr": {"type": "string"},
                    "minutes": {"type": "integer"},
                    "limit": {"type": "integer"}
                },
                "required": ["expr"]
            }),
        },
        ToolDefinition {
            name: "check_service_status".into(),
            description: "Check whether a systemd service is active on a host.".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "host": {"type": "string"},
                    "service_type": {"type": "string"},
                    "service_name": {"type": "string"}
                },
                "required": ["host", "service_type", "service_name"]
            }),
        },
        ToolDefinition {
            name: "propose_action".into(),
            description: "Propose the remediation commands to run, with a rationale.".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "host": {"type": "string"},
                    "commands": {"type": "array", "items": {"type": "string"}},
                    "rationale": {"type": "string"}
                },
                "required": ["host", "commands", "rationale"]
            }),
        },
        ToolDefinition {
            name: "update_confidence".into(),
            description: "Set your confidence (0.0-1.0) that the proposed action will resolve the alert.".into(),
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "new_value": {"type": "number"},
                    "rationale": {"type": "string"}
                },
                "required": ["new_value", "rationale"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_doubles::FixedClock;
    use crate::traits::{ActiveAlert, ExecOutcome, ExhaustionPrediction, LogLine, Result as TraitResult, Trend};
    use crate::validator::ValidatorConfig;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct StubProvider {
        responses: StdMutex<Vec<types::CompletionResponse>>,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn complete(&self, _request: CompletionRequest) -> Result<types::CompletionResponse, AgentError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(AgentError::Provider("no more canned responses".into()));
            }
            Ok(responses.remove(0))
        }
    }

    struct NullExecutor;
    #[async_trait]
    impl Executor for NullExecutor {
        async fn execute(&self, _host: &str, _command: &str, _timeout: std::time::Duration) -> TraitResult<ExecOutcome> {
            Ok(ExecOutcome { stdout: String::new(), stderr: String::new(), exit_code: 0 })
        }
        async fn close_all(&self) {}
    }

    struct NullMonitoring;
    #[async_trait]
    impl Monitoring for NullMonitoring {
        async fn query_instant(&self, _expr: &str) -> TraitResult<serde_json::Value> {
            Ok(serde_json::json!({}))
        }
        async fn query_range(&self, _expr: &str, _start: DateTime<Utc>, _end: DateTime<Utc>, _step_s: u64) -> TraitResult<serde_json::Value> {
            Ok(serde_json::json!({}))
        }
        async fn active_alerts(&self) -> TraitResult<Vec<ActiveAlert>> {
            Ok(vec![])
        }
        async fn verify_resolution(&self, _a: &str, _i: &str, _d: std::time::Duration, _p: std::time::Duration) -> TraitResult<(bool, String)> {
            Ok((true, "resolved".into()))
        }
        async fn trend(&self, _metric: &str, _instance: &str, _window_h: u64) -> TraitResult<Trend> {
            Ok(Trend { current: 0.0, min: 0.0, max: 0.0, avg: 0.0, slope: 0.0, direction: "flat".into() })
        }
        async fn predict_exhaustion(&self, _metric: &str, _instance: &str, _threshold: f64) -> TraitResult<ExhaustionPrediction> {
            Ok(ExhaustionPrediction { prediction: "stable".into(), hours_remaining: None })
        }
    }

    struct NullLogs;
    #[async_trait]
    impl LogSearch for NullLogs {
        async fn query(&self, _expr: &str, _start: DateTime<Utc>, _end: DateTime<Utc>, _limit: usize) -> TraitResult<Vec<LogLine>> {
            Ok(vec![])
        }
    }

    fn sample_alert() -> Alert {
        Alert {
            alertname: "ContainerDown".into(),
            instance: "nexus:9323".into(),
            severity: "critical".into(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
            starts_at: Utc::now(),
            ends_at: None,
            status: crate::models::AlertStatus::Firing,
            fingerprint: "fp1".into(),
        }
    }

    #[tokio::test]
    async fn confident_proposal_is_actionable() {
        let propose_call = types::ToolInvocation {
            id: "1".into(),
            name: "propose_action".into(),
            arguments: serde_json::json!({
                "host": "nexus",
                "commands": ["docker restart nginx"],
                "rationale": "container exited"
            }),
        };
        let confidence_call = types::ToolInvocation {
            id: "2".into(),
            name: "update_confidence".into(),
            arguments: serde_json::json!({"new_value": 0.92, "rationale": "clear evidence"}),
        };
        let provider = Arc::new(StubProvider {
            responses: StdMutex::new(vec![types::CompletionResponse {
                content: "proposing a fix".into(),
                tool_calls: vec![propose_call, confidence_call],
                stop_reason: StopReason::ToolUse,
                usage: types::TokenUsage::default(),
            }, types::CompletionResponse {
                content: "done".into(),
                tool_calls: vec![],
                stop_reason: StopReason::EndTurn,
                usage: types::TokenUsage::default(),
            }]),
        });
        let agent = ReasoningAgent::new(
            provider,
            Arc::new(Validator::new(ValidatorConfig::default())),
            Arc::new(NullExecutor),
            Arc::new(NullMonitoring),
            Arc::new(NullLogs),
            Arc::new(FixedClock::at(Utc::now())),
        );
        let verdict = agent.investigate(&sample_alert(), None).await.unwrap();
        match verdict {
            Verdict::ProposedAction { confidence, .. } => assert!(confidence >= 0.90),
            Verdict::NoActionableFinding { reason } => panic!("expected proposal, got: {}", reason),
        }
    }

    #[tokio::test]
    async fn low_confidence_proposal_is_not_actionable() {
        let propose_call = types::ToolInvocation {
            id: "1".into(),
            name: "propose_action".into(),
            arguments: serde_json::json!({
                "host": "nexus",
                "commands": ["docker restart nginx"],
                "rationale": "maybe this"
            }),
        };
        let confidence_call = types::ToolInvocation {
            id: "2".into(),
            name: "update_confidence".into(),
            arguments: serde_json::json!({"new_value": 0.3, "rationale": "uncertain"}),
        };
        let provider = Arc::new(StubProvider {
            responses: StdMutex::new(vec![types::CompletionResponse {
                content: "not sure".into(),
                tool_calls: vec![propose_call, confidence_call],
                stop_reason: StopReason::ToolUse,
                usage: types::TokenUsage::default(),
            }]),
        });
        let agent = ReasoningAgent::new(
            provider,
            Arc::new(Validator::new(ValidatorConfig::default())),
            Arc::new(NullExecutor),
            Arc::new(NullMonitoring),
            Arc::new(NullLogs),
            Arc::new(FixedClock::at(Utc::now())),
        );
        let verdict = agent.investigate(&sample_alert(), None).await.unwrap();
        assert!(matches!(verdict, Verdict::NoActionableFinding { .. }));
    }
}
