//! Tool dispatch for the Reasoning Agent's loop: tools are modeled as a
//! tagged variant and dispatched by tag rather than through dynamic method
//! lookup, per the narrow-interface design guidance — a missing or malformed
//! tool call is a typed [`AgentError`], not a panic.

use std::sync::Arc;

use chrono::Utc;

use crate::agent::types::{AgentError, ToolInvocation};
use crate::constants::timeouts;
use crate::traits::{Executor, LogSearch, Monitoring};
use crate::validator::{Decision, Validator, ValidationContext};

#[derive(Debug, Clone)]
pub enum Tool {
    RunDiagnostic { host: String, command: String },
    GatherLogs { host: String, service_type: String, service_name: String, lines: usize },
    QueryMetric { expr: String, range_hours: Option<u64> },
    QueryLogs { expr: String, minutes: u64, limit: usize },
    CheckServiceStatus { host: String, service_type: String, service_name: String },
    ProposeAction { host: String, commands: Vec<String>, rationale: String },
    UpdateConfidence { new_value: f64, rationale: String },
}

#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Text(String),
    ActionProposed { host: String, commands: Vec<String>, rationale: String },
    ConfidenceUpdated { new_value: f64 },
}

pub fn parse(invocation: &ToolInvocation) -> Result<Tool, AgentError> {
    let args = &invocation.arguments;
    let get_str = |key: &str| -> Result<String, AgentError> {
        args.get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AgentError::MalformedArguments {
                tool: invocation.name.clone(),
                reason: format!("missing string field `{}`", key),
            })
    };

    match invocation.name.as_str() {
        "run_diagnostic" => Ok(Tool::RunDiagnostic {
            host: get_str("host")?,
            command: get_str("command")?,
        }),
        "gather_logs" => Ok(Tool::GatherLogs {
            host: get_str("host")?,
            service_type: get_str("service_type")?,
            service_name: get_str("service_name")?,
            lines: args.get("lines").and_then(|v| v.as_u64()).unwrap_or(100) as usize,
        }),
        "query_metric" => Ok(Tool::QueryMetric {
            expr: get_str("expr")?,
            range_hours: args.get("range").and_then(|v| v.as_u64()),
        }),
        "query_logs" => Ok(Tool::QueryLogs {
            expr: get_str("expr")?,
            minutes: args.get("minutes").and_then(|v| v.as_u64()).unwrap_or(15),
            limit: args.get("limit").and_then(|v| v.as_u64()).unwrap_or(100) as usize,
        }),
        "check_service_status" => Ok(Tool::CheckServiceStatus {
            host: get_str("host")?,
            service_type: get_str("service_type")?,
            service_name: get_str("service_name")?,
        }),
        "propose_action" => {
            let commands = args
                .get("commands")
                .and_then(|v| v.as_array())
                .ok_or_else(|| AgentError::MalformedArguments {
                    tool: invocation.name.clone(),
                    reason: "missing array field `commands`".into(),
                })?
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect();
            Ok(Tool::ProposeAction {
                host: get_str("host")?,
                commands,
                rationale: get_str("rationale")?,
            })
        }
        "update_confidence" => Ok(Tool::UpdateConfidence {
            new_value: args
                .get("new_value")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| AgentError::MalformedArguments {
                    tool: invocation.name.clone(),
                    reason: "missing numeric field `new_value`".into(),
                })?,
            rationale: get_str("rationale")?,
        }),
        other => Err(AgentError::UnknownTool(other.to_string())),
    }
}

/// Executes a read-only (non-mutating) tool against its collaborator.
/// `propose_action` and `update_confidence` are book-keeping and handled by
/// the caller, not here — they never touch the executor.
pub async fn dispatch_read_only(
    tool: &Tool,
    validator: &Validator,
    executor: &Arc<dyn Executor>,
    monitoring: &Arc<dyn Monitoring>,
    logs: &Arc<dyn LogSearch>,
) -> Result<ToolOutcome, AgentError> {
    match tool {
        Tool::RunDiagnostic { host, command } => {
            let ctx = ValidationContext { host, alertname: "" };
            match validator.validate(command, &ctx) {
                Decision::Allow { .. } if validator.is_diagnostic(command) => {
                    let outcome = executor
                        .execute(host, command, timeouts::SSH_COMMAND)
                        .await
                        .map_err(|e| AgentError::Provider(e.to_string()))?;
                    Ok(ToolOutcome::Text(format!("{}{}", outcome.stdout, outcome.stderr)))
                }
                _ => Err(AgentError::MalformedArguments {
                    tool: "run_diagnostic".into(),
                    reason: "command is not classified diagnostic".into(),
                }),
            }
        }
        Tool::GatherLogs { host, service_name, lines, .. } => {
            let command = format!("journalctl -u {} -n {} --no-pager", service_name, lines);
            let outcome = executor
                .execute(host, &command, timeouts::SSH_COMMAND)
                .await
                .map_err(|e| AgentError::Provider(e.to_string()))?;
            Ok(ToolOutcome::Text(outcome.stdout))
        }
        Tool::QueryMetric { expr, range_hours } => {
            let value = if let Some(hours) = range_hours {
                let end = Utc::now();
                let start = end - chrono::Duration::hours(*hours as i64);
                monitoring
                    .query_range(expr, start, end, 60)
                    .await
                    .map_err(|e| AgentError::Provider(e.to_string()))?
            } else {
                monitoring
                    .query_instant(expr)
                    .await
                    .map_err(|e| AgentError::Provider(e.to_string()))?
            };
            Ok(ToolOutcome::Text(value.to_string()))
        }
        Tool::QueryLogs { expr, minutes, limit } => {
            let end = Utc::now();
            let start = end - chrono::Duration::minutes(*minutes as i64);
            let lines = logs
                .query(expr, start, end, *limit)
                .await
                .map_err(|e| AgentError::Provider(e.to_string()))?;
            let rendered = lines.into_iter().map(|l| format!("{} {}", l.ts, l.message)).collect::<Vec<_>>().join("\n");
            Ok(ToolOutcome::Text(rendered))
        }
        Tool::CheckServiceStatus { host, service_name, .. } => {
            let command = format!("systemctl is-active {}", service_name);
            let outcome = executor
                .execute(host, &command, timeouts::SSH_COMMAND)
                .await
                .map_err(|e| AgentError::Provider(e.to_string()))?;
            Ok(ToolOutcome::Text(outcome.stdout.trim().to_string()))
        }
        Tool::ProposeAction { .. } | Tool::UpdateConfidence { .. } => unreachable!(
            "propose_action/update_confidence are book-keeping tools handled by the agent loop"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_tool() {
        let invocation = ToolInvocation {
            id: "1".into(),
            name: "delete_everything".into(),
            arguments: serde_json::json!({}),
        };
        assert!(matches!(parse(&invocation), Err(AgentError::UnknownTool(_))));
    }

    #[test]
    fn parse_propose_action_collects_commands() {
        let invocation = ToolInvocation {
            id: "1".into(),
            name: "propose_action".into(),
            arguments: serde_json::json!({
                "host": "nexus",
                "commands": ["docker restart nginx"],
                "rationale": "container crash-looped",
            }),
        };
        let tool = parse(&invocation).unwrap();
        match tool {
            Tool::ProposeAction { host, commands, .. } => {
                assert_eq!(host, "nexus");
                assert_eq!(commands, vec!["docker restart nginx".to_string()]);
            }
            _ => panic!("expected ProposeAction"),
        }
    }
}
