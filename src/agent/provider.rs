//! Generic chat-completions [`LlmProvider`]: a `reqwest::Client` posting a
//! provider-agnostic JSON body to a configurable base URL. Grounded in the
//! pack's LLM-orchestration client (`rlm-core::llm::client`), stripped down
//! to the one wire shape and one vendor this system needs instead of the
//! router-of-providers the example builds.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{
    AgentError, ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role, StopReason,
    ToolDefinition, ToolInvocation, TokenUsage,
};
use crate::constants::timeouts;

pub struct HttpLlmProvider {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpLlmProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(timeouts::LLM_CALL)
            .build()
            .expect("failed to build LLM HTTP client");
        HttpLlmProvider { http, base_url: base_url.into(), model: model.into(), api_key }
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    tools: Vec<WireTool<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AgentError> {
        let mut messages = vec![WireMessage { role: "system", content: &request.system, tool_call_id: None }];
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: role_str(m.role),
            content: &m.content,
            tool_call_id: m.tool_call_id.as_deref(),
        }));

        let tools = request
            .tools
            .iter()
            .map(|t: &ToolDefinition| WireTool { name: &t.name, description: &t.description, parameters: &t.parameters_schema })
            .collect();

        let body = WireRequest {
            model: &self.model,
            messages,
            tools,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut req = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = tokio::time::timeout(Duration::from_secs(90), req.send())
            .await
            .map_err(|_| AgentError::Provider("LLM request timed out".to_string()))?
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "LLM provider returned a non-success status");
            return Err(AgentError::Provider(format!("provider returned {}", status)));
        }

        let parsed: WireResponse = response.json().await.map_err(|e| AgentError::Provider(e.to_string()))?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| AgentError::Provider("empty choices array".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .filter_map(|call| {
                serde_json::from_str::<serde_json::Value>(&call.function.arguments)
                    .ok()
                    .map(|arguments| ToolInvocation { id: call.id, name: call.function.name, arguments })
            })
            .collect::<Vec<_>>();

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ if !tool_calls.is_empty() => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        };

        let usage = parsed.usage.unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason,
            usage: TokenUsage { input_tokens: usage.prompt_tokens, output_tokens: usage.completion_tokens },
        })
    }
}
