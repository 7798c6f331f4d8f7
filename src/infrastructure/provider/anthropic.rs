//! Anthropic messages-protocol adapter.
//!
//! Tool definitions travel as a typed array with `input_schema`; responses
//! interleave text and `tool_use` blocks. Invocation ids are provider-assigned
//! and must be echoed back unchanged inside `tool_result` blocks.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::http::HttpProviderBase;
use super::types::{ModelConfig, ProviderError, ProviderReply};
use super::{PROVIDER_ANTHROPIC, ProviderAdapter};
use crate::application::composer::ComposedToolset;
use crate::domain::conversation::{
    ConversationState, InvocationOutcome, StopReason, TokenUsage, ToolInvocation, Turn,
};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";
const API_PATH: &str = "/v1/messages";

pub struct AnthropicAdapter {
    base: HttpProviderBase,
}

impl AnthropicAdapter {
    pub fn new(api_key: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            base: HttpProviderBase::new(
                PROVIDER_ANTHROPIC,
                endpoint.unwrap_or_else(|| DEFAULT_ANTHROPIC_ENDPOINT.to_string()),
                api_key,
            ),
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap, ProviderError> {
        let api_key = self.base.require_api_key()?;
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(api_key).map_err(|_| {
            ProviderError::protocol(self.base.id, "API key is not a valid header value")
        })?;
        headers.insert("x-api-key", key_value);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> &'static str {
        self.base.id
    }

    fn build_request(
        &self,
        conversation: &ConversationState,
        toolset: &ComposedToolset,
        config: &ModelConfig,
    ) -> Result<Value, ProviderError> {
        let tools: Vec<Value> = toolset
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.definition.description,
                    "input_schema": tool.definition.input_schema(),
                })
            })
            .collect();

        let mut payload = json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "messages": render_messages(conversation),
        });
        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }
        if let Some(system) = &config.system_prompt {
            payload["system"] = json!(system);
        }
        Ok(payload)
    }

    fn parse_response(
        &self,
        raw: Value,
        _conversation: &mut ConversationState,
    ) -> Result<ProviderReply, ProviderError> {
        let content = raw
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::protocol(self.base.id, "missing content array"))?;

        let mut text = String::new();
        let mut invocations = Vec::new();
        for block in content {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(fragment) = block.get("text").and_then(Value::as_str) {
                        text.push_str(fragment);
                    }
                }
                Some("tool_use") => {
                    let id = block.get("id").and_then(Value::as_str).ok_or_else(|| {
                        ProviderError::protocol(self.base.id, "tool_use block without id")
                    })?;
                    let name = block.get("name").and_then(Value::as_str).ok_or_else(|| {
                        ProviderError::protocol(self.base.id, "tool_use block without name")
                    })?;
                    invocations.push(ToolInvocation {
                        id: id.to_string(),
                        tool: name.to_string(),
                        arguments: block.get("input").cloned().unwrap_or_else(|| json!({})),
                    });
                }
                _ => {}
            }
        }

        let stop_reason = match raw.get("stop_reason").and_then(Value::as_str) {
            Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            _ => StopReason::Unspecified,
        };
        let usage = TokenUsage {
            input_tokens: raw
                .pointer("/usage/input_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            output_tokens: raw
                .pointer("/usage/output_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        };

        Ok(ProviderReply {
            text: if text.is_empty() { None } else { Some(text) },
            invocations,
            stop_reason,
            usage,
        })
    }

    async fn complete(
        &self,
        conversation: &mut ConversationState,
        toolset: &ComposedToolset,
        config: &ModelConfig,
    ) -> Result<ProviderReply, ProviderError> {
        let headers = self.auth_headers()?;
        let payload = self.build_request(conversation, toolset, config)?;
        let url = self.base.build_url(API_PATH);

        info!(
            provider = self.base.id,
            model = config.model.as_str(),
            turns = conversation.turns.len(),
            tools = toolset.len(),
            "Sending request to Anthropic"
        );

        let raw = self.base.post_json(&url, headers, &payload).await?;
        debug!("Received response from Anthropic");
        self.parse_response(raw, conversation)
    }
}

/// Render conversation turns as wire messages. Consecutive tool-result turns
/// collapse into one user message so every `tool_use` of the preceding
/// assistant message is answered in a single place.
fn render_messages(conversation: &ConversationState) -> Vec<Value> {
    let mut messages = Vec::new();
    let mut pending_results: Vec<Value> = Vec::new();

    for turn in &conversation.turns {
        if let Turn::ToolResult {
            invocation_id,
            outcome,
        } = turn
        {
            pending_results.push(render_tool_result(invocation_id, outcome));
            continue;
        }
        flush_results(&mut messages, &mut pending_results);

        match turn {
            Turn::User { text } => {
                messages.push(json!({"role": "user", "content": text}));
            }
            Turn::Assistant { text, invocations } => {
                let mut blocks = Vec::new();
                if let Some(text) = text {
                    if !text.is_empty() {
                        blocks.push(json!({"type": "text", "text": text}));
                    }
                }
                for invocation in invocations {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": invocation.id,
                        "name": invocation.tool,
                        "input": invocation.arguments,
                    }));
                }
                messages.push(json!({"role": "assistant", "content": blocks}));
            }
            Turn::ToolResult { .. } => {}
        }
    }
    flush_results(&mut messages, &mut pending_results);
    messages
}

fn flush_results(messages: &mut Vec<Value>, pending: &mut Vec<Value>) {
    if !pending.is_empty() {
        messages.push(json!({"role": "user", "content": std::mem::take(pending)}));
    }
}

fn render_tool_result(invocation_id: &str, outcome: &InvocationOutcome) -> Value {
    match outcome {
        InvocationOutcome::Success { result } => json!({
            "type": "tool_result",
            "tool_use_id": invocation_id,
            "content": stringify(result),
        }),
        InvocationOutcome::Error { kind, message } => json!({
            "type": "tool_result",
            "tool_use_id": invocation_id,
            "content": format!("{kind}: {message}"),
            "is_error": true,
        }),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
