//! OpenAI chat-completions adapter (function-calling protocol).
//!
//! Works against OpenAI and compatible gateways via a per-call base URL
//! override. Tool definitions travel as function schemas and function
//! arguments arrive as JSON-encoded strings. Some compatible backends omit
//! tool-call ids entirely; those are synthesized from the conversation's
//! monotonic counter.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::http::HttpProviderBase;
use super::types::{ModelConfig, ProviderError, ProviderReply};
use super::{PROVIDER_OPENAI, ProviderAdapter};
use crate::application::composer::ComposedToolset;
use crate::domain::conversation::{
    ConversationState, InvocationOutcome, StopReason, TokenUsage, ToolInvocation, Turn,
};

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
const API_PATH: &str = "/v1/chat/completions";

pub struct OpenAiAdapter {
    base: HttpProviderBase,
}

impl OpenAiAdapter {
    pub fn new(api_key: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            base: HttpProviderBase::new(
                PROVIDER_OPENAI,
                endpoint.unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
                api_key,
            ),
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap, ProviderError> {
        let api_key = self.base.require_api_key()?;
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
            ProviderError::protocol(self.base.id, "API key is not a valid header value")
        })?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
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
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.definition.description,
                        "parameters": tool.definition.input_schema(),
                    },
                })
            })
            .collect();

        let mut payload = json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "messages": render_messages(conversation, config.system_prompt.as_deref()),
        });
        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }
        Ok(payload)
    }

    fn parse_response(
        &self,
        raw: Value,
        conversation: &mut ConversationState,
    ) -> Result<ProviderReply, ProviderError> {
        let message = raw
            .pointer("/choices/0/message")
            .ok_or_else(|| ProviderError::protocol(self.base.id, "missing choices[0].message"))?;

        let text = message
            .get("content")
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
            .map(str::to_string);

        // Validate the whole batch before minting ids so a malformed response
        // leaves the conversation untouched.
        let mut parsed_calls: Vec<(Option<String>, String, Value)> = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                let name = call
                    .pointer("/function/name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ProviderError::protocol(self.base.id, "tool call without function name")
                    })?;
                let raw_arguments = call
                    .pointer("/function/arguments")
                    .and_then(Value::as_str)
                    .unwrap_or("{}");
                let arguments: Value = serde_json::from_str(raw_arguments).map_err(|e| {
                    ProviderError::protocol(
                        self.base.id,
                        format!("tool call arguments are not valid JSON: {e}"),
                    )
                })?;
                let id = call
                    .get("id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string);
                parsed_calls.push((id, name.to_string(), arguments));
            }
        }

        let invocations = parsed_calls
            .into_iter()
            .map(|(id, tool, arguments)| ToolInvocation {
                id: id.unwrap_or_else(|| conversation.next_invocation_id()),
                tool,
                arguments,
            })
            .collect();

        let stop_reason = match raw
            .pointer("/choices/0/finish_reason")
            .and_then(Value::as_str)
        {
            Some("stop") => StopReason::EndTurn,
            Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::Unspecified,
        };
        let usage = TokenUsage {
            input_tokens: raw
                .pointer("/usage/prompt_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            output_tokens: raw
                .pointer("/usage/completion_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        };

        Ok(ProviderReply {
            text,
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
            "Sending request to OpenAI-compatible provider"
        );

        let raw = self.base.post_json(&url, headers, &payload).await?;
        debug!("Received response from OpenAI-compatible provider");
        self.parse_response(raw, conversation)
    }
}

fn render_messages(conversation: &ConversationState, system_prompt: Option<&str>) -> Vec<Value> {
    let mut messages = Vec::new();
    if let Some(system) = system_prompt {
        messages.push(json!({"role": "system", "content": system}));
    }

    for turn in &conversation.turns {
        match turn {
            Turn::User { text } => {
                messages.push(json!({"role": "user", "content": text}));
            }
            Turn::Assistant { text, invocations } => {
                let mut message = json!({
                    "role": "assistant",
                    "content": text.clone().unwrap_or_default(),
                });
                if !invocations.is_empty() {
                    message["tool_calls"] = json!(
                        invocations
                            .iter()
                            .map(|invocation| {
                                json!({
                                    "id": invocation.id,
                                    "type": "function",
                                    "function": {
                                        "name": invocation.tool,
                                        "arguments": invocation.arguments.to_string(),
                                    },
                                })
                            })
                            .collect::<Vec<Value>>()
                    );
                }
                messages.push(message);
            }
            Turn::ToolResult {
                invocation_id,
                outcome,
            } => {
                let content = match outcome {
                    InvocationOutcome::Success { result } => stringify(result),
                    InvocationOutcome::Error { kind, message } => format!("{kind}: {message}"),
                };
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": invocation_id,
                    "content": content,
                }));
            }
        }
    }
    messages
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
