//! Provider request/reply types and errors.

use thiserror::Error;

use crate::domain::conversation::{StopReason, TokenUsage, ToolInvocation};

/// Per-call model selection. Credentials travel separately and are never
/// stored.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

/// Per-call credentials, passed through from the caller.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub api_key: Option<String>,
    /// Override for OpenAI-compatible gateways.
    pub base_url: Option<String>,
}

/// Normalized provider response: text and/or pending tool invocations.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub text: Option<String>,
    pub invocations: Vec<ToolInvocation>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' rejected the request: HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("provider '{provider}' returned a malformed response: {reason}")]
    Protocol { provider: String, reason: String },
}

impl ProviderError {
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn status(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    pub fn protocol(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Taxonomy kind for structured error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::MissingApiKey { .. } => "provider_missing_api_key",
            ProviderError::Network { .. } | ProviderError::Status { .. } => "provider_error",
            ProviderError::Protocol { .. } => "provider_protocol_error",
        }
    }

    /// User-facing message for the HTTP edge.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::MissingApiKey { provider } => {
                format!("Provider '{provider}' requires an API key. Supply one with the request.")
            }
            ProviderError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Could not connect to provider '{provider}'.")
                } else if source.is_timeout() {
                    format!("Request to provider '{provider}' timed out.")
                } else {
                    format!("Network error while calling provider '{provider}'.")
                }
            }
            ProviderError::Status {
                provider, status, ..
            } => format!("Provider '{provider}' rejected the request (HTTP {status})."),
            ProviderError::Protocol { provider, .. } => {
                format!("Provider '{provider}' returned a response that could not be parsed.")
            }
        }
    }
}
