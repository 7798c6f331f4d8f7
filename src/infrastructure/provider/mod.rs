//! Provider adapters - one per wire protocol.
//!
//! The conversation stays provider-neutral; translation in both directions
//! happens only here.

pub mod anthropic;
pub mod http;
pub mod openai;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use tracing::warn;
use utoipa::ToSchema;

use crate::application::composer::ComposedToolset;
use crate::config::ProvidersConfig;
use crate::domain::conversation::ConversationState;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;
pub use types::{ModelConfig, ProviderCredentials, ProviderError, ProviderReply};

pub(crate) const PROVIDER_ANTHROPIC: &str = "anthropic";
pub(crate) const PROVIDER_OPENAI: &str = "openai";

/// Translate the composed toolset and conversation into a provider request,
/// and the provider's response back into normalized form.
///
/// `parse_response` takes the conversation mutably only to mint invocation
/// ids for protocols that omit them; turns are never touched here, so a
/// protocol error leaves the conversation exactly as it was.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> &'static str;

    fn build_request(
        &self,
        conversation: &ConversationState,
        toolset: &ComposedToolset,
        config: &ModelConfig,
    ) -> Result<Value, ProviderError>;

    fn parse_response(
        &self,
        raw: Value,
        conversation: &mut ConversationState,
    ) -> Result<ProviderReply, ProviderError>;

    async fn complete(
        &self,
        conversation: &mut ConversationState,
        toolset: &ComposedToolset,
        config: &ModelConfig,
    ) -> Result<ProviderReply, ProviderError>;
}

/// Which wire protocol a session speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => PROVIDER_ANTHROPIC,
            ProviderKind::OpenAi => PROVIDER_OPENAI,
        }
    }
}

/// Resolve an API key from the environment when the caller did not supply one.
pub fn resolve_api_key(provider: &str, env_var: &str) -> Option<String> {
    match env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        Ok(_) => None,
        Err(err) => {
            warn!(provider, env_var, %err, "API key environment variable is not set");
            None
        }
    }
}

/// Factory building an adapter per call from the selected protocol, per-call
/// credentials, and configured defaults. Credentials are consumed here and
/// never stored anywhere else.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(
        kind: ProviderKind,
        credentials: ProviderCredentials,
        defaults: &ProvidersConfig,
    ) -> Box<dyn ProviderAdapter> {
        match kind {
            ProviderKind::Anthropic => {
                let api_key = credentials
                    .api_key
                    .or_else(|| resolve_api_key(PROVIDER_ANTHROPIC, "ANTHROPIC_API_KEY"));
                let endpoint = credentials
                    .base_url
                    .or_else(|| Some(defaults.anthropic.endpoint.clone()));
                Box::new(AnthropicAdapter::new(api_key, endpoint))
            }
            ProviderKind::OpenAi => {
                let api_key = credentials
                    .api_key
                    .or_else(|| resolve_api_key(PROVIDER_OPENAI, "OPENAI_API_KEY"));
                let endpoint = credentials
                    .base_url
                    .or_else(|| Some(defaults.openai.endpoint.clone()));
                Box::new(OpenAiAdapter::new(api_key, endpoint))
            }
        }
    }
}
