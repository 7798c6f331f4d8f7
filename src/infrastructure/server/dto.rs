use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::registry::DeployedServer;
use crate::domain::conversation::{ConversationState, StopReason, TokenUsage, ToolInvocation};
use crate::domain::endpoint::EndpointDescriptor;
use crate::infrastructure::provider::ProviderKind;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeployServerRequest {
    pub name: String,
    pub base_url: String,
    /// Normalized endpoint records from the API document parser; only
    /// selected ones become tools.
    pub endpoints: Vec<EndpointDescriptor>,
    /// Optional id owned by the persistence layer.
    #[serde(default)]
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeployServerResponse {
    pub id: Uuid,
    pub name: String,
    pub tool_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServerSummary {
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    pub active: bool,
    pub tool_count: usize,
    pub registered_at: DateTime<Utc>,
}

impl From<DeployedServer> for ServerSummary {
    fn from(server: DeployedServer) -> Self {
        Self {
            id: server.id,
            name: server.name,
            base_url: server.base_url,
            active: server.active,
            tool_count: server.tools.len(),
            registered_at: server.registered_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateServerRequest {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToolView {
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToolListResponse {
    pub server_id: Uuid,
    pub server_name: String,
    pub tools: Vec<ToolView>,
    pub tool_count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatTurnRequest {
    pub message: String,
    /// History from earlier turns; a fresh conversation when absent.
    #[serde(default)]
    pub conversation: Option<ConversationState>,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    /// Provider API key, passed through per call and never persisted.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Provider endpoint override (OpenAI-compatible gateways).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Servers whose toolsets this session spans, in composition order.
    #[serde(default)]
    pub server_ids: Vec<Uuid>,
    /// Upstream Authorization value forwarded to tool calls that declare it.
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// When false, pending invocations are returned to the caller instead of
    /// being executed here.
    #[serde(default = "default_true")]
    pub run_tools: bool,
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResumeTurnRequest {
    pub conversation: ConversationState,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub server_ids: Vec<Uuid>,
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_true")]
    pub run_tools: bool,
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatTurnResponse {
    pub assistant_text: Option<String>,
    pub pending_invocations: Vec<ToolInvocation>,
    pub conversation: ConversationState,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
    pub rounds: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
        }
    }
}
