use super::dto::{
    ChatTurnRequest, ChatTurnResponse, DeployServerRequest, DeployServerResponse, ErrorResponse,
    ResumeTurnRequest, ServerSummary, ToolListResponse, ToolView, UpdateServerRequest,
};
use super::routes;
use crate::domain::conversation::{
    ConversationState, InvocationOutcome, StopReason, TokenUsage, ToolInvocation, Turn,
};
use crate::domain::endpoint::{EndpointDescriptor, ParameterLocation, ParameterSpec, ValueType};
use crate::infrastructure::provider::ProviderKind;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::servers::deploy_handler,
        routes::servers::list_handler,
        routes::servers::update_handler,
        routes::servers::remove_handler,
        routes::tools::tools_handler,
        routes::chat::chat_handler,
        routes::chat::resume_handler
    ),
    components(
        schemas(
            DeployServerRequest,
            DeployServerResponse,
            ServerSummary,
            UpdateServerRequest,
            ToolListResponse,
            ToolView,
            ChatTurnRequest,
            ResumeTurnRequest,
            ChatTurnResponse,
            ErrorResponse,
            EndpointDescriptor,
            ParameterSpec,
            ParameterLocation,
            ValueType,
            ConversationState,
            Turn,
            ToolInvocation,
            InvocationOutcome,
            StopReason,
            TokenUsage,
            ProviderKind
        )
    ),
    tags(
        (name = "servers", description = "Deployed server registry"),
        (name = "tools", description = "Tool listings per deployed server"),
        (name = "chat", description = "Agent conversation turns")
    )
)]
pub(super) struct ApiDoc;
