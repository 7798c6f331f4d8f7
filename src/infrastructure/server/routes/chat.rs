use super::super::dto::{ChatTurnRequest, ChatTurnResponse, ErrorResponse, ResumeTurnRequest};
use super::super::state::ServerState;
use crate::application::agent::TurnOptions;
use crate::application::composer::{ComposeError, compose};
use crate::infrastructure::provider::{
    ModelConfig, ProviderCredentials, ProviderFactory, ProviderKind,
};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatTurnRequest,
    responses(
        (status = 200, description = "Turn completed", body = ChatTurnResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Referenced server not registered", body = ErrorResponse),
        (status = 409, description = "Referenced server inactive", body = ErrorResponse),
        (status = 502, description = "Model provider failure", body = ErrorResponse)
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        provider = payload.provider.as_str(),
        servers = payload.server_ids.len(),
        "Received /chat request"
    );

    if payload.message.trim().is_empty() {
        error!("Rejecting /chat request due to empty message");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "invalid_request",
                "message cannot be empty",
            )),
        ));
    }

    let toolset = compose_or_reject(&state, &payload.server_ids)?;
    let adapter = ProviderFactory::create(
        payload.provider,
        ProviderCredentials {
            api_key: payload.api_key,
            base_url: payload.base_url,
        },
        &state.config().providers,
    );
    let model = model_config(
        &state,
        payload.provider,
        payload.model,
        payload.system_prompt,
    );
    let options = turn_options(
        &state,
        payload.run_tools,
        payload.max_rounds,
        payload.authorization,
    );
    let mut conversation = payload.conversation.unwrap_or_default();

    match state
        .runner()
        .run_turn(
            adapter.as_ref(),
            &toolset,
            &mut conversation,
            payload.message,
            &model,
            &options,
        )
        .await
    {
        Ok(outcome) => Ok(Json(ChatTurnResponse {
            assistant_text: outcome.assistant_text,
            pending_invocations: outcome.pending_invocations,
            conversation,
            stop_reason: outcome.stop_reason,
            usage: outcome.usage,
            rounds: outcome.rounds,
        })),
        Err(err) => {
            error!(%err, "Agent turn failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(err.kind(), err.user_message())),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/chat/resume",
    tag = "chat",
    request_body = ResumeTurnRequest,
    responses(
        (status = 200, description = "Turn resumed and completed", body = ChatTurnResponse),
        (status = 404, description = "Referenced server not registered", body = ErrorResponse),
        (status = 409, description = "Referenced server inactive", body = ErrorResponse),
        (status = 502, description = "Model provider failure", body = ErrorResponse)
    )
)]
pub async fn resume_handler(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ResumeTurnRequest>,
) -> Result<Json<ChatTurnResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        provider = payload.provider.as_str(),
        servers = payload.server_ids.len(),
        "Received /chat/resume request"
    );

    let toolset = compose_or_reject(&state, &payload.server_ids)?;
    let adapter = ProviderFactory::create(
        payload.provider,
        ProviderCredentials {
            api_key: payload.api_key,
            base_url: payload.base_url,
        },
        &state.config().providers,
    );
    let model = model_config(
        &state,
        payload.provider,
        payload.model,
        payload.system_prompt,
    );
    let options = turn_options(
        &state,
        payload.run_tools,
        payload.max_rounds,
        payload.authorization,
    );
    let mut conversation = payload.conversation;

    match state
        .runner()
        .resume_turn(adapter.as_ref(), &toolset, &mut conversation, &model, &options)
        .await
    {
        Ok(outcome) => Ok(Json(ChatTurnResponse {
            assistant_text: outcome.assistant_text,
            pending_invocations: outcome.pending_invocations,
            conversation,
            stop_reason: outcome.stop_reason,
            usage: outcome.usage,
            rounds: outcome.rounds,
        })),
        Err(err) => {
            error!(%err, "Agent resume failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(err.kind(), err.user_message())),
            ))
        }
    }
}

fn compose_or_reject(
    state: &Arc<ServerState>,
    server_ids: &[Uuid],
) -> Result<crate::application::composer::ComposedToolset, (StatusCode, Json<ErrorResponse>)> {
    compose(state.registry(), server_ids).map_err(|err| {
        error!(%err, "Toolset composition failed");
        let status = match err {
            ComposeError::UnknownServer { .. } => StatusCode::NOT_FOUND,
            ComposeError::ServerInactive { .. } => StatusCode::CONFLICT,
        };
        let kind = match err {
            ComposeError::UnknownServer { .. } => "unknown_server",
            ComposeError::ServerInactive { .. } => "server_inactive",
        };
        (status, Json(ErrorResponse::new(kind, err.to_string())))
    })
}

fn model_config(
    state: &Arc<ServerState>,
    provider: ProviderKind,
    model: Option<String>,
    system_prompt: Option<String>,
) -> ModelConfig {
    let providers = &state.config().providers;
    let default_model = match provider {
        ProviderKind::Anthropic => providers.anthropic.default_model.clone(),
        ProviderKind::OpenAi => providers.openai.default_model.clone(),
    };
    ModelConfig {
        model: model.unwrap_or(default_model),
        max_tokens: state.config().agent.max_tokens,
        system_prompt,
    }
}

fn turn_options(
    state: &Arc<ServerState>,
    run_tools: bool,
    max_rounds: Option<usize>,
    authorization: Option<String>,
) -> TurnOptions {
    let agent = &state.config().agent;
    TurnOptions {
        max_rounds: max_rounds.unwrap_or(agent.max_rounds),
        turn_timeout: agent.turn_timeout,
        run_tools,
        authorization,
    }
}
