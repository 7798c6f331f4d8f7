use super::super::dto::{
    DeployServerRequest, DeployServerResponse, ErrorResponse, ServerSummary, UpdateServerRequest,
};
use super::super::state::ServerState;
use crate::application::compiler::compile_selected;
use crate::application::registry::{DeployedServer, RegistryError};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/servers",
    tag = "servers",
    request_body = DeployServerRequest,
    responses(
        (status = 201, description = "Server deployed", body = DeployServerResponse),
        (status = 400, description = "Descriptors cannot be compiled", body = ErrorResponse),
        (status = 409, description = "Server id already registered", body = ErrorResponse)
    )
)]
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<DeployServerRequest>,
) -> Result<(StatusCode, Json<DeployServerResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!(
        server = payload.name.as_str(),
        endpoints = payload.endpoints.len(),
        "Received /servers deploy request"
    );

    let tools = compile_selected(&payload.endpoints).map_err(|err| {
        error!(%err, "Rejecting deployment: descriptors cannot be compiled");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("configuration_error", err.to_string())),
        )
    })?;

    let server = match payload.id {
        Some(id) => DeployedServer::with_id(id, payload.name, payload.base_url, tools),
        None => DeployedServer::new(payload.name, payload.base_url, tools),
    };
    let name = server.name.clone();
    let tool_count = server.tools.len();

    match state.registry().register(server) {
        Ok(id) => Ok((
            StatusCode::CREATED,
            Json(DeployServerResponse {
                id,
                name,
                tool_count,
            }),
        )),
        Err(err @ RegistryError::AlreadyRegistered { .. }) => Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("already_registered", err.to_string())),
        )),
        Err(err) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("unknown_server", err.to_string())),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/servers",
    tag = "servers",
    responses(
        (status = 200, description = "Registered servers", body = [ServerSummary])
    )
)]
pub async fn list_handler(State(state): State<Arc<ServerState>>) -> Json<Vec<ServerSummary>> {
    let servers = state
        .registry()
        .list()
        .into_iter()
        .map(ServerSummary::from)
        .collect();
    Json(servers)
}

#[utoipa::path(
    patch,
    path = "/servers/{id}",
    tag = "servers",
    params(("id" = Uuid, Path, description = "Server id")),
    request_body = UpdateServerRequest,
    responses(
        (status = 200, description = "Server updated", body = ServerSummary),
        (status = 404, description = "Server not registered", body = ErrorResponse)
    )
)]
pub async fn update_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateServerRequest>,
) -> Result<Json<ServerSummary>, (StatusCode, Json<ErrorResponse>)> {
    let not_found = |err: RegistryError| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("unknown_server", err.to_string())),
        )
    };

    if let Some(base_url) = payload.base_url {
        state
            .registry()
            .update_base_url(&id, base_url)
            .map_err(not_found)?;
    }
    if let Some(active) = payload.active {
        state.registry().set_active(&id, active).map_err(not_found)?;
    }

    match state.registry().get(&id) {
        Some(server) => Ok(Json(ServerSummary::from(server))),
        None => Err(not_found(RegistryError::UnknownServer { id })),
    }
}

#[utoipa::path(
    delete,
    path = "/servers/{id}",
    tag = "servers",
    params(("id" = Uuid, Path, description = "Server id")),
    responses(
        (status = 204, description = "Server removed"),
        (status = 404, description = "Server not registered", body = ErrorResponse)
    )
)]
pub async fn remove_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if state.registry().remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "unknown_server",
                RegistryError::UnknownServer { id }.to_string(),
            )),
        ))
    }
}
