use super::super::dto::{ErrorResponse, ToolListResponse, ToolView};
use super::super::state::ServerState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/servers/{id}/tools",
    tag = "tools",
    params(("id" = Uuid, Path, description = "Server id")),
    responses(
        (status = 200, description = "Tools exposed by the server", body = ToolListResponse),
        (status = 404, description = "Server not registered", body = ErrorResponse)
    )
)]
pub async fn tools_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ToolListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let server = state.registry().get(&id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "unknown_server",
                format!("server {id} is not registered"),
            )),
        )
    })?;

    debug!(
        server = server.name.as_str(),
        tool_count = server.tools.len(),
        "Serving /servers/{{id}}/tools request"
    );

    let tools: Vec<ToolView> = server
        .tools
        .iter()
        .map(|tool| ToolView {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema(),
        })
        .collect();

    Ok(Json(ToolListResponse {
        server_id: server.id,
        server_name: server.name,
        tool_count: tools.len(),
        tools,
    }))
}
