use super::docs::ApiDoc;
use super::error::ServerError;
use super::routes;
use super::state::ServerState;
use crate::application::agent::AgentRunner;
use crate::application::registry::ServerRegistry;
use crate::application::synthesizer::RequestSynthesizer;
use crate::config::AppConfig;
use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub async fn serve(
    registry: Arc<ServerRegistry>,
    config: AppConfig,
    addr: SocketAddr,
) -> Result<(), ServerError> {
    let api = ApiDoc::openapi();
    info!(%addr, "Binding REST server");

    let synthesizer = Arc::new(RequestSynthesizer::new(
        Arc::clone(&registry),
        config.agent.call_timeout,
    ));
    let runner = AgentRunner::new(synthesizer);
    let state = Arc::new(ServerState::new(registry, runner, config));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", api))
        .route(
            "/servers",
            post(routes::servers::deploy_handler).get(routes::servers::list_handler),
        )
        .route(
            "/servers/{id}",
            axum::routing::patch(routes::servers::update_handler)
                .delete(routes::servers::remove_handler),
        )
        .route("/servers/{id}/tools", get(routes::tools::tools_handler))
        .route("/chat", post(routes::chat::chat_handler))
        .route("/chat/resume", post(routes::chat::resume_handler))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "REST server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}
