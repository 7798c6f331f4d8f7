//! Tool synthesis, multi-server registry, and provider-agnostic agent
//! execution.
//!
//! REST API descriptions come in as normalized endpoint descriptors; they are
//! compiled into provider-neutral tools, registered per deployed server, and
//! exposed to an LLM through a multi-turn agent loop that executes the tools
//! against the live backends.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{
    AgentRunner, ComposedToolset, DeployedServer, RequestSynthesizer, ServerRegistry, compose,
};
pub use cli::Cli;
pub use config::AppConfig;
pub use domain::{ConversationState, EndpointDescriptor, ToolDefinition};
pub use infrastructure::{provider, server};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing();
    dotenvy::dotenv().ok();
    info!("Starting toolbridge");

    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration from default path");
    }
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    let registry = Arc::new(ServerRegistry::new());
    let addr = config.listen_addr;
    info!(%addr, "Starting REST server");
    server::serve(registry, config, addr).await?;
    info!("Server execution finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
