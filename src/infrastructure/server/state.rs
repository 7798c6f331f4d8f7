use std::sync::Arc;

use crate::application::agent::AgentRunner;
use crate::application::registry::ServerRegistry;
use crate::config::AppConfig;

pub(crate) struct ServerState {
    registry: Arc<ServerRegistry>,
    runner: AgentRunner,
    config: AppConfig,
}

impl ServerState {
    pub(crate) fn new(registry: Arc<ServerRegistry>, runner: AgentRunner, config: AppConfig) -> Self {
        Self {
            registry,
            runner,
            config,
        }
    }

    pub(crate) fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub(crate) fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    pub(crate) fn config(&self) -> &AppConfig {
        &self.config
    }
}
