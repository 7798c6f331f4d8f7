//! Deployed server registry.
//!
//! The only mutable state shared across conversations. Backed by a sharded
//! concurrent map: readers take snapshots, writers hold a per-entry lock for
//! the duration of one field update.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::tool::ToolDefinition;

/// A registered binding of a compiled toolset to a live base URL.
#[derive(Debug, Clone)]
pub struct DeployedServer {
    pub id: Uuid,
    pub name: String,
    pub base_url: String,
    pub tools: Vec<ToolDefinition>,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

impl DeployedServer {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), name, base_url, tools)
    }

    /// Register under a caller-supplied id, e.g. one owned by the persistence
    /// layer.
    pub fn with_id(
        id: Uuid,
        name: impl Into<String>,
        base_url: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            base_url: base_url.into(),
            tools,
            active: true,
            registered_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("server {id} is not registered")]
    UnknownServer { id: Uuid },
    #[error("server {id} is already registered")]
    AlreadyRegistered { id: Uuid },
}

/// Injectable registry; tests construct isolated instances per case.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: DashMap<Uuid, DeployedServer>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, server: DeployedServer) -> Result<Uuid, RegistryError> {
        let id = server.id;
        if self.servers.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered { id });
        }
        info!(
            server = server.name.as_str(),
            %id,
            tools = server.tools.len(),
            "Registered deployed server"
        );
        self.servers.insert(id, server);
        Ok(id)
    }

    /// Snapshot of one server. Callers that dispatched against an older
    /// snapshot keep the base URL they captured; nothing is rewritten
    /// retroactively.
    pub fn get(&self, id: &Uuid) -> Option<DeployedServer> {
        self.servers.get(id).map(|entry| entry.value().clone())
    }

    pub fn set_active(&self, id: &Uuid, active: bool) -> Result<(), RegistryError> {
        let mut entry = self
            .servers
            .get_mut(id)
            .ok_or(RegistryError::UnknownServer { id: *id })?;
        entry.active = active;
        info!(%id, active, "Updated server activity");
        Ok(())
    }

    /// Swap the stored base URL. Tools are untouched; no recompilation.
    pub fn update_base_url(
        &self,
        id: &Uuid,
        base_url: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let base_url = base_url.into();
        let mut entry = self
            .servers
            .get_mut(id)
            .ok_or(RegistryError::UnknownServer { id: *id })?;
        entry.base_url = base_url;
        info!(%id, base_url = entry.base_url.as_str(), "Updated server base URL");
        Ok(())
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self.servers.remove(id).is_some();
        if removed {
            info!(%id, "Removed deployed server");
        }
        removed
    }

    /// All registered servers, oldest registration first.
    pub fn list(&self) -> Vec<DeployedServer> {
        let mut servers: Vec<DeployedServer> = self
            .servers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        servers.sort_by_key(|server| server.registered_at);
        servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
