//! Toolset composition across deployed servers.
//!
//! One session may span several servers; the composed set is the single
//! namespace the model sees, with every tool still owned by exactly one
//! server.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::registry::ServerRegistry;
use crate::domain::tool::ToolDefinition;

/// One tool in a composed session. `name` is the session-visible name, which
/// differs from `definition.name` when collision renaming applied.
#[derive(Debug, Clone)]
pub struct ComposedTool {
    pub name: String,
    pub server_id: Uuid,
    pub definition: ToolDefinition,
}

/// Ephemeral, session-scoped namespace of tools. Rebuilt at session start;
/// never persisted.
#[derive(Debug, Default)]
pub struct ComposedToolset {
    tools: Vec<ComposedTool>,
    index: HashMap<String, usize>,
}

impl ComposedToolset {
    pub fn resolve(&self, name: &str) -> Option<&ComposedTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Tools in composition order.
    pub fn iter(&self) -> impl Iterator<Item = &ComposedTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn insert(&mut self, tool: ComposedTool) {
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("server {id} is not registered")]
    UnknownServer { id: Uuid },
    #[error("server '{name}' ({id}) is inactive")]
    ServerInactive { id: Uuid, name: String },
}

/// Merge the toolsets of the given servers, in order. A name already taken by
/// an earlier server gets the later server's short id appended; nothing is
/// dropped, so the composed count always equals the sum of the inputs.
///
/// Activity is validated here once; a server deactivated mid-session fails at
/// dispatch, not retroactively.
pub fn compose(
    registry: &ServerRegistry,
    server_ids: &[Uuid],
) -> Result<ComposedToolset, ComposeError> {
    let mut composed = ComposedToolset::default();

    for id in server_ids {
        let server = registry
            .get(id)
            .ok_or(ComposeError::UnknownServer { id: *id })?;
        if !server.active {
            return Err(ComposeError::ServerInactive {
                id: *id,
                name: server.name,
            });
        }

        let short_id = short_id(id);
        for definition in server.tools {
            let mut name = definition.name.clone();
            if composed.resolve(&name).is_some() {
                name = format!("{name}_{short_id}");
                let mut counter = 2usize;
                while composed.resolve(&name).is_some() {
                    name = format!("{}_{short_id}_{counter}", definition.name);
                    counter += 1;
                }
                debug!(
                    tool = definition.name.as_str(),
                    renamed = name.as_str(),
                    server = %id,
                    "Renamed colliding tool"
                );
            }
            composed.insert(ComposedTool {
                name,
                server_id: *id,
                definition,
            });
        }
    }

    info!(
        servers = server_ids.len(),
        tools = composed.len(),
        "Composed session toolset"
    );
    Ok(composed)
}

/// First eight hex characters of the server id, the disambiguation suffix.
fn short_id(id: &Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}
