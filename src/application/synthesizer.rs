//! Tool invocation to HTTP request synthesis.
//!
//! Resolves a normalized invocation (tool name + argument object) into path
//! substitutions, query parameters, headers, and a JSON body according to each
//! parameter's declared location, then issues the call against the owning
//! server's current base URL. Upstream failures are returned as values so the
//! agent loop can hand them back to the model.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::composer::ComposedToolset;
use super::registry::ServerRegistry;
use crate::domain::endpoint::ParameterLocation;
use crate::domain::tool::ToolDefinition;

const AUTHORIZATION_PARAMETER: &str = "Authorization";

/// Upstream response, passed through without reinterpretation.
#[derive(Debug, Clone)]
pub struct ToolCallOutput {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("no tool named '{tool}' in the composed toolset")]
    UnknownTool { tool: String },
    #[error("server {id} is not registered")]
    UnknownServer { id: Uuid },
    #[error("server '{name}' ({id}) is inactive")]
    ServerInactive { id: Uuid, name: String },
    #[error("tool '{tool}' arguments must be a JSON object")]
    InvalidArguments { tool: String },
    #[error("required parameter '{parameter}' of tool '{tool}' is missing")]
    MissingRequiredParameter { tool: String, parameter: String },
    #[error("parameter '{parameter}' of tool '{tool}' must be of type {expected}")]
    TypeMismatch {
        tool: String,
        parameter: String,
        expected: &'static str,
    },
    #[error("tool '{tool}' does not match its endpoint: {reason}")]
    Configuration { tool: String, reason: String },
    #[error("upstream request to {url} failed: {source}")]
    UpstreamUnavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upstream returned HTTP {status}")]
    UpstreamStatus { status: u16, body: String },
}

impl ExecuteError {
    /// Taxonomy kind carried in tool-result error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecuteError::UnknownTool { .. } => "unknown_tool",
            ExecuteError::UnknownServer { .. } => "unknown_server",
            ExecuteError::ServerInactive { .. } => "server_inactive",
            ExecuteError::InvalidArguments { .. } | ExecuteError::TypeMismatch { .. } => {
                "type_mismatch"
            }
            ExecuteError::MissingRequiredParameter { .. } => "missing_required_parameter",
            ExecuteError::Configuration { .. } => "configuration_error",
            ExecuteError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ExecuteError::UpstreamStatus { .. } => "upstream_status",
        }
    }

    /// Message surfaced to the model. Status errors keep the upstream body so
    /// the model can react to it.
    pub fn detail(&self) -> String {
        match self {
            ExecuteError::UpstreamStatus { status, body } => {
                format!("HTTP {status}: {body}")
            }
            other => other.to_string(),
        }
    }
}

pub struct RequestSynthesizer {
    registry: Arc<ServerRegistry>,
    http: reqwest::Client,
    call_timeout: Duration,
}

impl RequestSynthesizer {
    pub fn new(registry: Arc<ServerRegistry>, call_timeout: Duration) -> Self {
        Self {
            registry,
            http: reqwest::Client::new(),
            call_timeout,
        }
    }

    /// Execute one invocation. Server activity and base URL are read at call
    /// time, never cached from composition.
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: &Value,
        toolset: &ComposedToolset,
        authorization: Option<&str>,
    ) -> Result<ToolCallOutput, ExecuteError> {
        let composed = toolset
            .resolve(tool_name)
            .ok_or_else(|| ExecuteError::UnknownTool {
                tool: tool_name.to_string(),
            })?;
        let server =
            self.registry
                .get(&composed.server_id)
                .ok_or(ExecuteError::UnknownServer {
                    id: composed.server_id,
                })?;
        if !server.active {
            return Err(ExecuteError::ServerInactive {
                id: server.id,
                name: server.name,
            });
        }

        let plan = RequestPlan::build(&composed.definition, arguments, authorization)?;
        let url = format!(
            "{}{}",
            server.base_url.trim_end_matches('/'),
            plan.path_with_leading_slash()
        );

        debug!(
            tool = tool_name,
            method = plan.method.as_str(),
            url = url.as_str(),
            "Dispatching tool call"
        );

        let mut request = self
            .http
            .request(plan.method.clone(), &url)
            .timeout(self.call_timeout)
            .headers(plan.headers.clone());
        if !plan.query.is_empty() {
            request = request.query(&plan.query);
        }
        if let Some(body) = &plan.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ExecuteError::UpstreamUnavailable {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ExecuteError::UpstreamUnavailable {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            warn!(
                tool = tool_name,
                status = status.as_u16(),
                "Upstream returned error status"
            );
            return Err(ExecuteError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        info!(
            tool = tool_name,
            status = status.as_u16(),
            "Tool call completed"
        );
        Ok(ToolCallOutput {
            status: status.as_u16(),
            body,
        })
    }
}

/// The fully resolved outbound request, built before any I/O so argument
/// errors never cost an HTTP call.
struct RequestPlan {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Value>,
}

impl RequestPlan {
    fn build(
        definition: &ToolDefinition,
        arguments: &Value,
        authorization: Option<&str>,
    ) -> Result<Self, ExecuteError> {
        let empty = Map::new();
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ExecuteError::InvalidArguments {
                    tool: definition.name.clone(),
                });
            }
        };

        let method = Method::from_bytes(definition.http_method.to_uppercase().as_bytes())
            .map_err(|_| ExecuteError::Configuration {
                tool: definition.name.clone(),
                reason: format!("invalid HTTP method '{}'", definition.http_method),
            })?;

        let mut path = definition.path_template.clone();
        let mut query = Vec::new();
        let mut headers = HeaderMap::new();
        let mut cookies = Vec::new();
        let mut body = Map::new();

        for param in &definition.parameters {
            let supplied = arguments.get(&param.name);
            let value = match supplied.or(param.default_value.as_ref()) {
                Some(value) => value,
                None if param.required => {
                    return Err(ExecuteError::MissingRequiredParameter {
                        tool: definition.name.clone(),
                        parameter: param.name.clone(),
                    });
                }
                // Absent optionals are omitted entirely, never sent empty.
                None => continue,
            };
            if !param.value_type.matches(value) {
                return Err(ExecuteError::TypeMismatch {
                    tool: definition.name.clone(),
                    parameter: param.name.clone(),
                    expected: param.value_type.json_type(),
                });
            }

            match param.location {
                ParameterLocation::Path => {
                    let placeholder = format!("{{{}}}", param.name);
                    let encoded = urlencoding::encode(&scalar_string(value)).into_owned();
                    path = path.replace(&placeholder, &encoded);
                }
                ParameterLocation::Query => match value {
                    Value::Array(items) => {
                        for item in items {
                            query.push((param.name.clone(), scalar_string(item)));
                        }
                    }
                    other => query.push((param.name.clone(), scalar_string(other))),
                },
                ParameterLocation::Header => {
                    insert_header(&mut headers, definition, &param.name, &scalar_string(value))?;
                }
                ParameterLocation::Cookie => {
                    cookies.push(format!("{}={}", param.name, scalar_string(value)));
                }
                ParameterLocation::Body => {
                    body.insert(param.name.clone(), value.clone());
                }
            }
        }

        if let Some(unresolved) = unresolved_placeholder(&path) {
            return Err(ExecuteError::Configuration {
                tool: definition.name.clone(),
                reason: format!("unresolved path placeholder '{{{unresolved}}}'"),
            });
        }

        if !cookies.is_empty() {
            insert_header(&mut headers, definition, "Cookie", &cookies.join("; "))?;
        }

        // Caller-supplied upstream credential: injected only when the contract
        // declares the header and the model left it out.
        if let Some(auth) = authorization {
            let declares_auth = definition
                .parameter(AUTHORIZATION_PARAMETER)
                .is_some_and(|p| p.location == ParameterLocation::Header);
            if declares_auth && !headers.contains_key(reqwest::header::AUTHORIZATION) {
                insert_header(&mut headers, definition, AUTHORIZATION_PARAMETER, auth)?;
            }
        }

        Ok(Self {
            method,
            path,
            query,
            headers,
            body: if body.is_empty() {
                None
            } else {
                Some(Value::Object(body))
            },
        })
    }

    fn path_with_leading_slash(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }
}

/// Render a JSON value the way it should appear inside a URL or header:
/// strings verbatim, everything else as compact JSON.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unresolved_placeholder(path: &str) -> Option<&str> {
    let start = path.find('{')?;
    let rest = &path[start + 1..];
    let end = rest.find('}')?;
    Some(&rest[..end])
}

fn insert_header(
    headers: &mut HeaderMap,
    definition: &ToolDefinition,
    name: &str,
    value: &str,
) -> Result<(), ExecuteError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| ExecuteError::Configuration {
            tool: definition.name.clone(),
            reason: format!("invalid header name '{name}'"),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|_| ExecuteError::TypeMismatch {
        tool: definition.name.clone(),
        parameter: name.to_string(),
        expected: "string",
    })?;
    headers.insert(header_name, header_value);
    Ok(())
}
