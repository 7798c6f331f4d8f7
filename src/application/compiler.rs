//! Endpoint descriptor to tool definition compilation.
//!
//! Mechanical translation with one piece of business logic: the compiled
//! `required` flag is the user's override, never the flag the source document
//! declared.

use thiserror::Error;
use tracing::debug;

use crate::domain::endpoint::EndpointDescriptor;
use crate::domain::tool::{ParameterContract, ToolDefinition};

/// Both wire protocols cap tool names; stay inside the stricter limit.
pub const MAX_TOOL_NAME_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("endpoint {method} {path} is selected but has no tool description")]
    MissingDescription { method: String, path: String },
    #[error("parameter '{parameter}' of {method} {path} has no description")]
    MissingParameterDescription {
        method: String,
        path: String,
        parameter: String,
    },
    #[error("tool name '{name}' is not a valid identifier")]
    InvalidToolName { name: String },
}

impl CompileError {
    fn missing_description(descriptor: &EndpointDescriptor) -> Self {
        Self::MissingDescription {
            method: descriptor.http_method.clone(),
            path: descriptor.path_template.clone(),
        }
    }

    fn missing_parameter_description(descriptor: &EndpointDescriptor, parameter: &str) -> Self {
        Self::MissingParameterDescription {
            method: descriptor.http_method.clone(),
            path: descriptor.path_template.clone(),
            parameter: parameter.to_string(),
        }
    }
}

/// Compile one descriptor into a provider-neutral tool definition.
pub fn compile(descriptor: &EndpointDescriptor) -> Result<ToolDefinition, CompileError> {
    let description = descriptor
        .tool_description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if descriptor.selected && description.is_empty() {
        return Err(CompileError::missing_description(descriptor));
    }

    let mut parameters = Vec::with_capacity(descriptor.parameters.len());
    for spec in &descriptor.parameters {
        if spec.description.trim().is_empty() {
            return Err(CompileError::missing_parameter_description(
                descriptor, &spec.name,
            ));
        }
        parameters.push(ParameterContract {
            name: spec.name.clone(),
            value_type: spec.value_type,
            required: spec.user_required,
            description: spec.description.clone(),
            location: spec.location,
            default_value: spec.default_value.clone(),
            enum_values: spec.enum_values.clone(),
        });
    }

    let name = match descriptor.tool_name.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => {
            if !is_valid_identifier(custom) {
                return Err(CompileError::InvalidToolName {
                    name: custom.to_string(),
                });
            }
            truncate(custom)
        }
        _ => default_tool_name(&descriptor.http_method, &descriptor.path_template),
    };

    debug!(
        tool = name.as_str(),
        method = descriptor.http_method.as_str(),
        path = descriptor.path_template.as_str(),
        "Compiled endpoint into tool"
    );

    Ok(ToolDefinition {
        name,
        description: description.to_string(),
        http_method: descriptor.http_method.clone(),
        path_template: descriptor.path_template.clone(),
        parameters,
    })
}

/// Compile every selected descriptor of one deployment, disambiguating name
/// collisions across the batch with a numeric suffix.
pub fn compile_selected(
    descriptors: &[EndpointDescriptor],
) -> Result<Vec<ToolDefinition>, CompileError> {
    let mut tools: Vec<ToolDefinition> = Vec::new();

    for descriptor in descriptors.iter().filter(|d| d.selected) {
        let mut tool = compile(descriptor)?;
        let base = tool.name.clone();
        let mut suffix = 2usize;
        while tools.iter().any(|existing| existing.name == tool.name) {
            tool.name = suffixed(&base, suffix);
            suffix += 1;
        }
        tools.push(tool);
    }

    Ok(tools)
}

/// Default tool name: `<method>_<sanitized path>`, lower-cased, with runs of
/// non-alphanumeric characters collapsed into single underscores.
pub fn default_tool_name(method: &str, path: &str) -> String {
    let mut sanitized = String::with_capacity(path.len());
    let mut last_was_separator = true;
    for ch in path.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch);
            last_was_separator = false;
        } else if !last_was_separator {
            sanitized.push('_');
            last_was_separator = true;
        }
    }
    let sanitized = sanitized.trim_end_matches('_');

    let name = if sanitized.is_empty() {
        method.to_lowercase()
    } else {
        format!("{}_{sanitized}", method.to_lowercase())
    };
    truncate(&name)
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn truncate(name: &str) -> String {
    name.chars().take(MAX_TOOL_NAME_LEN).collect()
}

/// Append `_<n>`, shortening the stem so the result stays within the limit.
fn suffixed(name: &str, n: usize) -> String {
    let suffix = format!("_{n}");
    let keep = MAX_TOOL_NAME_LEN.saturating_sub(suffix.len());
    let stem: String = name.chars().take(keep).collect();
    format!("{stem}{suffix}")
}
