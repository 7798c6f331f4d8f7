// Shared builders for component tests.

#![allow(dead_code)]

use toolbridge::domain::endpoint::{
    EndpointDescriptor, ParameterLocation, ParameterSpec, ValueType,
};
use toolbridge::domain::tool::{ParameterContract, ToolDefinition};

pub fn param(
    name: &str,
    location: ParameterLocation,
    value_type: ValueType,
    required: bool,
) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        location,
        value_type,
        description: format!("The {name} parameter"),
        declared_required: required,
        user_required: required,
        default_value: None,
        enum_values: None,
    }
}

pub fn descriptor(method: &str, path: &str, parameters: Vec<ParameterSpec>) -> EndpointDescriptor {
    EndpointDescriptor {
        http_method: method.to_string(),
        path_template: path.to_string(),
        operation_id: None,
        parameters,
        request_body_schema: None,
        selected: true,
        tool_name: None,
        tool_description: Some(format!("{method} {path}")),
    }
}

pub fn contract(
    name: &str,
    location: ParameterLocation,
    value_type: ValueType,
    required: bool,
) -> ParameterContract {
    ParameterContract {
        name: name.to_string(),
        value_type,
        required,
        description: format!("The {name} parameter"),
        location,
        default_value: None,
        enum_values: None,
    }
}

pub fn tool(
    name: &str,
    method: &str,
    path: &str,
    parameters: Vec<ParameterContract>,
) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: format!("{method} {path}"),
        http_method: method.to_string(),
        path_template: path.to_string(),
        parameters,
    }
}
