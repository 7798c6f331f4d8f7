//! Normalized endpoint descriptors consumed from the API document parser.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Where a parameter value is placed in the outbound HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl ParameterLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::Body => "body",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    /// JSON schema type name exposed to model providers.
    pub fn json_type(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer | ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }

    /// Whether a supplied JSON value satisfies this declared type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Integer | ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
        }
    }
}

/// One parameter of a REST operation, with the user's override layer on top of
/// what the source document declared.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParameterLocation,
    pub value_type: ValueType,
    pub description: String,
    /// Required flag as declared by the source document. Kept for display;
    /// never consulted for enforcement.
    pub declared_required: bool,
    /// The user's choice. This is the single source of truth for the compiled
    /// tool's `required` flag.
    pub user_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Vec<Object>)]
    pub enum_values: Option<Vec<Value>>,
}

/// Wire shape with the parser's looser conventions: the type defaults to
/// string, and an absent `user_required` falls back to the declared flag.
#[derive(Debug, Deserialize)]
struct RawParameterSpec {
    name: String,
    location: ParameterLocation,
    value_type: Option<ValueType>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    declared_required: bool,
    user_required: Option<bool>,
    #[serde(default)]
    default_value: Option<Value>,
    #[serde(default)]
    enum_values: Option<Vec<Value>>,
}

impl<'de> Deserialize<'de> for ParameterSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawParameterSpec::deserialize(deserializer)?;
        Ok(Self {
            user_required: raw.user_required.unwrap_or(raw.declared_required),
            name: raw.name,
            location: raw.location,
            value_type: raw.value_type.unwrap_or(ValueType::String),
            description: raw.description,
            declared_required: raw.declared_required,
            default_value: raw.default_value,
            enum_values: raw.enum_values,
        })
    }
}

/// A normalized REST operation plus the user override layer that decides how
/// (and whether) it becomes a tool.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointDescriptor {
    pub http_method: String,
    pub path_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub request_body_schema: Option<Value>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_description: Option<String>,
}
