//! Provider-neutral tool definitions compiled from endpoint descriptors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use super::endpoint::{ParameterLocation, ValueType};

/// Contract for a single tool parameter. `required` carries the user override
/// verbatim; the declared flag from the source document never reaches this
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParameterContract {
    pub name: String,
    pub value_type: ValueType,
    pub required: bool,
    pub description: String,
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Vec<Object>)]
    pub enum_values: Option<Vec<Value>>,
}

/// A named, schema-described callable exposed to an LLM, backed by exactly one
/// REST operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub http_method: String,
    pub path_template: String,
    pub parameters: Vec<ParameterContract>,
}

impl ToolDefinition {
    pub fn parameter(&self, name: &str) -> Option<&ParameterContract> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Render the input contract as a JSON schema object, the shape both wire
    /// protocols consume.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut schema = Map::new();
            schema.insert("type".into(), json!(param.value_type.json_type()));
            schema.insert("description".into(), json!(param.description));
            if let Some(values) = &param.enum_values {
                schema.insert("enum".into(), json!(values));
            }
            properties.insert(param.name.clone(), Value::Object(schema));

            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
