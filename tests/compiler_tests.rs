// Tool compiler tests: naming, description enforcement, and the
// user-required override.

mod common;

use common::{descriptor, param};
use toolbridge::application::compiler::{
    CompileError, MAX_TOOL_NAME_LEN, compile, compile_selected, default_tool_name,
};
use toolbridge::domain::endpoint::{ParameterLocation, ValueType};

#[test]
fn selected_endpoint_without_description_fails() {
    let mut endpoint = descriptor("GET", "/api/users", Vec::new());
    endpoint.tool_description = None;

    let err = compile(&endpoint).unwrap_err();
    assert!(matches!(err, CompileError::MissingDescription { .. }));

    endpoint.tool_description = Some("   ".to_string());
    let err = compile(&endpoint).unwrap_err();
    assert!(matches!(err, CompileError::MissingDescription { .. }));
}

#[test]
fn unselected_endpoint_compiles_without_description() {
    let mut endpoint = descriptor("GET", "/api/users", Vec::new());
    endpoint.selected = false;
    endpoint.tool_description = None;

    let tool = compile(&endpoint).expect("unselected endpoints may compile for preview");
    assert_eq!(tool.name, "get_api_users");
    assert!(tool.description.is_empty());
}

#[test]
fn required_flag_follows_user_override_not_declaration() {
    let mut promoted = param("page", ParameterLocation::Query, ValueType::Integer, false);
    promoted.declared_required = false;
    promoted.user_required = true;

    let mut demoted = param("token", ParameterLocation::Header, ValueType::String, true);
    demoted.declared_required = true;
    demoted.user_required = false;

    let endpoint = descriptor("GET", "/api/items", vec![promoted, demoted]);
    let tool = compile(&endpoint).expect("compile");

    assert!(tool.parameter("page").expect("page").required);
    assert!(!tool.parameter("token").expect("token").required);
}

#[test]
fn parameter_without_description_fails() {
    let mut bad = param("q", ParameterLocation::Query, ValueType::String, false);
    bad.description = String::new();
    let endpoint = descriptor("GET", "/api/search", vec![bad]);

    let err = compile(&endpoint).unwrap_err();
    assert!(matches!(
        err,
        CompileError::MissingParameterDescription { ref parameter, .. } if parameter == "q"
    ));
}

#[test]
fn default_name_sanitizes_path() {
    assert_eq!(
        default_tool_name("GET", "/api/users/{user_id}"),
        "get_api_users_user_id"
    );
    assert_eq!(default_tool_name("POST", "/"), "post");
    assert_eq!(
        default_tool_name("DELETE", "/v1/items/{id}/tags"),
        "delete_v1_items_id_tags"
    );
}

#[test]
fn default_name_is_truncated_to_limit() {
    let path = format!("/api/{}", "segment/".repeat(20));
    let name = default_tool_name("GET", &path);
    assert!(name.len() <= MAX_TOOL_NAME_LEN);
}

#[test]
fn custom_name_must_be_an_identifier() {
    let mut endpoint = descriptor("GET", "/api/users", Vec::new());
    endpoint.tool_name = Some("9lives".to_string());
    let err = compile(&endpoint).unwrap_err();
    assert!(matches!(err, CompileError::InvalidToolName { ref name } if name == "9lives"));

    endpoint.tool_name = Some("fetch-users".to_string());
    assert!(compile(&endpoint).is_err());

    endpoint.tool_name = Some("fetch_users".to_string());
    let tool = compile(&endpoint).expect("valid identifier");
    assert_eq!(tool.name, "fetch_users");
}

#[test]
fn batch_compile_disambiguates_duplicate_names() {
    // Same default name for both: get_api_users
    let first = descriptor("GET", "/api/users", Vec::new());
    let second = descriptor("GET", "/api/users/", Vec::new());

    let tools = compile_selected(&[first, second]).expect("batch compile");
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "get_api_users");
    assert_eq!(tools[1].name, "get_api_users_2");
}

#[test]
fn batch_compile_skips_unselected() {
    let selected = descriptor("GET", "/api/users", Vec::new());
    let mut unselected = descriptor("POST", "/api/users", Vec::new());
    unselected.selected = false;

    let tools = compile_selected(&[selected, unselected]).expect("batch compile");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "get_api_users");
}

#[test]
fn input_schema_reflects_contract() {
    let mut with_enum = param("status", ParameterLocation::Query, ValueType::String, true);
    with_enum.enum_values = Some(vec![serde_json::json!("open"), serde_json::json!("closed")]);
    let endpoint = descriptor("GET", "/api/tickets", vec![with_enum]);

    let tool = compile(&endpoint).expect("compile");
    let schema = tool.input_schema();
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["status"]["type"], "string");
    assert_eq!(schema["properties"]["status"]["enum"][0], "open");
    assert_eq!(schema["required"][0], "status");
}
