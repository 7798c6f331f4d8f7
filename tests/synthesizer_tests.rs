// Request synthesizer tests against a local HTTP double.

mod common;

use common::{contract, tool};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolbridge::application::composer::{ComposedToolset, compose};
use toolbridge::application::registry::{DeployedServer, ServerRegistry};
use toolbridge::application::synthesizer::{ExecuteError, RequestSynthesizer};
use toolbridge::domain::endpoint::{ParameterLocation, ValueType};
use toolbridge::domain::tool::ToolDefinition;
use uuid::Uuid;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    registry: Arc<ServerRegistry>,
    server_id: Uuid,
    toolset: ComposedToolset,
    synthesizer: RequestSynthesizer,
}

fn harness(tools: Vec<ToolDefinition>, base_url: &str) -> Harness {
    let registry = Arc::new(ServerRegistry::new());
    let server_id = registry
        .register(DeployedServer::new("backend", base_url, tools))
        .expect("register");
    let toolset = compose(&registry, &[server_id]).expect("compose");
    let synthesizer = RequestSynthesizer::new(Arc::clone(&registry), Duration::from_secs(5));
    Harness {
        registry,
        server_id,
        toolset,
        synthesizer,
    }
}

fn get_user_tool() -> ToolDefinition {
    tool(
        "get_user",
        "GET",
        "/users/{user_id}",
        vec![contract(
            "user_id",
            ParameterLocation::Path,
            ValueType::String,
            true,
        )],
    )
}

#[tokio::test]
async fn missing_required_parameter_issues_no_http_call() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;
    let h = harness(vec![get_user_tool()], &upstream.uri());

    let err = h
        .synthesizer
        .execute("get_user", &json!({}), &h.toolset, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExecuteError::MissingRequiredParameter { ref parameter, .. } if parameter == "user_id"
    ));
    let requests = upstream.received_requests().await.expect("recording");
    assert!(requests.is_empty(), "no HTTP call may be attempted");
}

#[tokio::test]
async fn unknown_tool_is_rejected_before_dispatch() {
    let upstream = MockServer::start().await;
    let h = harness(vec![get_user_tool()], &upstream.uri());

    let err = h
        .synthesizer
        .execute("does_not_exist", &json!({}), &h.toolset, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecuteError::UnknownTool { ref tool } if tool == "does_not_exist"));
}

#[tokio::test]
async fn path_values_are_percent_encoded() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&upstream)
        .await;
    let h = harness(vec![get_user_tool()], &upstream.uri());

    h.synthesizer
        .execute("get_user", &json!({"user_id": "a b/c"}), &h.toolset, None)
        .await
        .expect("execute");

    let requests = upstream.received_requests().await.expect("recording");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/users/a%20b%2Fc");
}

#[tokio::test]
async fn unresolved_placeholder_is_a_configuration_error() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;
    // Path declares {user_id} but the contract carries no parameter for it.
    let broken = tool("get_user", "GET", "/users/{user_id}", Vec::new());
    let h = harness(vec![broken], &upstream.uri());

    let err = h
        .synthesizer
        .execute("get_user", &json!({}), &h.toolset, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecuteError::Configuration { .. }));
    assert!(
        upstream
            .received_requests()
            .await
            .expect("recording")
            .is_empty()
    );
}

#[tokio::test]
async fn query_arrays_become_repeated_entries_and_absent_optionals_are_omitted() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&upstream)
        .await;
    let search = tool(
        "list_items",
        "GET",
        "/items",
        vec![
            contract("tag", ParameterLocation::Query, ValueType::Array, true),
            contract("limit", ParameterLocation::Query, ValueType::Integer, false),
        ],
    );
    let h = harness(vec![search], &upstream.uri());

    h.synthesizer
        .execute("list_items", &json!({"tag": ["red", "blue"]}), &h.toolset, None)
        .await
        .expect("execute");

    let requests = upstream.received_requests().await.expect("recording");
    let query = requests[0].url.query().unwrap_or_default();
    assert!(query.contains("tag=red"));
    assert!(query.contains("tag=blue"));
    assert!(!query.contains("limit="), "absent optionals are omitted");
}

#[tokio::test]
async fn headers_cookies_and_body_fields_follow_their_locations() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .mount(&upstream)
        .await;
    let create = tool(
        "create_item",
        "POST",
        "/items",
        vec![
            contract("X-Trace-Id", ParameterLocation::Header, ValueType::String, true),
            contract("session", ParameterLocation::Cookie, ValueType::String, true),
            contract("name", ParameterLocation::Body, ValueType::String, true),
            contract("count", ParameterLocation::Body, ValueType::Integer, false),
        ],
    );
    let h = harness(vec![create], &upstream.uri());

    h.synthesizer
        .execute(
            "create_item",
            &json!({"X-Trace-Id": "t-1", "session": "abc", "name": "widget", "count": 3}),
            &h.toolset,
            None,
        )
        .await
        .expect("execute");

    let requests = upstream.received_requests().await.expect("recording");
    let request = &requests[0];
    assert_eq!(request.headers.get("X-Trace-Id").expect("header"), "t-1");
    assert_eq!(request.headers.get("Cookie").expect("cookie"), "session=abc");
    let body: Value = request.body_json().expect("json body");
    assert_eq!(body, json!({"name": "widget", "count": 3}));
}

#[tokio::test]
async fn type_mismatch_is_rejected_before_dispatch() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;
    let h = harness(vec![get_user_tool()], &upstream.uri());

    let err = h
        .synthesizer
        .execute("get_user", &json!({"user_id": 42}), &h.toolset, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecuteError::TypeMismatch { ref parameter, .. } if parameter == "user_id"));
    assert!(
        upstream
            .received_requests()
            .await
            .expect("recording")
            .is_empty()
    );
}

#[tokio::test]
async fn upstream_error_status_is_returned_with_body() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"detail\":\"no such user\"}"))
        .mount(&upstream)
        .await;
    let h = harness(vec![get_user_tool()], &upstream.uri());

    let err = h
        .synthesizer
        .execute("get_user", &json!({"user_id": "7"}), &h.toolset, None)
        .await
        .unwrap_err();

    match err {
        ExecuteError::UpstreamStatus { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("no such user"));
        }
        other => panic!("expected UpstreamStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_body_is_passed_through_as_text() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text result"))
        .mount(&upstream)
        .await;
    let h = harness(vec![get_user_tool()], &upstream.uri());

    let output = h
        .synthesizer
        .execute("get_user", &json!({"user_id": "7"}), &h.toolset, None)
        .await
        .expect("execute");
    assert_eq!(output.status, 200);
    assert_eq!(output.body, json!("plain text result"));
}

#[tokio::test]
async fn inactive_server_is_rejected_at_dispatch_time() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;
    let h = harness(vec![get_user_tool()], &upstream.uri());

    // Deactivated after composition: dispatch re-checks activity.
    h.registry.set_active(&h.server_id, false).expect("deactivate");

    let err = h
        .synthesizer
        .execute("get_user", &json!({"user_id": "7"}), &h.toolset, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecuteError::ServerInactive { id, .. } if id == h.server_id));
    assert!(
        upstream
            .received_requests()
            .await
            .expect("recording")
            .is_empty()
    );
}

#[tokio::test]
async fn base_url_update_redirects_subsequent_calls() {
    let old_upstream = MockServer::start().await;
    let new_upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "old"})))
        .mount(&old_upstream)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "new"})))
        .mount(&new_upstream)
        .await;
    let h = harness(vec![get_user_tool()], &old_upstream.uri());

    let first = h
        .synthesizer
        .execute("get_user", &json!({"user_id": "7"}), &h.toolset, None)
        .await
        .expect("first call");
    assert_eq!(first.body, json!({"from": "old"}));

    h.registry
        .update_base_url(&h.server_id, new_upstream.uri())
        .expect("update");

    let second = h
        .synthesizer
        .execute("get_user", &json!({"user_id": "7"}), &h.toolset, None)
        .await
        .expect("second call");
    assert_eq!(second.body, json!({"from": "new"}));

    // Prior results are untouched and each backend saw exactly one call.
    assert_eq!(first.body, json!({"from": "old"}));
    assert_eq!(old_upstream.received_requests().await.expect("old").len(), 1);
    assert_eq!(new_upstream.received_requests().await.expect("new").len(), 1);
}

#[tokio::test]
async fn authorization_is_injected_only_when_declared() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&upstream)
        .await;
    let declared = tool(
        "get_account",
        "GET",
        "/account",
        vec![contract(
            "Authorization",
            ParameterLocation::Header,
            ValueType::String,
            false,
        )],
    );
    let undeclared = tool("get_status", "GET", "/status", Vec::new());
    let h = harness(vec![declared, undeclared], &upstream.uri());

    h.synthesizer
        .execute("get_account", &json!({}), &h.toolset, Some("Bearer tok"))
        .await
        .expect("declared call");
    h.synthesizer
        .execute("get_status", &json!({}), &h.toolset, Some("Bearer tok"))
        .await
        .expect("undeclared call");

    let requests = upstream.received_requests().await.expect("recording");
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("Authorization").expect("auth"),
        "Bearer tok"
    );
    assert!(requests[1].headers.get("Authorization").is_none());
}

#[tokio::test]
async fn default_values_fill_absent_optionals() {
    let upstream = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&upstream)
        .await;
    let mut limit = contract("limit", ParameterLocation::Query, ValueType::Integer, false);
    limit.default_value = Some(json!(20));
    let listing = tool("list_items", "GET", "/items", vec![limit]);
    let h = harness(vec![listing], &upstream.uri());

    h.synthesizer
        .execute("list_items", &json!({}), &h.toolset, None)
        .await
        .expect("execute");

    let requests = upstream.received_requests().await.expect("recording");
    assert_eq!(requests[0].url.query(), Some("limit=20"));
}
