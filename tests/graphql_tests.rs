//! End-to-end tests of the GraphQL endpoint
//!
//! These tests verify the complete flow from HTTP request to response:
//! - health routes and the SDL export
//! - generated queries and mutations with variables
//! - role checks that deny before the store is touched
//! - audit records that never fail a request

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use docgraph::prelude::*;
use std::sync::{Arc, Mutex};

// =============================================================================
// Test Collaborators
// =============================================================================

#[derive(Clone, Default)]
struct RecordingSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl RecordingSink {
    fn names(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn record(&self, record: &AuditRecord) -> DocGraphResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl AuditSink for FailingSink {
    async fn record(&self, _record: &AuditRecord) -> DocGraphResult<()> {
        Err(DocGraphError::Internal("audit backend down".to_string()))
    }
}

// =============================================================================
// Test Server
// =============================================================================

fn widget_config() -> ResolverConfig {
    ResolverConfig::new(
        EntityDescriptor::new("Widget")
            .field(FieldDescriptor::required("name", FieldKind::String))
            .field(FieldDescriptor::optional("size", FieldKind::Int)),
    )
    .with_input(
        InputShape::new("WidgetInput")
            .field(FieldDescriptor::required("name", FieldKind::String))
            .field(FieldDescriptor::optional("size", FieldKind::Int)),
    )
    .with_hooks(Hooks::new().on_before_delete(|doc, _ctx| async move {
        if doc.get("locked") == Some(&Value::Bool(true)) {
            Ok(HookOutcome::Veto)
        } else {
            Ok(HookOutcome::Continue(()))
        }
    }))
}

fn tokens() -> StaticTokenVerifier {
    StaticTokenVerifier::new()
        .with_token(
            "editor-token",
            Claims {
                uid: "ed".to_string(),
                role: Some("editor".to_string()),
            },
        )
        .with_token(
            "viewer-token",
            Claims {
                uid: "vi".to_string(),
                role: Some("viewer".to_string()),
            },
        )
}

fn create_test_server(builder: ServerBuilder) -> TestServer {
    let app = builder.build().expect("Failed to build app");
    TestServer::try_new(app).expect("Failed to create test server")
}

fn open_server() -> (TestServer, InMemoryDocumentStore, RecordingSink) {
    let store = InMemoryDocumentStore::new();
    let sink = RecordingSink::default();
    let server = create_test_server(
        ServerBuilder::new()
            .with_shared_store(Arc::new(store.clone()))
            .with_audit_sink(sink.clone())
            .register(widget_config()),
    );
    (server, store, sink)
}

async fn graphql(server: &TestServer, query: &str, variables: Value) -> Value {
    let response = server
        .post("/graphql")
        .json(&json!({ "query": query, "variables": variables }))
        .await;
    response.assert_status_ok();
    response.json()
}

async fn add_widget(server: &TestServer, name: &str) -> String {
    let body = graphql(
        server,
        "mutation($data: WidgetInput!) { addWidget(data: $data) { id } }",
        json!({ "data": { "name": name } }),
    )
    .await;
    body["data"]["addWidget"]["id"]
        .as_str()
        .expect("created id")
        .to_string()
}

// =============================================================================
// Health and schema
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let (server, _store, _sink) = open_server();

    for path in ["/health", "/healthz"] {
        let response = server.get(path).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "docgraph");
        assert_eq!(body["entities"], json!(["Widget"]));
    }
}

#[tokio::test]
async fn test_schema_endpoint_serves_sdl() {
    let (server, _store, _sink) = open_server();

    let response = server.get("/graphql/schema").await;
    response.assert_status_ok();

    let sdl = response.text();
    assert!(sdl.contains("type Widget {"));
    assert!(sdl.contains("widgets(data: ListQueryInput): [Widget!]!"));
    assert!(sdl.contains("deleteWidget(id: ID!): Widget"));
}

#[tokio::test]
async fn test_schema_endpoint_hidden_without_introspection() {
    let mut config = AppConfig::default();
    config.graphql.introspection = false;
    let server = create_test_server(
        ServerBuilder::new()
            .with_store(InMemoryDocumentStore::new())
            .with_config(config)
            .register(widget_config()),
    );

    server
        .get("/graphql/schema")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_playground_is_served() {
    let (server, _store, _sink) = open_server();
    let response = server.get("/graphql/playground").await;
    response.assert_status_ok();
    assert!(response.text().contains("/graphql"));
}

// =============================================================================
// Queries and mutations
// =============================================================================

#[tokio::test]
async fn test_add_then_find_over_http() {
    let (server, _store, _sink) = open_server();
    let id = add_widget(&server, "bolt").await;

    let body = graphql(
        &server,
        "query($id: ID!) { widget(id: $id) { id name size } }",
        json!({ "id": id }),
    )
    .await;

    assert!(body.get("errors").is_none());
    assert_eq!(
        body["data"]["widget"],
        json!({ "id": id, "name": "bolt", "size": null })
    );
}

#[tokio::test]
async fn test_find_unknown_id_is_null() {
    let (server, _store, _sink) = open_server();
    let body = graphql(&server, r#"{ widget(id: "nope") { id } }"#, json!({})).await;
    assert_eq!(body["data"]["widget"], Value::Null);
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn test_list_with_limit_and_aliases() {
    let (server, _store, _sink) = open_server();
    for name in ["a", "b", "c"] {
        add_widget(&server, name).await;
    }

    let body = graphql(
        &server,
        "{ few: widgets(data: { limit: 2 }) { name } all: widgets { name } }",
        json!({}),
    )
    .await;

    assert_eq!(body["data"]["few"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["all"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_edit_and_delete_over_http() {
    let (server, store, _sink) = open_server();
    let id = add_widget(&server, "bolt").await;

    let edited = graphql(
        &server,
        "mutation($id: ID!) { editWidget(id: $id, data: { name: \"nut\", size: 2 }) { name size } }",
        json!({ "id": id }),
    )
    .await;
    assert_eq!(edited["data"]["editWidget"], json!({ "name": "nut", "size": 2 }));

    let deleted = graphql(
        &server,
        "mutation($id: ID!) { deleteWidget(id: $id) { id name } }",
        json!({ "id": id }),
    )
    .await;
    assert_eq!(deleted["data"]["deleteWidget"], json!({ "id": id, "name": "nut" }));
    assert_eq!(store.count("widgets"), 0);

    let again = graphql(
        &server,
        "mutation($id: ID!) { deleteWidget(id: $id) { id } }",
        json!({ "id": id }),
    )
    .await;
    assert_eq!(again["data"]["deleteWidget"], Value::Null);
    assert_eq!(again["errors"][0]["extensions"]["code"], "DOCUMENT_NOT_FOUND");
    assert_eq!(again["errors"][0]["path"], json!(["deleteWidget"]));
}

#[tokio::test]
async fn test_vetoed_delete_returns_false() {
    let (server, store, _sink) = open_server();
    let id = add_widget(&server, "bolt").await;
    store
        .merge("widgets", &id, serde_json::from_value(json!({ "locked": true })).unwrap())
        .await
        .unwrap();

    let body = graphql(
        &server,
        "mutation($id: ID!) { deleteWidget(id: $id) { id } }",
        json!({ "id": id }),
    )
    .await;

    assert_eq!(body["data"]["deleteWidget"], json!(false));
    assert_eq!(store.count("widgets"), 1);
}

#[tokio::test]
async fn test_invalid_payload_is_a_validation_error() {
    let (server, store, _sink) = open_server();
    let body = graphql(
        &server,
        "mutation { addWidget(data: { size: 3 }) { id } }",
        json!({}),
    )
    .await;

    assert_eq!(body["data"]["addWidget"], Value::Null);
    assert_eq!(body["errors"][0]["extensions"]["code"], "VALIDATION_ERROR");
    assert_eq!(store.count("widgets"), 0);
}

#[tokio::test]
async fn test_mutation_field_on_query_root_is_rejected() {
    let (server, store, _sink) = open_server();
    let body = graphql(&server, r#"{ addWidget(data: { name: "x" }) { id } }"#, json!({})).await;

    assert_eq!(body["errors"][0]["extensions"]["code"], "GRAPHQL_EXECUTION_ERROR");
    assert_eq!(store.count("widgets"), 0);
}

#[tokio::test]
async fn test_parse_error_has_null_data() {
    let (server, _store, _sink) = open_server();
    let body = graphql(&server, "{ widget(id: ", json!({})).await;

    assert_eq!(body["data"], Value::Null);
    assert_eq!(body["errors"][0]["extensions"]["code"], "GRAPHQL_PARSE_ERROR");
}

#[tokio::test]
async fn test_malformed_request_body_is_a_json_parse_error() {
    let (server, store, _sink) = open_server();

    for body in ["not json", r#"{"variables": {}}"#] {
        let response = server.post("/graphql").text(body).await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["errors"][0]["extensions"]["code"], "GRAPHQL_PARSE_ERROR");
    }
    assert_eq!(store.count("widgets"), 0);
}

#[tokio::test]
async fn test_operation_name_selects_operation() {
    let (server, _store, _sink) = open_server();
    add_widget(&server, "bolt").await;

    let response = server
        .post("/graphql")
        .json(&json!({
            "query": "query A { widgets { name } } query B { __typename }",
            "operationName": "B",
        }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["data"], json!({ "__typename": "Query" }));
}

// =============================================================================
// Authorization
// =============================================================================

fn guarded_server(env: &str) -> (TestServer, InMemoryDocumentStore) {
    let store = InMemoryDocumentStore::new();
    let mut config = AppConfig::default();
    config.env = env.to_string();
    let server = create_test_server(
        ServerBuilder::new()
            .with_shared_store(Arc::new(store.clone()))
            .with_config(config)
            .with_auth_checker(RoleAuthChecker::new(tokens()))
            .register(widget_config().authorize(OperationKind::Add, ["editor"])),
    );
    (server, store)
}

const ADD_BOLT: &str = r#"mutation { addWidget(data: { name: "bolt" }) { id } }"#;

#[tokio::test]
async fn test_missing_token_is_forbidden_and_store_untouched() {
    let (server, store) = guarded_server("production");

    let body = graphql(&server, ADD_BOLT, json!({})).await;

    assert_eq!(body["data"]["addWidget"], Value::Null);
    assert_eq!(body["errors"][0]["extensions"]["code"], "FORBIDDEN");
    assert_eq!(store.count("widgets"), 0);
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    let (server, store) = guarded_server("production");

    let response = server
        .post("/graphql")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer viewer-token"))
        .json(&json!({ "query": ADD_BOLT }))
        .await;
    let body: Value = response.json();

    assert_eq!(body["errors"][0]["extensions"]["code"], "FORBIDDEN");
    assert_eq!(store.count("widgets"), 0);
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let (server, store) = guarded_server("production");

    let response = server
        .post("/graphql")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer forged"))
        .json(&json!({ "query": ADD_BOLT }))
        .await;
    let body: Value = response.json();

    assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHORIZED");
    assert_eq!(store.count("widgets"), 0);
}

#[tokio::test]
async fn test_matching_role_is_allowed() {
    let (server, store) = guarded_server("production");

    let response = server
        .post("/graphql")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer editor-token"))
        .json(&json!({ "query": ADD_BOLT }))
        .await;
    let body: Value = response.json();

    assert!(body.get("errors").is_none());
    assert!(body["data"]["addWidget"]["id"].is_string());
    assert_eq!(store.count("widgets"), 1);
}

#[tokio::test]
async fn test_local_environment_skips_checks() {
    let (server, store) = guarded_server("local");

    let body = graphql(&server, ADD_BOLT, json!({})).await;

    assert!(body.get("errors").is_none());
    assert_eq!(store.count("widgets"), 1);
}

#[tokio::test]
async fn test_unguarded_operations_need_no_token() {
    let (server, _store) = guarded_server("production");
    let body = graphql(&server, "{ widgets { id } }", json!({})).await;
    assert_eq!(body["data"]["widgets"], json!([]));
}

// =============================================================================
// Audit
// =============================================================================

#[tokio::test]
async fn test_each_root_field_is_audited() {
    let (server, _store, sink) = open_server();
    let id = add_widget(&server, "bolt").await;
    graphql(
        &server,
        "query($id: ID!) { widget(id: $id) { id } widgets { id } }",
        json!({ "id": id }),
    )
    .await;

    assert_eq!(sink.names(), vec!["addWidget", "widget", "widgets"]);

    let records = sink.records.lock().unwrap();
    assert_eq!(records[0].operation_type.to_string(), "Mutation");
    assert!(records[0].input.contains("bolt"));
    assert!(records[1].output.contains(&id));
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_request() {
    let store = InMemoryDocumentStore::new();
    let server = create_test_server(
        ServerBuilder::new()
            .with_shared_store(Arc::new(store.clone()))
            .with_audit_sink(FailingSink)
            .register(widget_config()),
    );

    let body = graphql(&server, ADD_BOLT, json!({})).await;

    assert!(body.get("errors").is_none());
    assert_eq!(store.count("widgets"), 1);
}

#[tokio::test]
async fn test_document_audit_writes_logs_collection() {
    let store = InMemoryDocumentStore::new();
    let server = create_test_server(
        ServerBuilder::new()
            .with_shared_store(Arc::new(store.clone()))
            .with_document_audit()
            .register(widget_config()),
    );

    graphql(&server, ADD_BOLT, json!({})).await;

    assert_eq!(store.count("logs"), 1);
    let logs = store.query("logs", &StoreQuery::default()).await.unwrap();
    assert_eq!(logs[0].fields["name"], "addWidget");
    assert_eq!(logs[0].fields["type"], "Mutation");
    assert!(logs[0].fields["createdAt"].is_string());
}
