use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use geo_graphql::{
    EntityQuery, FieldPath, GraphqlClient, GraphqlClientBuilder, GraphqlClientError,
    GraphqlOperation, NoVariables, Pagination, PaginationError, PaginationStrategy, QueryEngine,
    RetryPolicy, RetryStrategy, SchemaValidationMode,
};

#[derive(Debug, Serialize, Deserialize)]
struct SpacesResponse {
    spaces: Vec<Space>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Space {
    id: String,
}

struct SpacesQuery;

impl GraphqlOperation for SpacesQuery {
    type Variables = NoVariables;
    type ResponseData = SpacesResponse;

    const QUERY: &'static str = "query Spaces { spaces(first: 1) { id } }";
    const OPERATION_NAME: &'static str = "Spaces";
}

struct SpacesSchemaQuery;

impl GraphqlOperation for SpacesSchemaQuery {
    type Variables = NoVariables;
    type ResponseData = Value;

    const QUERY: &'static str = SpacesQuery::QUERY;
    const OPERATION_NAME: &'static str = SpacesQuery::OPERATION_NAME;

    fn response_schema() -> Option<&'static str> {
        Some(
            r#"{
                "type": "object",
                "required": ["spaces"],
                "properties": {
                    "spaces": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["id"],
                            "properties": {"id": {"type": "string"}}
                        }
                    }
                }
            }"#,
        )
    }
}

/// Fails the first request with a 500, then answers normally.
struct FlakyResponder {
    counter: Arc<AtomicUsize>,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.counter.fetch_add(1, Ordering::SeqCst) == 0 {
            ResponseTemplate::new(500).set_body_string("indexer unavailable")
        } else {
            ResponseTemplate::new(200).set_body_json(json!({
                "data": {"spaces": [{"id": "0x01"}]}
            }))
        }
    }
}

/// Serves a fixed, id-ordered triple collection honouring `first`, `skip`
/// and `where.id_gt`, and records every variables payload it receives.
struct TripleStore {
    rows: Vec<Value>,
    seen: Arc<Mutex<Vec<Value>>>,
}

impl Respond for TripleStore {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("request body");
        let variables = body["variables"].clone();
        self.seen.lock().expect("seen lock").push(variables.clone());

        let first = usize::try_from(variables["first"].as_u64().unwrap_or(100)).unwrap_or(100);
        let skip = usize::try_from(variables["skip"].as_u64().unwrap_or(0)).unwrap_or(0);
        let id_gt = variables["where"]["id_gt"].as_str().map(str::to_string);

        let page: Vec<Value> = self
            .rows
            .iter()
            .filter(|row| {
                id_gt
                    .as_deref()
                    .is_none_or(|cursor| row["id"].as_str().unwrap_or_default() > cursor)
            })
            .skip(skip)
            .take(first)
            .cloned()
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({"data": {"triples": page}}))
    }
}

fn triple(id: &str, entity: &str, attribute: &str, value: &str) -> Value {
    json!({
        "id": id,
        "entity": {"name": entity},
        "attribute": {"name": attribute},
        "stringValue": value,
    })
}

fn store_rows() -> Vec<Value> {
    vec![
        triple("0x01", "Star and crescent", "Name", "Star and crescent"),
        triple("0x02", "Law", "Description", "A law for individuals to follow"),
        triple("0x03", "Law", "Name", "Law"),
        triple("0x04", "Geo", "Name", "Geo"),
        triple("0x05", "Geo", "Description", "The knowledge graph"),
    ]
}

fn triples_query(first: u64) -> EntityQuery {
    EntityQuery::new("Triple", "triples")
        .with_first(first)
        .select(FieldPath::new("entity.name"))
        .select(FieldPath::new("attribute.name"))
        .select(FieldPath::new("stringValue"))
}

async fn mount_store(server: &MockServer) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(TripleStore {
            rows: store_rows(),
            seen: seen.clone(),
        })
        .mount(server)
        .await;
    seen
}

fn client(server: &MockServer) -> GraphqlClient {
    GraphqlClientBuilder::new(server.uri())
        .with_service_name("test")
        .with_retry_policy(RetryPolicy::never())
        .build()
        .expect("client")
}

fn ids(rows: &[Value]) -> Vec<&str> {
    rows.iter()
        .map(|row| row["id"].as_str().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn execute_typed_operation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "query": SpacesQuery::QUERY,
            "operationName": SpacesQuery::OPERATION_NAME,
            "variables": {},
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"spaces": [{"id": "0xspace"}]}})),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let data = client
        .execute_strict::<SpacesQuery>(NoVariables {})
        .await
        .expect("query should succeed");

    assert_eq!(data.spaces[0].id, "0xspace");
    let metrics = client.metrics();
    assert_eq!(metrics.requests_total, 1);
    assert_eq!(metrics.requests_success, 1);
}

#[tokio::test]
async fn strict_execution_surfaces_graphql_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errors": [{"message": "boom"}]})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .execute_strict::<SpacesQuery>(NoVariables {})
        .await
        .expect_err("should return GraphQL errors");

    match err {
        GraphqlClientError::GraphqlErrors { errors } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn transport_retry_recovers_from_server_error() {
    let server = MockServer::start().await;
    let counter = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .respond_with(FlakyResponder {
            counter: counter.clone(),
        })
        .mount(&server)
        .await;

    let client = GraphqlClientBuilder::new(server.uri())
        .with_retry_policy(RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(10),
            max_jitter: Duration::ZERO,
            strategy: RetryStrategy::Always,
        })
        .build()
        .expect("client");

    let data = client
        .execute_strict::<SpacesQuery>(NoVariables {})
        .await
        .expect("query should succeed after retry");

    assert_eq!(data.spaces[0].id, "0x01");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(client.metrics().requests_retried, 1);
}

#[tokio::test]
async fn never_policy_sends_once() {
    let server = MockServer::start().await;
    let counter = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .respond_with(FlakyResponder {
            counter: counter.clone(),
        })
        .mount(&server)
        .await;

    let err = client(&server)
        .execute_strict::<SpacesQuery>(NoVariables {})
        .await
        .expect_err("first response is a 500");

    assert!(matches!(err, GraphqlClientError::HttpStatus { .. }));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn response_validation_rejects_bad_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"spaces": [{"id": 7}]}})),
        )
        .mount(&server)
        .await;

    let client = GraphqlClientBuilder::new(server.uri())
        .with_validation_mode(SchemaValidationMode::ResponseOnly)
        .build()
        .expect("client");

    let err = client
        .execute::<SpacesSchemaQuery>(NoVariables {})
        .await
        .expect_err("should fail schema validation");

    assert!(matches!(err, GraphqlClientError::SchemaValidation { .. }));
}

#[tokio::test]
async fn load_schema_introspects_object_types() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"operationName": "IntrospectSchema"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"__schema": {
                "queryType": {"name": "Query"},
                "types": [
                    {"name": "Query", "kind": "OBJECT", "fields": [{"name": "triples"}]},
                    {"name": "Triple", "kind": "OBJECT", "fields": [
                        {"name": "id"}, {"name": "entity"}, {"name": "attribute"}, {"name": "stringValue"}
                    ]},
                    {"name": "String", "kind": "SCALAR", "fields": null}
                ]
            }}
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let schema = client.load_schema().await.expect("schema");

    assert_eq!(QueryEngine::endpoint(&client), server.uri());
    assert!(schema.has_entity_fields("Triple", &["entity", "attribute", "stringValue"]));
    assert!(schema.object("String").is_none());
}

#[tokio::test]
async fn shallow_pagination_follows_id_cursor() {
    let server = MockServer::start().await;
    let seen = mount_store(&server).await;

    let rows = client(&server)
        .query_rows(
            &triples_query(4),
            Pagination::default().with_page_size(2),
        )
        .await
        .expect("rows");

    assert_eq!(ids(&rows), vec!["0x01", "0x02", "0x03", "0x04"]);
    let seen = seen.lock().expect("seen lock");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0]["where"], json!({}));
    assert_eq!(seen[1]["where"], json!({"id_gt": "0x02"}));
}

#[tokio::test]
async fn shallow_pagination_stops_on_short_page() {
    let server = MockServer::start().await;
    let seen = mount_store(&server).await;

    let rows = client(&server)
        .query_rows(
            &triples_query(1_000_000_000),
            Pagination::default().with_page_size(3),
        )
        .await
        .expect("rows");

    assert_eq!(rows.len(), 5);
    assert_eq!(seen.lock().expect("seen lock").len(), 2);
}

#[tokio::test]
async fn skip_pagination_walks_offsets() {
    let server = MockServer::start().await;
    let seen = mount_store(&server).await;

    let rows = client(&server)
        .query_rows(
            &triples_query(5),
            Pagination::default()
                .with_strategy(PaginationStrategy::Skip)
                .with_page_size(2),
        )
        .await
        .expect("rows");

    assert_eq!(ids(&rows), vec!["0x01", "0x02", "0x03", "0x04", "0x05"]);
    let skips: Vec<u64> = seen
        .lock()
        .expect("seen lock")
        .iter()
        .map(|vars| vars["skip"].as_u64().unwrap_or_default())
        .collect();
    assert_eq!(skips, vec![0, 2, 4]);
}

#[tokio::test]
async fn disabled_pagination_sends_one_request() {
    let server = MockServer::start().await;
    let seen = mount_store(&server).await;

    let rows = client(&server)
        .query_rows(
            &triples_query(3),
            Pagination::default().with_strategy(PaginationStrategy::Disabled),
        )
        .await
        .expect("rows");

    assert_eq!(rows.len(), 3);
    let seen = seen.lock().expect("seen lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["first"], json!(3));
}

#[tokio::test]
async fn query_errors_propagate_through_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Type `Query` has no field `triples`"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .query_rows(&triples_query(1), Pagination::default())
        .await
        .expect_err("GraphQL error");

    assert!(matches!(
        err,
        PaginationError::Client(GraphqlClientError::GraphqlErrors { .. })
    ));
}

#[tokio::test]
async fn missing_root_field_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"spaces": []}})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .query_rows(&triples_query(1), Pagination::default())
        .await
        .expect_err("protocol error");

    assert!(matches!(
        err,
        PaginationError::Client(GraphqlClientError::Protocol { .. })
    ));
}
