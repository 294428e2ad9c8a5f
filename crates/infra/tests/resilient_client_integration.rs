//! Integration tests for the resilient POS client
//!
//! Drives `ResilientClientFactory` → `ResilientPosClient` → `HttpPosApi`
//! against a wiremock server standing in for the POS provider. Retry delays
//! are configured in milliseconds so the suite runs on real time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mesa_common::resilience::CircuitState;
use mesa_domain::{
    CircuitBreakerSettings, CreateOrderRequest, Order, PosClientSettings, RetrySettings,
    SearchOrdersRequest, Tenant,
};
use mesa_infra::{
    search_all_orders, PosApi, PosError, ResilientClientFactory, StaticSecretSource, StopReason,
    TenantClientRegistry,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, max_retries: u32, failure_threshold: u32) -> PosClientSettings {
    PosClientSettings {
        base_url_override: Some(server.uri()),
        request_timeout_ms: 2_000,
        retry: RetrySettings {
            max_retries,
            initial_delay_ms: 10,
            max_delay_ms: 50,
            ..Default::default()
        },
        circuit_breaker: CircuitBreakerSettings {
            failure_threshold,
            reset_timeout_ms: 60_000,
            half_open_max_calls: 1,
        },
        ..Default::default()
    }
}

fn tenant() -> Tenant {
    Tenant::new("Store").with_credential_ref("My Store!").with_location("L1")
}

fn factory(settings: PosClientSettings) -> ResilientClientFactory<StaticSecretSource> {
    let secrets = StaticSecretSource::new().with("ACCESS_TOKEN_MY_STORE_", "tenant-token");
    ResilientClientFactory::new(settings, secrets).expect("factory")
}

fn order_body(id: &str) -> serde_json::Value {
    json!({"order": {"id": id, "location_id": "L1", "state": "OPEN"}})
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

/// Captures formatted log output for assertions
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn events(&self) -> Vec<serde_json::Value> {
        let output = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
        output.lines().map(|line| serde_json::from_str(line).unwrap()).collect()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Transient upstream failures are retried until success
///
/// # Test Steps
/// 1. Serve 503 twice, then 200
/// 2. Retrieve an order through the resilient client
/// 3. Verify the order is returned after exactly 3 requests
/// 4. Verify the breaker stayed closed and counted one call
#[tokio::test]
async fn test_retries_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/orders/ORDER_1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/orders/ORDER_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_body("ORDER_1")))
        .mount(&server)
        .await;

    let client = factory(settings(&server, 3, 5)).wrap(&tenant(), None, None).expect("client");
    let response = client.retrieve_order("ORDER_1").await.expect("order");

    assert_eq!(response.order.id.as_deref(), Some("ORDER_1"));
    assert_eq!(request_count(&server).await, 3);
    let health = client.health();
    assert_eq!(health.state, CircuitState::Closed);
    assert_eq!(health.total_calls, 1);
}

/// Every request carries the tenant's token and the API version header
#[tokio::test]
async fn test_requests_carry_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .and(header("authorization", "Bearer tenant-token"))
        .and(header("square-version", "2024-10-17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locations": [{"id": "L1", "name": "Main"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = factory(settings(&server, 0, 5)).wrap(&tenant(), None, None).expect("client");
    let response = client.list_locations().await.expect("locations");
    assert_eq!(response.locations[0].id, "L1");
}

/// Non-retryable errors surface after a single request
#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/catalog/object/MISSING"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"category": "INVALID_REQUEST_ERROR", "code": "NOT_FOUND", "detail": "gone"}]
        })))
        .mount(&server)
        .await;

    let client = factory(settings(&server, 3, 5)).wrap(&tenant(), None, None).expect("client");
    let err = client.retrieve_catalog_object("MISSING").await.unwrap_err();

    match err {
        PosError::Api { status, code, .. } => {
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("NOT_FOUND"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

/// The breaker opens at the threshold and then stops traffic
///
/// # Test Steps
/// 1. Serve 500 for every request, threshold 2, no retries
/// 2. Make two failing calls
/// 3. Verify the third call is rejected as circuit-open without a request
#[tokio::test]
async fn test_breaker_opens_and_stops_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = factory(settings(&server, 0, 2)).wrap(&tenant(), None, None).expect("client");

    assert!(matches!(client.list_locations().await, Err(PosError::Api { status: 500, .. })));
    assert!(matches!(client.list_locations().await, Err(PosError::Api { status: 500, .. })));
    assert_eq!(client.circuit_state(), CircuitState::Open);

    let rejected = client.list_locations().await.unwrap_err();
    assert!(matches!(rejected, PosError::CircuitOpen { .. }));
    assert_eq!(request_count(&server).await, 2);
    assert_eq!(client.health().rejected_calls, 1);
}

/// Retried creates resend the same idempotency key
#[tokio::test]
async fn test_create_order_retries_reuse_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_body("NEW_1")))
        .mount(&server)
        .await;

    let client = factory(settings(&server, 3, 5)).wrap(&tenant(), None, None).expect("client");
    let request = CreateOrderRequest {
        order: Order { location_id: "L1".into(), ..Default::default() },
        idempotency_key: None,
    };
    let response = client.create_order(&request).await.expect("created");
    assert_eq!(response.order.id.as_deref(), Some("NEW_1"));

    let requests = server.received_requests().await.expect("recorded");
    assert_eq!(requests.len(), 3);
    let keys: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).expect("json body");
            body["idempotency_key"].as_str().expect("idempotency key").to_string()
        })
        .collect();
    assert!(keys.iter().all(|key| key == &keys[0]));
}

/// A failure on page 2 returns page 1 as a partial result
///
/// # Test Steps
/// 1. Serve page 1 with a cursor, fail the cursor request with 400
/// 2. Search all orders
/// 3. Verify page 1 items are returned with a `Failed` stop reason
/// 4. Verify a warning carrying the page count and error was logged
#[tokio::test]
async fn test_search_all_orders_soft_stops_on_later_page() {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::WARN)
        .with_writer(buffer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/orders/search"))
        .and(body_partial_json(json!({"cursor": "PAGE_2"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"code": "INVALID_CURSOR", "detail": "cursor expired"}]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/orders/search"))
        .and(body_partial_json(json!({"location_ids": ["L1"], "limit": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [
                {"id": "O1", "location_id": "L1"},
                {"id": "O2", "location_id": "L1"}
            ],
            "cursor": "PAGE_2"
        })))
        .mount(&server)
        .await;

    let client = factory(settings(&server, 2, 5)).wrap(&tenant(), None, None).expect("client");
    let request = SearchOrdersRequest { location_ids: vec!["L1".into()], ..Default::default() };
    let result = search_all_orders(&client, request).await.expect("first page succeeds");

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.pages_fetched, 1);
    assert!(matches!(&result.stop, StopReason::Failed(msg) if msg.contains("cursor expired")));
    assert_eq!(request_count(&server).await, 2);

    let warnings: Vec<serde_json::Value> = buffer
        .events()
        .into_iter()
        .filter(|event| event["fields"]["pages_fetched"].is_u64())
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["level"], "WARN");
    assert_eq!(warnings[0]["fields"]["pages_fetched"], 1);
    assert_eq!(warnings[0]["fields"]["operation"], "search_orders");
    assert!(warnings[0]["fields"]["error"].as_str().unwrap().contains("cursor expired"));
}

/// A missing credential fails at construction, before any request
#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let server = MockServer::start().await;
    let factory =
        ResilientClientFactory::new(settings(&server, 3, 5), StaticSecretSource::new())
            .expect("factory");

    match factory.wrap(&tenant(), None, None) {
        Err(PosError::Config(message)) => {
            assert!(message.contains("ACCESS_TOKEN_MY_STORE_"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 0);
}

/// Cancelling during backoff ends the call without tripping the breaker
#[tokio::test]
async fn test_cancellation_during_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut slow = settings(&server, 3, 1);
    slow.retry.initial_delay_ms = 5_000;
    slow.retry.max_delay_ms = 10_000;
    let client = factory(slow).wrap(&tenant(), None, None).expect("client");

    let token = CancellationToken::new();
    let scoped = client.with_cancellation(token.clone());
    let call = tokio::spawn(async move { scoped.list_locations().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();

    let err = tokio::time::timeout(Duration::from_secs(2), call)
        .await
        .expect("call finishes promptly")
        .expect("task joins")
        .unwrap_err();
    assert_eq!(err, PosError::Cancelled);
    assert_eq!(request_count(&server).await, 1);
    assert_eq!(client.circuit_state(), CircuitState::Closed);
}

/// Registry clients share one breaker per tenant
#[tokio::test]
async fn test_registry_shares_breaker_per_tenant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = TenantClientRegistry::new(factory(settings(&server, 0, 2)));
    let tenant = tenant();

    for _ in 0..2 {
        let client = registry.get_or_create(&tenant).expect("client");
        assert!(client.list_locations().await.is_err());
    }

    let client = registry.get_or_create(&tenant).expect("client");
    assert_eq!(client.circuit_state(), CircuitState::Open);
    let snapshot = registry.health_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].state, CircuitState::Open);

    assert!(registry.evict(tenant.id));
    let fresh = registry.get_or_create(&tenant).expect("client");
    assert_eq!(fresh.circuit_state(), CircuitState::Closed);
}

/// Concurrent calls through one client all count against one breaker
#[tokio::test]
async fn test_concurrent_calls_share_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/locations"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = factory(settings(&server, 0, 100)).wrap(&tenant(), None, None).expect("client");
    let calls = (0..20).map(|_| client.list_locations());
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(Result::is_err));
    let health = client.health();
    assert_eq!(health.total_calls, 20);
    assert_eq!(health.consecutive_failures, 20);
    assert_eq!(health.state, CircuitState::Closed);
}
