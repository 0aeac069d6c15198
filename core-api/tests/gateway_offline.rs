use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, HttpClient, HttpMethod, HttpRequest, HttpResponse, KeyValueStore, ManualClock,
    MemoryKeyValueStore, NetworkInfo, PushNetworkMonitor,
};
use chrono::{TimeZone, Utc};
use core_api::{ApiError, ApiGateway, QueuedOperation, RequestDescriptor, ResponseSource};
use core_runtime::events::{CoreEvent, EventBus, QueueEvent, RequestEvent};
use core_runtime::CoreConfig;
use mockall::mock;

mock! {
    pub Transport {}

    #[async_trait]
    impl HttpClient for Transport {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl KeyValueStore for Store {
        async fn get(&self, key: &str) -> BridgeResult<Option<String>>;
        async fn set(&self, key: &str, value: &str) -> BridgeResult<()>;
        async fn remove(&self, key: &str) -> BridgeResult<()>;
        async fn list_keys(&self, prefix: &str) -> BridgeResult<Vec<String>>;
    }
}

fn broken_store() -> MockStore {
    let mut store = MockStore::new();
    store
        .expect_get()
        .returning(|_| Err(BridgeError::StorageError("disk unavailable".into())));
    store
        .expect_set()
        .returning(|_, _| Err(BridgeError::StorageError("disk unavailable".into())));
    store
        .expect_remove()
        .returning(|_| Err(BridgeError::StorageError("disk unavailable".into())));
    store
        .expect_list_keys()
        .returning(|_| Err(BridgeError::StorageError("disk unavailable".into())));
    store
}

const PRODUCTS: &str = "/products?limit=30&skip=0";
const PRODUCTS_BODY: &str = r#"{"products":[{"id":1,"title":"Phone"}],"total":1}"#;

struct Harness {
    gateway: ApiGateway,
    monitor: Arc<PushNetworkMonitor>,
    clock: Arc<ManualClock>,
    store: Arc<MemoryKeyValueStore>,
    events: EventBus,
}

async fn harness(transport: MockTransport, store: Arc<MemoryKeyValueStore>) -> Harness {
    let monitor = Arc::new(PushNetworkMonitor::new(NetworkInfo::connected(
        bridge_traits::NetworkType::WiFi,
    )));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    ));
    let config = CoreConfig::builder()
        .base_url("https://dummyjson.com")
        .http_client(Arc::new(transport))
        .kv_store(store.clone())
        .network_monitor(monitor.clone())
        .clock(clock.clone())
        .build()
        .await
        .unwrap();
    let events = EventBus::new(64);
    let gateway = ApiGateway::new(&config, events.clone()).await;

    Harness {
        gateway,
        monitor,
        clock,
        store,
        events,
    }
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_offline_read_within_ttl_is_served_from_cache() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, PRODUCTS_BODY)));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;

    let live = h.gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap();
    assert_eq!(live.source, ResponseSource::Network);

    h.monitor.set_offline();
    h.clock.advance(chrono::Duration::minutes(4));

    let cached = h.gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap();
    assert!(cached.is_from_cache());
    assert_eq!(cached.text(), PRODUCTS_BODY);
}

#[tokio::test]
async fn test_offline_read_after_ttl_is_no_connectivity() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, PRODUCTS_BODY)));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;

    h.gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap();
    h.monitor.set_offline();
    h.clock.advance(chrono::Duration::minutes(6));

    let err = h.gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap_err();
    assert!(matches!(err, ApiError::NoConnectivity { .. }));
}

#[tokio::test]
async fn test_offline_mutation_is_queued_without_transport_call() {
    let mut transport = MockTransport::new();
    transport.expect_execute().times(0);
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;
    let mut rx = h.events.subscribe();
    h.monitor.set_offline();

    let descriptor = RequestDescriptor::post("/carts/add")
        .with_json(&serde_json::json!({"userId": 1, "products": [{"id": 1, "quantity": 1}]}))
        .unwrap();
    let err = h.gateway.execute(descriptor.clone()).await.unwrap_err();

    let item_id = match err {
        ApiError::QueuedForSync { item_id } => item_id,
        other => panic!("expected QueuedForSync, got {:?}", other),
    };
    assert!(queue_contains(&h, item_id).await);

    let items = h.gateway.queue().items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].operation, QueuedOperation::Request(descriptor));

    let persisted = h.store.get("@offline_queue").await.unwrap().unwrap();
    assert!(persisted.contains("/carts/add"));

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Queue(QueueEvent::Enqueued { queue_len: 1, .. })
    )));
}

async fn queue_contains(h: &Harness, item_id: core_api::QueueItemId) -> bool {
    h.gateway
        .queue()
        .items()
        .await
        .iter()
        .any(|item| item.id == item_id)
}

#[tokio::test]
async fn test_bearer_token_attached_from_store() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .withf(|request| {
            request.headers.get("Authorization").map(String::as_str) == Some("Bearer tok-42")
                && request.url == "https://dummyjson.com/auth/me"
        })
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, r#"{"id":1}"#)));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;
    h.store.set("@auth_token", "tok-42").await.unwrap();

    h.gateway
        .execute(RequestDescriptor::get("/auth/me"))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_retries_three_times_with_linear_backoff() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .times(4)
        .returning(|_| Ok(HttpResponse::new(503, "")));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;
    let mut rx = h.events.subscribe();

    let started = tokio::time::Instant::now();
    let err = h
        .gateway
        .execute(RequestDescriptor::post("/carts/add"))
        .await
        .unwrap_err();

    assert_eq!(started.elapsed(), Duration::from_millis(6000));
    assert_eq!(err.status(), Some(503));
    assert!(matches!(err, ApiError::UpstreamFailure { retries: 3, .. }));

    let delays: Vec<u64> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            CoreEvent::Request(RequestEvent::RetryScheduled { delay_ms, .. }) => Some(delay_ms),
            _ => None,
        })
        .collect();
    assert_eq!(delays, vec![1000, 2000, 3000]);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_on_second_attempt() {
    let mut transport = MockTransport::new();
    let mut seq = mockall::Sequence::new();
    transport
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(BridgeError::Timeout("10s".into())));
    transport
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, PRODUCTS_BODY)));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;

    let started = tokio::time::Instant::now();
    let response = h.gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(1000));
    assert_eq!(response.source, ResponseSource::Network);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(400, r#"{"message":"Invalid credentials"}"#)));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;

    let err = h
        .gateway
        .execute(RequestDescriptor::post("/auth/login"))
        .await
        .unwrap_err();

    match err {
        ApiError::UpstreamFailure {
            status,
            message,
            retries,
            ..
        } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "Invalid credentials");
            assert_eq!(retries, 0);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_read_falls_back_to_cache_after_exhausting_retries() {
    let mut transport = MockTransport::new();
    let mut seq = mockall::Sequence::new();
    transport
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, PRODUCTS_BODY)));
    transport
        .expect_execute()
        .times(4)
        .in_sequence(&mut seq)
        .returning(|_| Err(BridgeError::OperationFailed("connection reset".into())));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;

    h.gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap();
    h.clock.advance(chrono::Duration::minutes(1));

    let response = h.gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap();
    assert!(response.is_from_cache());
    assert_eq!(response.text(), PRODUCTS_BODY);
}

#[tokio::test]
async fn test_failed_read_is_not_cached() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(404, r#"{"message":"Product not found"}"#)));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;

    assert!(h
        .gateway
        .execute(RequestDescriptor::get("/products/9999"))
        .await
        .is_err());
    assert!(h.store.list_keys("@api_cache_").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_queue_restored_on_startup() {
    let store = Arc::new(MemoryKeyValueStore::new());

    let mut offline_transport = MockTransport::new();
    offline_transport.expect_execute().times(0);
    let first = harness(offline_transport, store.clone()).await;
    first.monitor.set_offline();
    for path in ["/carts/add", "/carts/1"] {
        let _ = first.gateway.execute(RequestDescriptor::post(path)).await;
    }
    drop(first);

    let second = harness(MockTransport::new(), store).await;
    let labels: Vec<String> = second
        .gateway
        .queue()
        .items()
        .await
        .iter()
        .map(|item| item.operation.label())
        .collect();
    assert_eq!(labels, vec!["POST /carts/add", "POST /carts/1"]);
}

#[tokio::test]
async fn test_dispatch_ignores_connectivity() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .withf(|request| request.method == HttpMethod::Delete)
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, "{}")));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;
    h.monitor.set_offline();

    let response = h
        .gateway
        .dispatch(&RequestDescriptor::delete("/carts/1"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(h.gateway.queue().is_empty().await);
}

#[tokio::test]
async fn test_store_failures_never_fail_the_call() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, PRODUCTS_BODY)));
    let monitor = Arc::new(PushNetworkMonitor::new(NetworkInfo::connected(
        bridge_traits::NetworkType::WiFi,
    )));
    let config = CoreConfig::builder()
        .base_url("https://dummyjson.com")
        .http_client(Arc::new(transport))
        .kv_store(Arc::new(broken_store()))
        .network_monitor(monitor.clone())
        .build()
        .await
        .unwrap();
    let gateway = ApiGateway::new(&config, EventBus::new(64)).await;

    let live = gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap();
    assert_eq!(live.source, ResponseSource::Network);
    assert_eq!(live.text(), PRODUCTS_BODY);

    monitor.set_offline();

    let err = gateway
        .execute(RequestDescriptor::post("/carts/add"))
        .await
        .unwrap_err();
    assert!(err.is_queued());
    assert_eq!(gateway.queue().len().await, 1);

    // The failed cache write left nothing to serve.
    let err = gateway.execute(RequestDescriptor::get(PRODUCTS)).await.unwrap_err();
    assert!(matches!(err, ApiError::NoConnectivity { .. }));
}

#[tokio::test]
async fn test_binary_read_is_not_cached() {
    let mut transport = MockTransport::new();
    transport
        .expect_execute()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, vec![0x89u8, 0x50, 0xff, 0xfe])));
    let h = harness(transport, Arc::new(MemoryKeyValueStore::new())).await;

    let live = h
        .gateway
        .execute(RequestDescriptor::get("/products/1/thumbnail"))
        .await
        .unwrap();
    assert_eq!(live.body.as_ref(), &[0x89u8, 0x50, 0xff, 0xfe][..]);
    assert!(h.store.is_empty().await);

    h.monitor.set_offline();
    let err = h
        .gateway
        .execute(RequestDescriptor::get("/products/1/thumbnail"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NoConnectivity { .. }));
}
