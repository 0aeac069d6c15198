use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    HttpClient, HttpRequest, HttpResponse, MemoryKeyValueStore, NetworkInfo, NetworkType,
    PushNetworkMonitor,
};
use core_api::{ApiError, ApiGateway, OperationKind, ReplayableOperation, RequestDescriptor};
use core_runtime::CoreConfig;
use core_service::StorefrontCore;
use core_sync::{DrainOutcome, ReplayHandler, SubmitOutcome};
use serde::{Deserialize, Serialize};

#[derive(Default)]
struct StubTransport {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl HttpClient for StubTransport {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.urls.lock().unwrap().push(request.url.clone());
        Ok(HttpResponse::new(200, r#"{"ok":true}"#))
    }
}

struct RemoveHandler;

#[async_trait]
impl ReplayHandler for RemoveHandler {
    async fn replay(
        &self,
        operation: &ReplayableOperation,
        gateway: &ApiGateway,
    ) -> core_sync::Result<()> {
        if let ReplayableOperation::RemoveFromCart { product_id } = operation {
            gateway
                .dispatch(&RequestDescriptor::delete(format!("/carts/1/items/{}", product_id)))
                .await?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    username: String,
}

async fn bootstrap_core(
    store: Arc<MemoryKeyValueStore>,
) -> (StorefrontCore, Arc<StubTransport>, Arc<PushNetworkMonitor>) {
    let transport = Arc::new(StubTransport::default());
    let monitor = Arc::new(PushNetworkMonitor::new(NetworkInfo::connected(
        NetworkType::Ethernet,
    )));
    let config = CoreConfig::builder()
        .base_url("https://dummyjson.com/")
        .http_client(transport.clone())
        .kv_store(store)
        .network_monitor(monitor.clone())
        .build()
        .await
        .unwrap();
    let core = StorefrontCore::bootstrap(config).await.unwrap();
    (core, transport, monitor)
}

#[tokio::test]
async fn test_session_token_is_used_by_gateway() {
    let (core, transport, _) = bootstrap_core(Arc::new(MemoryKeyValueStore::new())).await;
    core.session()
        .save(
            "tok",
            &User {
                id: 1,
                username: "emilys".into(),
            },
        )
        .await
        .unwrap();

    let response = core.execute(RequestDescriptor::get("/auth/me")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(
        *transport.urls.lock().unwrap(),
        vec!["https://dummyjson.com/auth/me"]
    );
    assert_eq!(
        core.session().profile::<User>().await.unwrap().unwrap().username,
        "emilys"
    );
}

#[tokio::test]
async fn test_offline_work_survives_restart_and_syncs() {
    let store = Arc::new(MemoryKeyValueStore::new());

    {
        let (core, transport, monitor) = bootstrap_core(store.clone()).await;
        monitor.set_offline();

        let err = core
            .execute(RequestDescriptor::post("/carts/add"))
            .await
            .unwrap_err();
        assert!(matches!(err, core_service::CoreError::Api(ApiError::QueuedForSync { .. })));
        assert!(matches!(
            core.submit_action(ReplayableOperation::RemoveFromCart { product_id: 9 })
                .await,
            SubmitOutcome::Queued { .. }
        ));
        assert!(transport.urls.lock().unwrap().is_empty());
    }

    let (core, transport, _) = bootstrap_core(store).await;
    core.register_handler(OperationKind::RemoveFromCart, Arc::new(RemoveHandler))
        .await;
    assert_eq!(core.gateway().queue().len().await, 2);

    let DrainOutcome::Completed(report) = core.sync_now().await else {
        panic!("expected a completed cycle");
    };
    assert_eq!(report.replayed, 2);
    assert_eq!(
        *transport.urls.lock().unwrap(),
        vec![
            "https://dummyjson.com/carts/add",
            "https://dummyjson.com/carts/1/items/9"
        ]
    );
    assert!(core.sync_status().last_sync_time.is_some());
}

#[tokio::test]
async fn test_start_sync_is_idempotent_and_shutdown_stops_listener() {
    let (core, _, monitor) = bootstrap_core(Arc::new(MemoryKeyValueStore::new())).await;

    core.start_sync().await.unwrap();
    core.start_sync().await.unwrap();
    assert_eq!(monitor.subscriber_count(), 1);

    monitor.set_offline();
    core.execute(RequestDescriptor::put("/carts/1"))
        .await
        .unwrap_err();
    let mut status = core.subscribe_sync_status();
    monitor.set_online();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let current = status.borrow().clone();
            if current.last_sync_time.is_some() && !current.is_syncing {
                break;
            }
            status.changed().await.unwrap();
        }
    })
    .await
    .expect("listener should drain after reconnect");
    assert!(core.gateway().queue().is_empty().await);

    core.shutdown().await;
    assert_eq!(monitor.subscriber_count(), 0);
}
