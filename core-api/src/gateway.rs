//! API gateway: the single entry point for upstream calls.
//!
//! Every call re-checks connectivity. Offline, mutations are diverted into the
//! [`OfflineQueue`] and reads are answered from the [`ResponseCache`]. Online,
//! the request goes through the transport with the current bearer token,
//! retryable failures are re-sent with linear backoff, and successful reads
//! refresh the cache.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{Clock, HttpClient, HttpResponse, NetworkMonitor};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, QueueEvent, RequestEvent};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CachedResponse, ResponseCache};
use crate::error::{ApiError, Result};
use crate::operation::ReplayableOperation;
use crate::queue::{OfflineQueue, QueueItem, QueuedOperation};
use crate::request::{ApiResponse, RequestDescriptor, RequestIdentity, ResponseSource};
use crate::retry::{AttemptFailure, AttemptOutcome, RetryDecision, RetryPolicy};
use crate::session::SessionStore;

enum SendOutcome {
    Delivered(HttpResponse),
    /// `retryable` is false when the last failure was terminal.
    Failed {
        failure: AttemptFailure,
        retryable: bool,
        retries: u32,
    },
}

pub struct ApiGateway {
    base_url: String,
    request_timeout: Duration,
    http_client: Arc<dyn HttpClient>,
    network_monitor: Arc<dyn NetworkMonitor>,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
    cache: ResponseCache,
    queue: OfflineQueue,
    session: SessionStore,
    event_bus: EventBus,
}

impl ApiGateway {
    /// Build the gateway and restore any queue persisted by a previous run.
    pub async fn new(config: &CoreConfig, event_bus: EventBus) -> Self {
        let keys = &config.storage_keys;
        let gateway = Self {
            base_url: config.base_url.clone(),
            request_timeout: config.request_timeout,
            http_client: config.http_client.clone(),
            network_monitor: config.network_monitor.clone(),
            clock: config.clock.clone(),
            retry_policy: RetryPolicy::from_config(config),
            cache: ResponseCache::new(
                config.kv_store.clone(),
                config.clock.clone(),
                config.cache_ttl,
                keys.api_cache_prefix.clone(),
                config.cache_memory_capacity,
            ),
            queue: OfflineQueue::new(config.kv_store.clone(), keys.offline_queue.clone()),
            session: SessionStore::new(
                config.kv_store.clone(),
                keys.auth_token.clone(),
                keys.user_data.clone(),
            ),
            event_bus,
        };

        let restored = gateway.queue.load().await;
        if restored > 0 {
            let _ = gateway
                .event_bus
                .emit(CoreEvent::Queue(QueueEvent::Restored { count: restored }));
        }
        gateway
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub async fn is_online(&self) -> bool {
        self.network_monitor.is_connected().await
    }

    /// Execute a call with offline handling.
    ///
    /// # Errors
    ///
    /// - [`ApiError::QueuedForSync`] when offline and the call mutates state
    /// - [`ApiError::NoConnectivity`] when offline and no fresh cache entry exists
    /// - [`ApiError::UpstreamFailure`] when the upstream call fails for good
    #[instrument(skip(self, descriptor), fields(method = %descriptor.method, path = %descriptor.path))]
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<ApiResponse> {
        let identity = descriptor.identity(&self.base_url);

        if !self.is_online().await {
            if descriptor.method.is_mutating() {
                let item = self.enqueue(QueuedOperation::Request(descriptor)).await;
                return Err(ApiError::QueuedForSync { item_id: item.id });
            }

            return match self.cache.get(&identity).await {
                Some(cached) => Ok(self.serve_cached(&identity, cached)),
                None => {
                    debug!("Offline with no cached response");
                    Err(ApiError::NoConnectivity {
                        identity: identity.to_string(),
                    })
                }
            };
        }

        let token = self.session.token().await;
        match self.send(&descriptor, &identity, token.as_deref()).await? {
            SendOutcome::Delivered(response) => {
                self.remember(&descriptor, &identity, &response).await;
                Ok(network_response(response))
            }
            SendOutcome::Failed {
                failure,
                retryable,
                retries,
            } => {
                if retryable && descriptor.method.is_read() {
                    if let Some(cached) = self.cache.get(&identity).await {
                        info!("Upstream unavailable, serving cached response");
                        return Ok(self.serve_cached(&identity, cached));
                    }
                }
                Err(self.fail(&identity, failure, retries))
            }
        }
    }

    /// Send through the transport with retries but without offline diversion
    /// or cache writes.
    ///
    /// Used to replay queued requests: a replay must never re-enter the queue
    /// on its own, the sync coordinator decides what happens to failures.
    #[instrument(skip(self, descriptor), fields(method = %descriptor.method, path = %descriptor.path))]
    pub async fn dispatch(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse> {
        let identity = descriptor.identity(&self.base_url);
        let token = self.session.token().await;

        match self.send(descriptor, &identity, token.as_deref()).await? {
            SendOutcome::Delivered(response) => Ok(network_response(response)),
            SendOutcome::Failed {
                failure, retries, ..
            } => Err(self.fail(&identity, failure, retries)),
        }
    }

    /// Capture an application action for replay on the next sync.
    pub async fn enqueue_action(&self, action: ReplayableOperation) -> QueueItem {
        self.enqueue(QueuedOperation::Action(action)).await
    }

    async fn enqueue(&self, operation: QueuedOperation) -> QueueItem {
        let label = operation.label();
        let item = self.queue.enqueue(operation, self.clock.now()).await;
        let queue_len = self.queue.len().await;

        info!(item_id = %item.id, label = %label, queue_len, "Offline: queued for sync");
        let _ = self.event_bus.emit(CoreEvent::Queue(QueueEvent::Enqueued {
            item_id: item.id.to_string(),
            label,
            queue_len,
        }));
        item
    }

    /// Run the attempt loop. Errors only when the request cannot be built.
    ///
    /// Each chain works on its own copy of the descriptor whose `retry_count`
    /// starts at zero and tracks the retries spent so far.
    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        identity: &RequestIdentity,
        token: Option<&str>,
    ) -> Result<SendOutcome> {
        let mut attempt = RequestDescriptor {
            retry_count: 0,
            ..descriptor.clone()
        };
        loop {
            let request = attempt.to_http_request(&self.base_url, token, self.request_timeout)?;

            let failure = match AttemptOutcome::classify(self.http_client.execute(request).await)
            {
                AttemptOutcome::Success(response) => return Ok(SendOutcome::Delivered(response)),
                AttemptOutcome::Terminal(failure) => {
                    return Ok(SendOutcome::Failed {
                        failure,
                        retryable: false,
                        retries: attempt.retry_count,
                    })
                }
                AttemptOutcome::Retryable(failure) => failure,
            };

            let retry = attempt.retry_count + 1;
            match self.retry_policy.should_retry(retry) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        attempt = retry,
                        delay_ms = delay.as_millis() as u64,
                        status = ?failure.status,
                        error = %failure.message,
                        "Request failed, retrying"
                    );
                    let _ = self
                        .event_bus
                        .emit(CoreEvent::Request(RequestEvent::RetryScheduled {
                            identity: identity.to_string(),
                            attempt: retry,
                            delay_ms: delay.as_millis() as u64,
                        }));
                    tokio::time::sleep(delay).await;
                    attempt.retry_count = retry;
                }
                RetryDecision::GiveUp => {
                    return Ok(SendOutcome::Failed {
                        failure,
                        retryable: true,
                        retries: attempt.retry_count,
                    })
                }
            }
        }
    }

    async fn remember(
        &self,
        descriptor: &RequestDescriptor,
        identity: &RequestIdentity,
        response: &HttpResponse,
    ) {
        if !descriptor.method.is_read() {
            return;
        }
        let Ok(payload) = std::str::from_utf8(&response.body) else {
            debug!(len = response.body.len(), "Response body is not UTF-8, not caching");
            return;
        };
        if let Err(err) = self.cache.put(identity, payload).await {
            warn!(error = %err, "Failed to cache response");
        }
    }

    fn serve_cached(&self, identity: &RequestIdentity, cached: CachedResponse) -> ApiResponse {
        let age_secs = cached.age(self.clock.now()).as_secs();
        debug!(age_secs, "Serving cached response");
        let _ = self
            .event_bus
            .emit(CoreEvent::Request(RequestEvent::ServedFromCache {
                identity: identity.to_string(),
                age_secs,
            }));

        ApiResponse {
            status: 200,
            body: cached.payload.into_bytes().into(),
            source: ResponseSource::Cache {
                stored_at: cached.stored_at,
            },
        }
    }

    fn fail(&self, identity: &RequestIdentity, failure: AttemptFailure, retries: u32) -> ApiError {
        warn!(status = ?failure.status, error = %failure.message, retries, "Request failed");
        let _ = self.event_bus.emit(CoreEvent::Request(RequestEvent::Failed {
            identity: identity.to_string(),
            message: failure.message.clone(),
        }));
        ApiError::UpstreamFailure {
            identity: identity.to_string(),
            status: failure.status,
            message: failure.message,
            retries,
        }
    }
}

fn network_response(response: HttpResponse) -> ApiResponse {
    ApiResponse {
        status: response.status,
        body: response.body,
        source: ResponseSource::Network,
    }
}
