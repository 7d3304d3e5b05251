//! Session composition root and one-time initialization.

use crate::adid::{AdvertisingIdProvider, NullAdvertisingIdProvider};
use crate::billing::{BillingReceiver, PlatformPurchase, SkuDetails};
use crate::client::{ClientState, ClientStats, SyncClient};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{LifecycleEvent, LifecycleReceiver};
use crate::scheduler::UploadScheduler;
use crate::token::TokenStore;
use crate::transport::AnalyticsTransport;
use parking_lot::Mutex;
use revsync_protocol::{AttributionSource, KnownProperty, PurchaseResponse};
use revsync_storage::KeyValueStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Callback invoked with the outcome of a purchase submission.
pub type PurchaseCallback = Box<dyn FnOnce(EngineResult<PurchaseResponse>) + Send + 'static>;

/// External collaborators injected into a session.
///
/// The transport and storage are required; the advertising-id provider
/// defaults to [`NullAdvertisingIdProvider`], and the billing/lifecycle
/// channels are optional.
pub struct Collaborators {
    transport: Arc<dyn AnalyticsTransport>,
    storage: Arc<dyn KeyValueStore>,
    advertising: Arc<dyn AdvertisingIdProvider>,
    billing: Option<BillingReceiver>,
    lifecycle: Option<LifecycleReceiver>,
}

impl Collaborators {
    /// Creates a collaborator set from the required dependencies.
    pub fn new(transport: Arc<dyn AnalyticsTransport>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            transport,
            storage,
            advertising: Arc::new(NullAdvertisingIdProvider),
            billing: None,
            lifecycle: None,
        }
    }

    /// Sets the advertising-id provider.
    pub fn with_advertising(mut self, provider: Arc<dyn AdvertisingIdProvider>) -> Self {
        self.advertising = provider;
        self
    }

    /// Attaches a billing-event channel.
    pub fn with_billing(mut self, receiver: BillingReceiver) -> Self {
        self.billing = Some(receiver);
        self
    }

    /// Attaches a lifecycle-event channel.
    pub fn with_lifecycle(mut self, receiver: LifecycleReceiver) -> Self {
        self.lifecycle = Some(receiver);
        self
    }
}

/// A fully-initialized engine session.
///
/// The session is the host-facing facade over the sync client, the upload
/// scheduler, and the collaborator consumer tasks. It is constructed by
/// the application's composition root; use [`SessionCell`] when a
/// process-wide single instance is wanted.
///
/// Must be created inside a Tokio runtime.
pub struct Session {
    client: Arc<SyncClient>,
    scheduler: Arc<UploadScheduler>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Validates the configuration and starts initialization.
    ///
    /// Returns immediately; token acquisition, advertising-id resolution,
    /// and scheduler arming continue on a background task. The returned
    /// session is usable at once - operations that need the identity
    /// token wait for readiness internally.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] for an empty access key or
    /// when auto tracking is requested without a billing channel. No
    /// partial session is created in that case.
    pub fn initialize(config: EngineConfig, collaborators: Collaborators) -> EngineResult<Arc<Self>> {
        config.validate()?;
        if config.auto_tracking && collaborators.billing.is_none() {
            return Err(EngineError::Configuration(
                "auto tracking requires a billing event channel".into(),
            ));
        }

        let tokens = Arc::new(TokenStore::new(collaborators.storage));
        let client = SyncClient::new(config.clone(), collaborators.transport, tokens);
        let scheduler = Arc::new(UploadScheduler::new());
        let mut tasks = Vec::new();

        client.set_state(ClientState::Initializing);

        if let Some(receiver) = collaborators.billing {
            tasks.push(tokio::spawn(billing_loop(Arc::clone(&client), receiver)));
        }
        if let Some(receiver) = collaborators.lifecycle {
            tasks.push(tokio::spawn(lifecycle_loop(Arc::clone(&client), receiver)));
        }

        let init_client = Arc::clone(&client);
        let init_scheduler = Arc::clone(&scheduler);
        let advertising = collaborators.advertising;
        let upload_period = config.upload_period;
        tasks.push(tokio::spawn(async move {
            init_client.ensure_token().await;
            init_client.resolve_advertising_id(advertising).await;
            init_scheduler.arm(Arc::clone(&init_client), upload_period);
            init_client.set_state(ClientState::Ready);
        }));

        Ok(Arc::new(Self {
            client,
            scheduler,
            tasks: Mutex::new(tasks),
        }))
    }

    /// Returns the underlying sync client.
    pub fn client(&self) -> &Arc<SyncClient> {
        &self.client
    }

    /// Returns the current client state.
    pub fn state(&self) -> ClientState {
        self.client.state()
    }

    /// Waits until initialization has completed.
    pub async fn wait_ready(&self) {
        self.client.wait_ready().await;
    }

    /// Returns a snapshot of the engine counters.
    pub fn stats(&self) -> ClientStats {
        self.client.stats()
    }

    /// Converts and submits a purchase.
    pub async fn purchase(
        &self,
        sku: Option<SkuDetails>,
        purchase: PlatformPurchase,
    ) -> EngineResult<PurchaseResponse> {
        self.client.purchase(sku, purchase).await
    }

    /// Submits a purchase and delivers the outcome to a callback.
    pub fn purchase_with_callback(
        self: &Arc<Self>,
        sku: Option<SkuDetails>,
        purchase: PlatformPurchase,
        callback: PurchaseCallback,
    ) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let result = session.purchase(sku, purchase).await;
            callback(result);
        });
    }

    /// Buffers a write to a well-known property.
    pub fn set_property(&self, property: KnownProperty, value: &str) {
        self.client.set_known_property(property, value);
    }

    /// Buffers a free-form user-property write.
    pub fn set_user_property(&self, key: &str, value: &str) {
        self.client.set_property(key, value);
    }

    /// Buffers the host-supplied user identifier.
    pub fn set_user_id(&self, value: &str) {
        self.client.set_user_id(value);
    }

    /// Normalizes and immediately submits an attribution payload.
    pub async fn attribution(
        &self,
        raw: &BTreeMap<String, Value>,
        source: AttributionSource,
        conversion_id: &str,
    ) -> EngineResult<()> {
        self.client.attribution(raw, source, conversion_id).await
    }

    /// Drains the property buffer immediately instead of waiting for the
    /// next scheduler tick.
    pub async fn flush_properties(&self) -> EngineResult<u32> {
        self.client.send_properties().await
    }

    /// Stops the scheduler and the collaborator consumer tasks.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

async fn billing_loop(client: Arc<SyncClient>, mut receiver: BillingReceiver) {
    while let Some(ready) = receiver.recv().await {
        match client.purchase(ready.sku, ready.purchase).await {
            Ok(response) => {
                debug!(
                    "tracked purchase {}",
                    response.purchase_token.unwrap_or_default()
                );
            }
            Err(e) => {
                // No internal retry: the billing adapter redelivers the
                // purchase-update notification.
                warn!("purchase tracking failed (retryable={}): {e}", e.is_retryable());
            }
        }
    }
    debug!("billing channel closed");
}

async fn lifecycle_loop(client: Arc<SyncClient>, mut receiver: LifecycleReceiver) {
    while let Some(event) = receiver.recv().await {
        match event {
            LifecycleEvent::Created => debug!("application created"),
            LifecycleEvent::Foregrounded | LifecycleEvent::Backgrounded => {
                client.retry_pending_token_save();
                if let Err(e) = client.send_properties().await {
                    debug!("opportunistic flush failed: {e}");
                }
            }
        }
    }
    debug!("lifecycle channel closed");
}

/// One-time initialization guard for a process-wide session.
///
/// The first `get_or_init` constructs the session; every later call
/// returns the existing instance and ignores its arguments. Concurrent
/// initializers block until the first construction completes, so a
/// partially-constructed session is never observable. A failed
/// initialization leaves the cell empty and can be retried.
#[derive(Default)]
pub struct SessionCell {
    inner: Mutex<Option<Arc<Session>>>,
}

impl SessionCell {
    /// Creates an empty cell.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Returns the existing session or initializes one.
    pub fn get_or_init(
        &self,
        config: EngineConfig,
        collaborators: Collaborators,
    ) -> EngineResult<Arc<Session>> {
        let mut guard = self.inner.lock();
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let session = Session::initialize(config, collaborators)?;
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Returns the session if one has been initialized.
    pub fn get(&self) -> Option<Arc<Session>> {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{billing_channel, PurchaseReady};
    use crate::lifecycle::lifecycle_channel;
    use crate::transport::MockTransport;
    use revsync_protocol::{PurchaseResponse, ReportResponse, TokenResponse};
    use revsync_storage::InMemoryStore;
    use std::time::Duration;

    fn transport_with_token() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.set_token_response(TokenResponse::success("uid-1"));
        transport
    }

    fn collaborators(transport: Arc<MockTransport>) -> Collaborators {
        Collaborators::new(transport, Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn initialize_rejects_empty_access_key() {
        let result = Session::initialize(
            EngineConfig::new("", "loopback://"),
            collaborators(transport_with_token()),
        );
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[tokio::test]
    async fn initialize_rejects_auto_tracking_without_billing() {
        let result = Session::initialize(
            EngineConfig::new("key-1", "loopback://").with_auto_tracking(true),
            collaborators(transport_with_token()),
        );
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[tokio::test]
    async fn initialize_reaches_ready() {
        let transport = transport_with_token();
        let session = Session::initialize(
            EngineConfig::new("key-1", "loopback://"),
            collaborators(transport),
        )
        .unwrap();

        session.wait_ready().await;
        assert_eq!(session.state(), ClientState::Ready);
        assert_eq!(
            session.client().identity_token().as_deref(),
            Some("uid-1")
        );
        session.shutdown();
    }

    #[tokio::test]
    async fn session_cell_is_idempotent() {
        let cell = SessionCell::new();

        let first = cell
            .get_or_init(
                EngineConfig::new("key-1", "loopback://"),
                collaborators(transport_with_token()),
            )
            .unwrap();

        // A second call with different arguments has no observable effect.
        let second = cell
            .get_or_init(
                EngineConfig::new("other-key", "https://elsewhere"),
                collaborators(transport_with_token()),
            )
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        first.shutdown();
    }

    #[tokio::test]
    async fn session_cell_failed_init_leaves_cell_empty() {
        let cell = SessionCell::new();
        let result = cell.get_or_init(
            EngineConfig::new("", "loopback://"),
            collaborators(transport_with_token()),
        );
        assert!(result.is_err());
        assert!(cell.get().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn billing_notifications_drive_purchases() {
        let transport = transport_with_token();
        transport.set_purchase_response(PurchaseResponse::success("pt-1"));

        let (tx, rx) = billing_channel(4);
        let session = Session::initialize(
            EngineConfig::new("key-1", "loopback://").with_auto_tracking(true),
            collaborators(transport.clone()).with_billing(rx),
        )
        .unwrap();
        session.wait_ready().await;

        tx.send(PurchaseReady {
            sku: None,
            purchase: PlatformPurchase {
                product_id: "coins_100".into(),
                purchase_token: "pt-1".into(),
                purchase_time_ms: 7,
                auto_renewing: false,
                raw_json: "{}".into(),
            },
        })
        .await
        .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while transport.sent_purchase_requests().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(transport.sent_purchase_requests()[0].client_uid, "uid-1");
        session.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn foreground_transition_triggers_opportunistic_flush() {
        let transport = transport_with_token();
        transport.set_properties_response(ReportResponse::success(1));

        let (tx, rx) = lifecycle_channel(4);
        let session = Session::initialize(
            // A long upload period keeps the scheduler out of this test.
            EngineConfig::new("key-1", "loopback://")
                .with_upload_period(Duration::from_secs(3600)),
            collaborators(transport.clone()).with_lifecycle(rx),
        )
        .unwrap();
        session.wait_ready().await;

        session.set_user_property("plan", "pro");
        tx.send(LifecycleEvent::Foregrounded).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while transport.sent_properties_requests().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let sent = transport.sent_properties_requests();
        assert_eq!(sent[0].properties.get("plan").map(String::as_str), Some("pro"));
        session.shutdown();
    }

    #[tokio::test]
    async fn purchase_with_callback_delivers_outcome() {
        let transport = transport_with_token();
        transport.set_purchase_response(PurchaseResponse::success("pt-9"));

        let session = Session::initialize(
            EngineConfig::new("key-1", "loopback://"),
            collaborators(transport),
        )
        .unwrap();
        session.wait_ready().await;

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        session.purchase_with_callback(
            None,
            PlatformPurchase {
                product_id: "coins_100".into(),
                purchase_token: "pt-9".into(),
                purchase_time_ms: 7,
                auto_renewing: false,
                raw_json: "{}".into(),
            },
            Box::new(move |result| {
                let _ = done_tx.send(result.is_ok());
            }),
        );

        assert!(done_rx.await.unwrap());
        session.shutdown();
    }
}
