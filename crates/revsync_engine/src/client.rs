//! The sync client orchestrator.

use crate::adid::AdvertisingIdProvider;
use crate::attribution::AttributionForwarder;
use crate::billing::{PlatformPurchase, SkuDetails};
use crate::config::EngineConfig;
use crate::converter::PurchaseConverter;
use crate::error::{EngineError, EngineResult};
use crate::properties::PropertyBuffer;
use crate::token::TokenStore;
use crate::transport::AnalyticsTransport;
use parking_lot::Mutex;
use revsync_protocol::{
    AttributionRequest, AttributionSource, KnownProperty, PropertiesRequest, PurchaseRequest,
    PurchaseResponse, ReportResponse, TokenRequest, TokenResponse,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The lifecycle state of the sync client.
///
/// The state only ever moves forward; there is no transition back to
/// `Uninitialized` without a process restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No initialization has been requested.
    Uninitialized,
    /// Initialization is in progress (token fetch, advertising id).
    Initializing,
    /// Token obtained; the client stays ready for the process lifetime.
    Ready,
}

/// Counters for introspection and tests.
#[derive(Debug, Clone, Default)]
pub struct ClientStats {
    /// Property flushes attempted (non-empty batches only).
    pub flushes_attempted: u64,
    /// Property flushes acknowledged by the service.
    pub flushes_succeeded: u64,
    /// Individual properties delivered.
    pub properties_sent: u64,
    /// Individual properties dropped with a failed batch.
    pub properties_dropped: u64,
    /// Purchases acknowledged by the service.
    pub purchases_submitted: u64,
    /// Purchase submissions that failed.
    pub purchases_failed: u64,
    /// Attribution payloads delivered.
    pub attributions_sent: u64,
    /// Retries performed while fetching the identity token.
    pub token_fetch_retries: u64,
    /// Last error message observed.
    pub last_error: Option<String>,
}

/// The orchestrator of the engine.
///
/// Owns the token lifecycle and the property buffer, drives purchase
/// conversion and submission, and is triggered from multiple contexts:
/// host API calls, billing notifications, lifecycle transitions, and the
/// upload scheduler. Shared state is lock-protected; network calls run on
/// blocking tasks so callers are never blocked on the transport.
pub struct SyncClient {
    config: EngineConfig,
    transport: Arc<dyn AnalyticsTransport>,
    tokens: Arc<TokenStore>,
    buffer: PropertyBuffer,
    converter: PurchaseConverter,
    forwarder: AttributionForwarder,
    state_tx: watch::Sender<ClientState>,
    state_rx: watch::Receiver<ClientState>,
    stats: Mutex<ClientStats>,
}

impl SyncClient {
    /// Creates a new client in the `Uninitialized` state.
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn AnalyticsTransport>,
        tokens: Arc<TokenStore>,
    ) -> Arc<Self> {
        let (state_tx, state_rx) = watch::channel(ClientState::Uninitialized);
        Arc::new(Self {
            config,
            transport,
            tokens,
            buffer: PropertyBuffer::new(),
            converter: PurchaseConverter::new(),
            forwarder: AttributionForwarder::new(),
            state_tx,
            state_rx,
            stats: Mutex::new(ClientStats::default()),
        })
    }

    /// Returns the current state.
    pub fn state(&self) -> ClientState {
        *self.state_rx.borrow()
    }

    /// Returns a receiver that observes state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ClientState> {
        self.state_rx.clone()
    }

    /// Waits until the client reaches `Ready`.
    pub async fn wait_ready(&self) {
        let mut rx = self.state_rx.clone();
        loop {
            if *rx.borrow_and_update() == ClientState::Ready {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub(crate) fn set_state(&self, state: ClientState) {
        info!("sync client state -> {state:?}");
        self.state_tx.send_replace(state);
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    /// Returns the current identity token, if one has been obtained.
    pub fn identity_token(&self) -> Option<String> {
        self.tokens.current()
    }

    // ── Property buffering ───────────────────────────────────────

    /// Buffers a free-form user-property write. No network call happens
    /// here; batching bounds request volume.
    pub fn set_property(&self, key: &str, value: &str) {
        self.buffer.set(key, value);
    }

    /// Buffers a write to a well-known property.
    pub fn set_known_property(&self, property: KnownProperty, value: &str) {
        self.buffer.set_known(property, value);
    }

    /// Buffers the host-supplied user identifier.
    pub fn set_user_id(&self, value: &str) {
        self.buffer.set_known(KnownProperty::UserId, value);
    }

    /// Number of pending property writes.
    pub fn pending_properties(&self) -> usize {
        self.buffer.len()
    }

    // ── Initialization steps ─────────────────────────────────────

    /// Loads the persisted token or fetches one from the service,
    /// retrying with backoff until success.
    ///
    /// Runs on the init task; the host application is never blocked on
    /// this loop.
    pub(crate) async fn ensure_token(&self) -> String {
        if let Some(token) = self.tokens.load() {
            return token;
        }

        let mut attempt: u32 = 0;
        loop {
            match self.obtain_token_once().await {
                Ok(response) if response.success => match response.client_uid {
                    Some(uid) if TokenStore::validate(&uid) => {
                        self.tokens.save(&uid);
                        info!("obtained identity token from service");
                        return uid;
                    }
                    _ => warn!("token response missing a usable client uid"),
                },
                Ok(response) => {
                    warn!(
                        "token request rejected: {}",
                        response.error.unwrap_or_default()
                    );
                }
                Err(e) => warn!("token request failed: {e}"),
            }

            attempt = attempt.saturating_add(1);
            self.stats.lock().token_fetch_retries += 1;
            let delay = self.config.retry.delay_for_attempt(attempt);
            debug!("retrying token fetch in {delay:?} (attempt {attempt})");
            tokio::time::sleep(delay).await;
        }
    }

    /// Resolves the advertising identifier with a bounded wait.
    ///
    /// The outcome is advisory: on success the id is buffered as a known
    /// property; failure or timeout is logged and ignored.
    pub(crate) async fn resolve_advertising_id(&self, provider: Arc<dyn AdvertisingIdProvider>) {
        let resolved = tokio::time::timeout(
            self.config.ad_id_timeout,
            tokio::task::spawn_blocking(move || provider.resolve()),
        )
        .await;

        match resolved {
            Ok(Ok(Ok(id))) => {
                debug!("advertising id resolved");
                self.set_known_property(KnownProperty::AdvertisingId, &id);
            }
            Ok(Ok(Err(e))) => debug!("advertising id unavailable: {e}"),
            Ok(Err(e)) => warn!("advertising id provider task failed: {e}"),
            Err(_) => debug!("advertising id resolution timed out"),
        }
    }

    /// Re-attempts a pending token persistence, if any.
    pub(crate) fn retry_pending_token_save(&self) {
        self.tokens.retry_pending_save();
    }

    // ── Submissions ──────────────────────────────────────────────

    /// Converts and submits a purchase, tagged with the identity token.
    ///
    /// Waits for readiness first; the purchase-ready notification may
    /// arrive before initialization has finished. On failure the error is
    /// surfaced to the caller - the engine keeps no purchase retry queue,
    /// the billing layer governs redelivery.
    pub async fn purchase(
        &self,
        sku: Option<SkuDetails>,
        purchase: PlatformPurchase,
    ) -> EngineResult<PurchaseResponse> {
        self.wait_ready().await;

        let canonical = self.converter.convert(sku.as_ref(), &purchase);
        let token = match self.tokens.current() {
            Some(token) => token,
            None => return Err(EngineError::transport_retryable("identity token not available")),
        };
        let request = PurchaseRequest::new(
            self.config.sdk_version.clone(),
            self.config.access_key.clone(),
            token,
            canonical,
        );

        match self.submit_purchase_once(request).await {
            Ok(response) if response.success => {
                self.stats.lock().purchases_submitted += 1;
                if response.duplicate {
                    debug!("purchase already recorded by the service");
                }
                self.tokens.retry_pending_save();
                Ok(response)
            }
            Ok(response) => {
                let message = response.error.unwrap_or_else(|| "purchase rejected".into());
                self.note_purchase_failure(&message);
                Err(EngineError::Server(message))
            }
            Err(e) => {
                self.note_purchase_failure(&e.to_string());
                Err(e)
            }
        }
    }

    /// Normalizes and immediately submits an attribution payload.
    ///
    /// Attribution data is time-sensitive and is not batched.
    pub async fn attribution(
        &self,
        raw: &BTreeMap<String, Value>,
        source: AttributionSource,
        conversion_id: &str,
    ) -> EngineResult<()> {
        self.wait_ready().await;

        let outbound = self.forwarder.forward(raw, source, conversion_id);
        let token = match self.tokens.current() {
            Some(token) => token,
            None => return Err(EngineError::transport_retryable("identity token not available")),
        };
        let request = AttributionRequest::new(
            self.config.sdk_version.clone(),
            self.config.access_key.clone(),
            token,
            outbound,
        );

        match self.submit_attribution_once(request).await {
            Ok(response) if response.success => {
                self.stats.lock().attributions_sent += 1;
                Ok(())
            }
            Ok(response) => {
                let message = response.error.unwrap_or_else(|| "attribution rejected".into());
                self.stats.lock().last_error = Some(message.clone());
                Err(EngineError::Server(message))
            }
            Err(e) => {
                self.stats.lock().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Drains the property buffer and uploads the batch.
    ///
    /// The buffer is drained at flush start: a write arriving while the
    /// upload is in flight lands in the fresh buffer and rides the next
    /// tick. On failure the drained batch is dropped, not re-enqueued -
    /// bounded memory is favored over guaranteed delivery, and the drop is
    /// counted in [`ClientStats::properties_dropped`].
    pub async fn send_properties(&self) -> EngineResult<u32> {
        if self.state() != ClientState::Ready {
            debug!("skipping property flush before readiness");
            return Ok(0);
        }

        let batch = self.buffer.drain();
        if batch.is_empty() {
            return Ok(0);
        }
        let batch_len = batch.len();
        self.stats.lock().flushes_attempted += 1;

        let token = match self.tokens.current() {
            Some(token) => token,
            None => {
                self.note_dropped_batch(batch_len, "identity token not available");
                return Err(EngineError::transport_retryable("identity token not available"));
            }
        };
        let request = PropertiesRequest::new(
            self.config.sdk_version.clone(),
            self.config.access_key.clone(),
            token,
            self.config.environment.clone(),
            batch.into_map(),
        );

        match self.submit_properties_once(request).await {
            Ok(response) if response.success => {
                {
                    let mut stats = self.stats.lock();
                    stats.flushes_succeeded += 1;
                    stats.properties_sent += batch_len as u64;
                }
                self.tokens.retry_pending_save();
                debug!("flushed {batch_len} properties");
                Ok(response.accepted)
            }
            Ok(response) => {
                let message = response.error.unwrap_or_else(|| "report rejected".into());
                self.note_dropped_batch(batch_len, &message);
                Err(EngineError::Server(message))
            }
            Err(e) => {
                self.note_dropped_batch(batch_len, &e.to_string());
                Err(e)
            }
        }
    }

    // ── Transport round-trips ────────────────────────────────────
    //
    // The transport trait is synchronous; every round-trip runs on a
    // blocking task so async callers are only suspended, never blocked.

    async fn obtain_token_once(&self) -> EngineResult<TokenResponse> {
        let transport = Arc::clone(&self.transport);
        let request = TokenRequest::new(
            self.config.sdk_version.clone(),
            self.config.access_key.clone(),
            self.config.environment.clone(),
        );
        tokio::task::spawn_blocking(move || transport.obtain_token(&request))
            .await
            .map_err(|e| EngineError::transport_retryable(format!("transport task failed: {e}")))?
    }

    async fn submit_purchase_once(
        &self,
        request: PurchaseRequest,
    ) -> EngineResult<PurchaseResponse> {
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || transport.submit_purchase(&request))
            .await
            .map_err(|e| EngineError::transport_retryable(format!("transport task failed: {e}")))?
    }

    async fn submit_properties_once(
        &self,
        request: PropertiesRequest,
    ) -> EngineResult<ReportResponse> {
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || transport.submit_properties(&request))
            .await
            .map_err(|e| EngineError::transport_retryable(format!("transport task failed: {e}")))?
    }

    async fn submit_attribution_once(
        &self,
        request: AttributionRequest,
    ) -> EngineResult<ReportResponse> {
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || transport.submit_attribution(&request))
            .await
            .map_err(|e| EngineError::transport_retryable(format!("transport task failed: {e}")))?
    }

    fn note_purchase_failure(&self, message: &str) {
        warn!("purchase submission failed: {message}");
        let mut stats = self.stats.lock();
        stats.purchases_failed += 1;
        stats.last_error = Some(message.to_string());
    }

    fn note_dropped_batch(&self, batch_len: usize, reason: &str) {
        warn!("dropping batch of {batch_len} properties: {reason}");
        let mut stats = self.stats.lock();
        stats.properties_dropped += batch_len as u64;
        stats.last_error = Some(reason.to_string());
    }
}
