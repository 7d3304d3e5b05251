//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the engine. The actual
//! HTTP client is abstracted via a trait to allow different implementations
//! (reqwest, hyper, a platform networking stack, etc.).

use crate::error::{EngineError, EngineResult};
use crate::transport::AnalyticsTransport;
use parking_lot::RwLock;
use revsync_protocol::{
    decode_json, encode_json, AttributionRequest, PropertiesRequest, PurchaseRequest,
    PurchaseResponse, ReportResponse, TokenRequest, TokenResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Endpoint path for token acquisition.
pub const TOKEN_ENDPOINT: &str = "/v1/token";
/// Endpoint path for purchase submission.
pub const PURCHASE_ENDPOINT: &str = "/v1/purchase";
/// Endpoint path for property and attribution reports.
pub const REPORT_ENDPOINT: &str = "/v1/report";

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. This allows
/// using different HTTP libraries or even non-HTTP transports.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based analytics transport.
///
/// Uses JSON encoding for request/response bodies.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the analytics service.
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Connection state.
    connected: AtomicBool,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    fn post_json<Req, Res>(&self, endpoint: &str, request: &Req) -> EngineResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }

        let body = encode_json(request)?;

        let url = format!("{}{}", self.base_url, endpoint);
        // A failed POST is transient: record it but keep the transport
        // usable so retry-with-backoff can recover.
        let response_body = self.client.post(&url, body).map_err(|e| {
            self.set_error(&e);
            EngineError::transport_retryable(e)
        })?;

        self.clear_error();

        Ok(decode_json(&response_body)?)
    }
}

impl<C: HttpClient> AnalyticsTransport for HttpTransport<C> {
    fn obtain_token(&self, request: &TokenRequest) -> EngineResult<TokenResponse> {
        self.post_json(TOKEN_ENDPOINT, request)
    }

    fn submit_purchase(&self, request: &PurchaseRequest) -> EngineResult<PurchaseResponse> {
        self.post_json(PURCHASE_ENDPOINT, request)
    }

    fn submit_properties(&self, request: &PropertiesRequest) -> EngineResult<ReportResponse> {
        self.post_json(REPORT_ENDPOINT, request)
    }

    fn submit_attribution(&self, request: &AttributionRequest) -> EngineResult<ReportResponse> {
        self.post_json(REPORT_ENDPOINT, request)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn close(&self) -> EngineResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST request and returns the response body.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

/// A loopback HTTP client that routes requests directly to an in-process
/// server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        // Extract path from URL
        let path = url.find("/v1/").map(|i| &url[i..]).unwrap_or(url);
        self.server.handle_post(path, &body)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
