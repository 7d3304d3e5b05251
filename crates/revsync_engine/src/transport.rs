//! Transport layer abstraction for the analytics service.

use crate::error::{EngineError, EngineResult};
use revsync_protocol::{
    AttributionRequest, PropertiesRequest, PurchaseRequest, PurchaseResponse, ReportResponse,
    TokenRequest, TokenResponse,
};

/// A transport handles network communication with the analytics service.
///
/// This trait abstracts the network layer, allowing different
/// implementations (HTTP, mock for testing, etc.). Three logical endpoints
/// exist: obtain-or-refresh-token, submit-purchase, and submit-report;
/// properties and attribution both go to the report endpoint.
pub trait AnalyticsTransport: Send + Sync {
    /// Obtains (or refreshes) an identity token.
    fn obtain_token(&self, request: &TokenRequest) -> EngineResult<TokenResponse>;

    /// Submits a canonical purchase.
    fn submit_purchase(&self, request: &PurchaseRequest) -> EngineResult<PurchaseResponse>;

    /// Uploads a property batch.
    fn submit_properties(&self, request: &PropertiesRequest) -> EngineResult<ReportResponse>;

    /// Submits an attribution payload.
    fn submit_attribution(&self, request: &AttributionRequest) -> EngineResult<ReportResponse>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport connection.
    fn close(&self) -> EngineResult<()>;
}

/// A mock transport for testing.
///
/// Responses are configured per endpoint; every received request is
/// recorded so tests can assert on the exact outbound traffic. A missing
/// response configuration yields a retryable transport error, which doubles
/// as the failure-injection mechanism.
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: std::sync::atomic::AtomicBool,
    token_response: std::sync::Mutex<Option<TokenResponse>>,
    purchase_response: std::sync::Mutex<Option<PurchaseResponse>>,
    properties_response: std::sync::Mutex<Option<ReportResponse>>,
    attribution_response: std::sync::Mutex<Option<ReportResponse>>,
    token_failures: std::sync::atomic::AtomicU32,
    token_requests: std::sync::Mutex<Vec<TokenRequest>>,
    purchase_requests: std::sync::Mutex<Vec<PurchaseRequest>>,
    properties_requests: std::sync::Mutex<Vec<PropertiesRequest>>,
    attribution_requests: std::sync::Mutex<Vec<AttributionRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport in the connected state.
    pub fn new() -> Self {
        Self {
            connected: std::sync::atomic::AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Sets the token response.
    pub fn set_token_response(&self, response: TokenResponse) {
        *self.token_response.lock().unwrap() = Some(response);
    }

    /// Sets the purchase response.
    pub fn set_purchase_response(&self, response: PurchaseResponse) {
        *self.purchase_response.lock().unwrap() = Some(response);
    }

    /// Sets the properties response.
    pub fn set_properties_response(&self, response: ReportResponse) {
        *self.properties_response.lock().unwrap() = Some(response);
    }

    /// Clears the properties response so the next upload fails.
    pub fn clear_properties_response(&self) {
        *self.properties_response.lock().unwrap() = None;
    }

    /// Sets the attribution response.
    pub fn set_attribution_response(&self, response: ReportResponse) {
        *self.attribution_response.lock().unwrap() = Some(response);
    }

    /// Makes the next `count` token requests fail with a retryable
    /// transport error before the configured response is served.
    pub fn fail_token_requests(&self, count: u32) {
        self.token_failures
            .store(count, std::sync::atomic::Ordering::SeqCst);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected
            .store(connected, std::sync::atomic::Ordering::SeqCst);
    }

    /// Returns all recorded token requests.
    pub fn sent_token_requests(&self) -> Vec<TokenRequest> {
        self.token_requests.lock().unwrap().clone()
    }

    /// Returns all recorded purchase requests.
    pub fn sent_purchase_requests(&self) -> Vec<PurchaseRequest> {
        self.purchase_requests.lock().unwrap().clone()
    }

    /// Returns all recorded properties requests.
    pub fn sent_properties_requests(&self) -> Vec<PropertiesRequest> {
        self.properties_requests.lock().unwrap().clone()
    }

    /// Returns all recorded attribution requests.
    pub fn sent_attribution_requests(&self) -> Vec<AttributionRequest> {
        self.attribution_requests.lock().unwrap().clone()
    }
}

impl AnalyticsTransport for MockTransport {
    fn obtain_token(&self, request: &TokenRequest) -> EngineResult<TokenResponse> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        self.token_requests.lock().unwrap().push(request.clone());

        let failures = self.token_failures.load(std::sync::atomic::Ordering::SeqCst);
        if failures > 0 {
            self.token_failures
                .store(failures - 1, std::sync::atomic::Ordering::SeqCst);
            return Err(EngineError::transport_retryable("injected token failure"));
        }

        self.token_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EngineError::transport_retryable("no mock token response set"))
    }

    fn submit_purchase(&self, request: &PurchaseRequest) -> EngineResult<PurchaseResponse> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        self.purchase_requests.lock().unwrap().push(request.clone());
        self.purchase_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EngineError::transport_retryable("no mock purchase response set"))
    }

    fn submit_properties(&self, request: &PropertiesRequest) -> EngineResult<ReportResponse> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        self.properties_requests
            .lock()
            .unwrap()
            .push(request.clone());
        self.properties_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EngineError::transport_retryable("no mock properties response set"))
    }

    fn submit_attribution(&self, request: &AttributionRequest) -> EngineResult<ReportResponse> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        self.attribution_requests
            .lock()
            .unwrap()
            .push(request.clone());
        self.attribution_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EngineError::transport_retryable("no mock attribution response set"))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn close(&self) -> EngineResult<()> {
        self.connected
            .store(false, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_protocol::Environment;

    #[test]
    fn mock_transport_connection() {
        let transport = MockTransport::new();
        assert!(transport.is_connected());

        transport.set_connected(false);
        assert!(!transport.is_connected());

        transport.close().unwrap();
        assert!(!transport.is_connected());
    }

    #[test]
    fn mock_transport_not_connected_error() {
        let transport = MockTransport::new();
        transport.set_connected(false);

        let request = TokenRequest::new("0.4.0", "key-1", Environment::new());
        let result = transport.obtain_token(&request);
        assert!(matches!(result, Err(EngineError::NotConnected)));
    }

    #[test]
    fn mock_transport_records_requests() {
        let transport = MockTransport::new();
        transport.set_token_response(TokenResponse::success("uid-1"));

        let request = TokenRequest::new("0.4.0", "key-1", Environment::new());
        let response = transport.obtain_token(&request).unwrap();
        assert!(response.success);

        let sent = transport.sent_token_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].access_key, "key-1");
    }

    #[test]
    fn mock_transport_injected_token_failures() {
        let transport = MockTransport::new();
        transport.set_token_response(TokenResponse::success("uid-1"));
        transport.fail_token_requests(2);

        let request = TokenRequest::new("0.4.0", "key-1", Environment::new());
        assert!(transport.obtain_token(&request).is_err());
        assert!(transport.obtain_token(&request).is_err());
        assert!(transport.obtain_token(&request).unwrap().success);
    }

    #[test]
    fn mock_transport_missing_response_is_retryable() {
        let transport = MockTransport::new();
        let request = TokenRequest::new("0.4.0", "key-1", Environment::new());
        let err = transport.obtain_token(&request).unwrap_err();
        assert!(err.is_retryable());
    }
}
