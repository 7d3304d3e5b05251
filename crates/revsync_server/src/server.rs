//! Main analytics server facade.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::store::RecordStore;
use revsync_protocol::{
    decode_json, encode_json, AttributionRequest, PropertiesRequest, PurchaseRequest,
    PurchaseResponse, ReportResponse, TokenRequest, TokenResponse,
};
use std::sync::Arc;

/// Endpoint path for token acquisition.
pub const TOKEN_ENDPOINT: &str = "/v1/token";
/// Endpoint path for purchase submission.
pub const PURCHASE_ENDPOINT: &str = "/v1/purchase";
/// Endpoint path for property and attribution reports.
pub const REPORT_ENDPOINT: &str = "/v1/report";

/// The analytics server.
///
/// This server handles token, purchase, and report requests using the
/// RevSync protocol. It maintains an in-memory record store.
///
/// # Example
///
/// ```
/// use revsync_server::{AnalyticsServer, ServerConfig};
///
/// let server = AnalyticsServer::new(ServerConfig::new("key-1"));
///
/// // In a real deployment you would expose HTTP endpoints that call
/// // server.handle_post() (or the typed handle_* methods).
/// ```
pub struct AnalyticsServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl AnalyticsServer {
    /// Creates a new analytics server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(RecordStore::new()))
    }

    /// Creates an analytics server over an existing record store.
    pub fn with_store(config: ServerConfig, store: Arc<RecordStore>) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Handles a token request.
    pub fn handle_token(&self, request: TokenRequest) -> Result<TokenResponse, String> {
        self.handler.handle_token(request).map_err(|e| e.to_string())
    }

    /// Handles a purchase submission.
    pub fn handle_purchase(&self, request: PurchaseRequest) -> Result<PurchaseResponse, String> {
        self.handler
            .handle_purchase(request)
            .map_err(|e| e.to_string())
    }

    /// Handles a property batch.
    pub fn handle_properties(&self, request: PropertiesRequest) -> Result<ReportResponse, String> {
        self.handler
            .handle_properties(request)
            .map_err(|e| e.to_string())
    }

    /// Handles an attribution payload.
    pub fn handle_attribution(
        &self,
        request: AttributionRequest,
    ) -> Result<ReportResponse, String> {
        self.handler
            .handle_attribution(request)
            .map_err(|e| e.to_string())
    }

    /// Handles a raw POST: decodes the body, dispatches by path, and
    /// encodes the response. This is the seam an HTTP framework (or the
    /// engine's loopback client) plugs into.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        self.route_post(path, body).map_err(|e| e.to_string())
    }

    fn route_post(&self, path: &str, body: &[u8]) -> ServerResult<Vec<u8>> {
        match path {
            TOKEN_ENDPOINT => {
                let request: TokenRequest = decode_body(body)?;
                let response = self.handler.handle_token(request)?;
                encode_body(&response)
            }
            PURCHASE_ENDPOINT => {
                let request: PurchaseRequest = decode_body(body)?;
                let response = self.handler.handle_purchase(request)?;
                encode_body(&response)
            }
            REPORT_ENDPOINT => {
                // The report endpoint serves both properties and
                // attribution; the body shape disambiguates.
                let probe: serde_json::Value = serde_json::from_slice(body)
                    .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
                if probe.get("properties").is_some() {
                    let request: PropertiesRequest = decode_body(body)?;
                    let response = self.handler.handle_properties(request)?;
                    encode_body(&response)
                } else if probe.get("attribution").is_some() {
                    let request: AttributionRequest = decode_body(body)?;
                    let response = self.handler.handle_attribution(request)?;
                    encode_body(&response)
                } else {
                    Err(ServerError::InvalidRequest(
                        "report body carries neither properties nor attribution".into(),
                    ))
                }
            }
            other => Err(ServerError::UnknownEndpoint(other.to_string())),
        }
    }

    /// Returns the record store.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.context.store
    }

    /// Returns the number of registered client uids.
    pub fn user_count(&self) -> usize {
        self.context.store.user_count()
    }

    /// Returns the number of distinct recorded purchases.
    pub fn purchase_count(&self) -> usize {
        self.context.store.purchase_count()
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> ServerResult<T> {
    decode_json(body).map_err(|e| ServerError::InvalidRequest(e.to_string()))
}

fn encode_body<T: serde::Serialize>(response: &T) -> ServerResult<Vec<u8>> {
    encode_json(response).map_err(|e| ServerError::InvalidRequest(e.to_string()))
}
