//! Request handlers for the analytics endpoints.

use crate::auth::TokenMinter;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::store::RecordStore;
use revsync_protocol::{
    AttributionRequest, PropertiesRequest, PurchaseRequest, PurchaseResponse, ReportResponse,
    TokenRequest, TokenResponse,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Context shared by all request handlers.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Uid minter/verifier.
    pub minter: TokenMinter,
    /// Record store (shared across all handlers).
    pub store: Arc<RecordStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<RecordStore>) -> Self {
        let minter = TokenMinter::new(config.auth_secret.clone());
        Self {
            config,
            minter,
            store,
        }
    }

    fn check_access_key(&self, presented: &str) -> Result<(), String> {
        if presented != self.config.access_key {
            return Err("invalid access key".to_string());
        }
        Ok(())
    }

    fn check_uid(&self, uid: &str) -> Result<(), String> {
        if self.config.verify_tokens && !self.minter.verify(uid) {
            return Err("invalid client uid".to_string());
        }
        Ok(())
    }
}

/// Handler for analytics requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a token request: mints and registers a new client uid.
    pub fn handle_token(&self, request: TokenRequest) -> ServerResult<TokenResponse> {
        if let Err(reason) = self.context.check_access_key(&request.access_key) {
            return Ok(TokenResponse::error(reason));
        }

        let uid = self.context.minter.mint();
        self.context.store.register_user(&uid);
        info!("minted client uid for sdk {}", request.sdk_version);
        Ok(TokenResponse::success(uid))
    }

    /// Handles a purchase submission.
    ///
    /// A redelivered purchase token is acknowledged as a duplicate rather
    /// than rejected, so at-least-once delivery upstream never
    /// double-counts revenue.
    pub fn handle_purchase(&self, request: PurchaseRequest) -> ServerResult<PurchaseResponse> {
        if let Err(reason) = self.context.check_access_key(&request.access_key) {
            return Ok(PurchaseResponse::error(reason));
        }
        if let Err(reason) = self.context.check_uid(&request.client_uid) {
            return Ok(PurchaseResponse::error(reason));
        }
        if request.purchase.purchase_token.is_empty() {
            return Ok(PurchaseResponse::error("purchase token missing"));
        }

        let token = request.purchase.purchase_token.clone();
        if self
            .context
            .store
            .record_purchase(&request.client_uid, request.purchase)
        {
            debug!("recorded purchase {token}");
            Ok(PurchaseResponse::success(token))
        } else {
            debug!("purchase {token} already recorded");
            Ok(PurchaseResponse::duplicate(token))
        }
    }

    /// Handles a property batch.
    pub fn handle_properties(&self, request: PropertiesRequest) -> ServerResult<ReportResponse> {
        if let Err(reason) = self.context.check_access_key(&request.access_key) {
            return Ok(ReportResponse::error(reason));
        }
        if let Err(reason) = self.context.check_uid(&request.client_uid) {
            return Ok(ReportResponse::error(reason));
        }
        if request.properties.len() > self.context.config.max_batch as usize {
            return Ok(ReportResponse::error(format!(
                "too many properties: {} > {}",
                request.properties.len(),
                self.context.config.max_batch
            )));
        }

        let accepted = self
            .context
            .store
            .merge_properties(&request.client_uid, &request.properties);
        debug!("merged {accepted} properties for {}", request.client_uid);
        Ok(ReportResponse::success(accepted))
    }

    /// Handles an attribution payload.
    pub fn handle_attribution(&self, request: AttributionRequest) -> ServerResult<ReportResponse> {
        if let Err(reason) = self.context.check_access_key(&request.access_key) {
            return Ok(ReportResponse::error(reason));
        }
        if let Err(reason) = self.context.check_uid(&request.client_uid) {
            return Ok(ReportResponse::error(reason));
        }

        self.context
            .store
            .record_attribution(&request.client_uid, request.attribution);
        Ok(ReportResponse::success(1))
    }
}
