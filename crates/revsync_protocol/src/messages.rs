//! Request/response messages for the analytics service.
//!
//! Three logical endpoints exist: obtain-or-refresh-token, submit-purchase,
//! and submit-report (properties and attribution). Every request carries
//! the SDK version and access key; every request after initialization also
//! carries the client uid (the identity token).

use crate::attribution::OutboundAttribution;
use crate::environment::Environment;
use crate::purchase::CanonicalPurchase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request to obtain (or refresh) an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// SDK version string.
    pub sdk_version: String,
    /// Access key identifying the application.
    pub access_key: String,
    /// Environment snapshot at the time of the request.
    pub environment: Environment,
}

impl TokenRequest {
    /// Creates a new token request.
    pub fn new(
        sdk_version: impl Into<String>,
        access_key: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            sdk_version: sdk_version.into(),
            access_key: access_key.into(),
            environment,
        }
    }
}

/// Response to a token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The issued client uid (the identity token). Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_uid: Option<String>,
}

impl TokenResponse {
    /// Creates a successful token response.
    pub fn success(client_uid: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            client_uid: Some(client_uid.into()),
        }
    }

    /// Creates a failed token response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            client_uid: None,
        }
    }
}

/// Request to submit a canonical purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// SDK version string.
    pub sdk_version: String,
    /// Access key identifying the application.
    pub access_key: String,
    /// Identity token of the submitting device.
    pub client_uid: String,
    /// The purchase record.
    pub purchase: CanonicalPurchase,
}

impl PurchaseRequest {
    /// Creates a new purchase request.
    pub fn new(
        sdk_version: impl Into<String>,
        access_key: impl Into<String>,
        client_uid: impl Into<String>,
        purchase: CanonicalPurchase,
    ) -> Self {
        Self {
            sdk_version: sdk_version.into(),
            access_key: access_key.into(),
            client_uid: client_uid.into(),
            purchase,
        }
    }
}

/// Response to a purchase submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResponse {
    /// Whether the submission was accepted.
    pub success: bool,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The purchase token that was acknowledged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_token: Option<String>,
    /// True if the server had already recorded this purchase token.
    #[serde(default)]
    pub duplicate: bool,
}

impl PurchaseResponse {
    /// Creates a successful acknowledgement.
    pub fn success(purchase_token: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            purchase_token: Some(purchase_token.into()),
            duplicate: false,
        }
    }

    /// Creates an acknowledgement for an already-recorded purchase.
    pub fn duplicate(purchase_token: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            purchase_token: Some(purchase_token.into()),
            duplicate: true,
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            purchase_token: None,
            duplicate: false,
        }
    }
}

/// Request to upload a batch of user properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesRequest {
    /// SDK version string.
    pub sdk_version: String,
    /// Access key identifying the application.
    pub access_key: String,
    /// Identity token of the submitting device.
    pub client_uid: String,
    /// Environment snapshot at the time of the request.
    pub environment: Environment,
    /// The property batch, one entry per key.
    pub properties: BTreeMap<String, String>,
}

impl PropertiesRequest {
    /// Creates a new properties request.
    pub fn new(
        sdk_version: impl Into<String>,
        access_key: impl Into<String>,
        client_uid: impl Into<String>,
        environment: Environment,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            sdk_version: sdk_version.into(),
            access_key: access_key.into(),
            client_uid: client_uid.into(),
            environment,
            properties,
        }
    }
}

/// Response to a report submission (properties upload or attribution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    /// Whether the report was accepted.
    pub success: bool,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of entries the server accepted.
    #[serde(default)]
    pub accepted: u32,
}

impl ReportResponse {
    /// Creates a successful response.
    pub fn success(accepted: u32) -> Self {
        Self {
            success: true,
            error: None,
            accepted,
        }
    }

    /// Creates a failed response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            accepted: 0,
        }
    }
}

/// Request to submit a normalized attribution payload.
///
/// Attribution shares the report endpoint with properties but is submitted
/// immediately rather than batched; conversion data is time-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionRequest {
    /// SDK version string.
    pub sdk_version: String,
    /// Access key identifying the application.
    pub access_key: String,
    /// Identity token of the submitting device.
    pub client_uid: String,
    /// The normalized attribution payload.
    pub attribution: OutboundAttribution,
}

impl AttributionRequest {
    /// Creates a new attribution request.
    pub fn new(
        sdk_version: impl Into<String>,
        access_key: impl Into<String>,
        client_uid: impl Into<String>,
        attribution: OutboundAttribution,
    ) -> Self {
        Self {
            sdk_version: sdk_version.into(),
            access_key: access_key.into(),
            client_uid: client_uid.into(),
            attribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_json, encode_json};

    #[test]
    fn token_response_constructors() {
        let ok = TokenResponse::success("uid-1");
        assert!(ok.success);
        assert_eq!(ok.client_uid.as_deref(), Some("uid-1"));
        assert!(ok.error.is_none());

        let err = TokenResponse::error("bad key");
        assert!(!err.success);
        assert!(err.client_uid.is_none());
        assert_eq!(err.error.as_deref(), Some("bad key"));
    }

    #[test]
    fn purchase_response_duplicate_flag() {
        let first = PurchaseResponse::success("tok-1");
        assert!(first.success);
        assert!(!first.duplicate);

        let again = PurchaseResponse::duplicate("tok-1");
        assert!(again.success);
        assert!(again.duplicate);
    }

    #[test]
    fn properties_request_wire_shape() {
        let mut properties = BTreeMap::new();
        properties.insert("plan".to_string(), "pro".to_string());

        let request = PropertiesRequest::new(
            "0.4.0",
            "key-1",
            "uid-1",
            Environment::new(),
            properties,
        );

        let bytes = encode_json(&request).unwrap();
        let decoded: PropertiesRequest = decode_json(&bytes).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.properties.get("plan").map(String::as_str), Some("pro"));
    }

    #[test]
    fn error_field_is_omitted_on_success() {
        let bytes = encode_json(&ReportResponse::success(2)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("error"));
    }
}
