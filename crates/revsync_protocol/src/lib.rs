//! # RevSync Protocol
//!
//! Wire types and JSON codecs for the RevSync analytics service.
//!
//! This crate provides:
//! - `CanonicalPurchase` for normalized, platform-agnostic purchase records
//! - `PropertySet` for deduplicated user-property batches
//! - `OutboundAttribution` for normalized attribution payloads
//! - Request/response messages for the token, purchase, and report endpoints
//! - JSON encoding/decoding helpers
//!
//! This is a pure protocol crate with no I/O operations. The exact wire
//! schema is owned by the remote service; every outbound request carries the
//! SDK version, the access key, and (once obtained) the client uid.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attribution;
mod codec;
mod environment;
mod messages;
mod properties;
mod purchase;

pub use attribution::{AttributionSource, OutboundAttribution};
pub use codec::{decode_json, encode_json, ProtocolError, ProtocolResult};
pub use environment::Environment;
pub use messages::{
    AttributionRequest, PropertiesRequest, PurchaseRequest, PurchaseResponse, ReportResponse,
    TokenRequest, TokenResponse,
};
pub use properties::{KnownProperty, PropertyEntry, PropertySet};
pub use purchase::{CanonicalPurchase, PurchaseType};
