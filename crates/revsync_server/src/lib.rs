//! # RevSync Server
//!
//! Reference in-memory analytics service for RevSync.
//!
//! This server handles the three engine-facing endpoints - obtain-token,
//! submit-purchase, and submit-report - using the RevSync protocol types.
//! It maintains an in-memory record store and is used by the engine's
//! integration tests through the loopback client.
//!
//! Server-side semantics worth noting:
//! - client uids are HMAC-SHA256 signed, so a forged uid is rejected
//! - purchases are deduplicated by purchase token: redelivered purchase
//!   notifications are acknowledged without double-counting revenue
//! - property batches are merged per uid (last write wins)

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod store;

pub use auth::TokenMinter;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use server::AnalyticsServer;
pub use store::{AttributionRecord, PurchaseRecord, RecordStore};
