//! # RevSync Engine
//!
//! Identity and synchronization engine for the RevSync analytics SDK.
//!
//! This crate provides:
//! - Durable per-device identity (token acquisition, validation, persistence)
//! - Purchase conversion and submission
//! - Deduplicated user-property buffering with a periodic upload scheduler
//! - Attribution forwarding
//! - A session composition root with one-time initialization
//!
//! ## Architecture
//!
//! The engine reacts to events from multiple triggering contexts: host API
//! calls, billing-adapter notifications, platform lifecycle transitions,
//! and the periodic scheduler. All of these converge on the [`SyncClient`]
//! orchestrator, which owns the token lifecycle and the property buffer.
//! Asynchronous collaborators are modeled as channels with a single
//! consumer instead of callbacks, which keeps state transitions free of
//! reentrancy hazards.
//!
//! ## Key Invariants
//!
//! - Initialization is idempotent: a [`SessionCell`] returns the existing
//!   session on every call after the first
//! - At most one valid identity token exists per process lifetime
//! - Property writes dedup by key (last write wins) and each write is
//!   flushed at most once
//! - A failed flush drops its batch; memory stays bounded
//! - The only fatal error is an invalid configuration

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adid;
mod attribution;
mod billing;
mod client;
mod config;
mod converter;
mod error;
mod http;
mod lifecycle;
mod properties;
mod scheduler;
mod session;
mod token;
mod transport;

pub use adid::{AdvertisingIdProvider, FixedAdvertisingIdProvider, NullAdvertisingIdProvider};
pub use attribution::AttributionForwarder;
pub use billing::{billing_channel, BillingReceiver, PlatformPurchase, PurchaseReady, SkuDetails};
pub use client::{ClientState, ClientStats, SyncClient};
pub use config::{EngineConfig, RetryConfig, SDK_VERSION};
pub use converter::PurchaseConverter;
pub use error::{EngineError, EngineResult};
pub use http::{
    HttpClient, HttpTransport, LoopbackClient, LoopbackServer, PURCHASE_ENDPOINT, REPORT_ENDPOINT,
    TOKEN_ENDPOINT,
};
pub use lifecycle::{lifecycle_channel, LifecycleEvent, LifecycleReceiver};
pub use properties::PropertyBuffer;
pub use scheduler::UploadScheduler;
pub use session::{Collaborators, PurchaseCallback, Session, SessionCell};
pub use token::{TokenStore, TOKEN_STORAGE_KEY};
pub use transport::{AnalyticsTransport, MockTransport};
