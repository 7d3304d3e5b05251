//! # RevSync Storage
//!
//! Local durable key/value storage for RevSync.
//!
//! This crate provides the lowest-level persistence abstraction for the
//! engine. Stores are **opaque byte maps** - they do not interpret the
//! values they hold.
//!
//! ## Design Principles
//!
//! - Stores are simple key/value maps (get, set, remove)
//! - `set` is atomic: a reader never observes a partial value
//! - Values survive process restarts (file-backed stores)
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral use
//! - [`FileStore`] - File-per-key persistence using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use revsync_storage::{InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! store.set("token", b"abc123").unwrap();
//! assert_eq!(store.get("token").unwrap(), Some(b"abc123".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use store::KeyValueStore;
