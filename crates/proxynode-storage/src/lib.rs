//! ProxyNode Session Storage
//!
//! This crate provides versioned, expiring session records on top of a
//! generic key-value backend:
//! - Backend contract (flat string maps, conditional writes)
//! - Session record codec
//! - Session record store with optimistic concurrency
//! - In-memory backend

pub mod config;
pub mod memory;
pub mod record;
pub mod session;
pub mod traits;

pub use config::SessionStoreConfig;
pub use memory::InMemoryBackend;
pub use record::SessionRecord;
pub use session::SessionRecordStore;
pub use traits::{CasOutcome, KeyValueBackend, RecordFields, StorageError, StorageResult};
