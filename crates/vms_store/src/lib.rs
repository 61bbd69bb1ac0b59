//! Remote collection store access
//!
//! Provides:
//! - **CollectionStore**: the operations provisioning needs from a store
//! - **PocketBaseClient**: HTTP implementation with lazy, instance-scoped admin sessions
//! - **InMemoryStore**: deterministic implementation for dry runs and tests

pub mod client;
pub mod error;
pub mod memory;
pub mod store;
pub mod wire;

pub use client::{PocketBaseClient, StoreConfig, DEFAULT_BASE_URL, DEFAULT_TENANTS_COLLECTION};
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use store::CollectionStore;
pub use wire::{CollectionRecord, NewCollection, SchemaUpdate, Session, TenantRecord};
