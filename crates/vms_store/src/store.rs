use async_trait::async_trait;
use vms_ids::{CollectionId, TenantId};

use crate::error::StoreError;
use crate::wire::{CollectionRecord, NewCollection, SchemaUpdate, Session, TenantRecord};

/// Operations provisioning needs from a collection-based store.
///
/// Implementations that require authentication acquire a [`Session`] lazily on
/// the first privileged call and keep it for their own lifetime.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Authenticate and cache a fresh session.
    async fn authenticate(&self) -> Result<Session, StoreError>;

    async fn create_collection(&self, spec: &NewCollection) -> Result<CollectionRecord, StoreError>;

    /// Replace the field list of an existing collection.
    async fn update_collection(
        &self,
        id: &CollectionId,
        update: &SchemaUpdate,
    ) -> Result<CollectionRecord, StoreError>;

    /// Insert the tenant row. A duplicate tenant id is [`StoreError::Conflict`].
    async fn create_tenant_record(
        &self,
        name: &str,
        tenant_id: &TenantId,
    ) -> Result<TenantRecord, StoreError>;

    async fn identifier_in_use(&self, tenant_id: &TenantId) -> Result<bool, StoreError>;

    async fn find_tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantRecord>, StoreError>;

    /// Collections whose name starts with `name_prefix`.
    async fn list_collections(&self, name_prefix: &str) -> Result<Vec<CollectionRecord>, StoreError>;
}
