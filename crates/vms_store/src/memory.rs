//! In-memory collection store
//!
//! Deterministic [`CollectionStore`] used for dry runs and tests. It mirrors the
//! constraints provisioning depends on: unique collection names, no empty `base`
//! collections, unique tenant ids. Like the HTTP client it authenticates lazily:
//! the first operation without a session logs in, and a rejected login aborts
//! that operation. Failures can be injected by collection name suffix.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use vms_ids::{CollectionId, RecordId, TenantId};

use crate::error::StoreError;
use crate::store::CollectionStore;
use crate::wire::{CollectionRecord, NewCollection, SchemaUpdate, Session, TenantRecord};

#[derive(Default)]
struct MemoryState {
    session: Option<Session>,
    collections: Vec<CollectionRecord>,
    creation_requests: Vec<NewCollection>,
    tenants: Vec<TenantRecord>,
    occupied: HashSet<TenantId>,
    all_occupied: bool,
    fail_create: Vec<String>,
    fail_update: Vec<String>,
    reject_auth: bool,
    next_id: u64,
    auth_calls: usize,
    probe_calls: usize,
    update_calls: usize,
}

impl MemoryState {
    fn login(&mut self) -> Result<Session, StoreError> {
        self.auth_calls += 1;
        if self.reject_auth {
            self.session = None;
            return Err(StoreError::Auth("invalid credentials".into()));
        }
        let session = Session::new(format!("memory-session-{}", self.auth_calls));
        self.session = Some(session.clone());
        Ok(session)
    }

    fn ensure_session(&mut self) -> Result<(), StoreError> {
        if self.session.is_none() {
            self.login()?;
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:012}", prefix, self.next_id)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Report these tenant ids as taken when probed.
    pub fn with_occupied_tenant_ids(self, ids: impl IntoIterator<Item = TenantId>) -> Self {
        self.state().occupied.extend(ids);
        self
    }

    /// Report every probed tenant id as taken.
    pub fn with_all_tenant_ids_occupied(self) -> Self {
        self.state().all_occupied = true;
        self
    }

    /// Fail creation of every collection whose name ends with `suffix`.
    pub fn failing_create(self, suffix: impl Into<String>) -> Self {
        self.state().fail_create.push(suffix.into());
        self
    }

    /// Fail schema updates of every collection whose name ends with `suffix`.
    pub fn failing_update(self, suffix: impl Into<String>) -> Self {
        self.state().fail_update.push(suffix.into());
        self
    }

    pub fn rejecting_auth(self) -> Self {
        self.state().reject_auth = true;
        self
    }

    /// Every creation request received, in order, including rejected ones.
    pub fn creation_requests(&self) -> Vec<NewCollection> {
        self.state().creation_requests.clone()
    }

    /// Snapshot of stored collections in creation order.
    pub fn collections(&self) -> Vec<CollectionRecord> {
        self.state().collections.clone()
    }

    pub fn collection_by_name(&self, name: &str) -> Option<CollectionRecord> {
        self.state()
            .collections
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn tenants(&self) -> Vec<TenantRecord> {
        self.state().tenants.clone()
    }

    pub fn auth_calls(&self) -> usize {
        self.state().auth_calls
    }

    pub fn probe_calls(&self) -> usize {
        self.state().probe_calls
    }

    pub fn update_calls(&self) -> usize {
        self.state().update_calls
    }
}

#[async_trait]
impl CollectionStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn authenticate(&self) -> Result<Session, StoreError> {
        self.state().login()
    }

    async fn create_collection(&self, spec: &NewCollection) -> Result<CollectionRecord, StoreError> {
        let mut state = self.state();
        state.ensure_session()?;
        state.creation_requests.push(spec.clone());
        if state.fail_create.iter().any(|s| spec.name.ends_with(s.as_str())) {
            return Err(StoreError::Api {
                status: 400,
                message: format!("injected create failure for {}", spec.name),
            });
        }
        if state.collections.iter().any(|c| c.name == spec.name) {
            return Err(StoreError::Conflict(format!(
                "collection name '{}' already exists",
                spec.name
            )));
        }
        if spec.kind == "base" && spec.schema.is_empty() {
            return Err(StoreError::Api {
                status: 400,
                message: format!("collection '{}' must have at least one field", spec.name),
            });
        }

        let record = CollectionRecord {
            id: CollectionId::new(state.next_id("col")),
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            schema: spec.schema.clone(),
        };
        state.collections.push(record.clone());
        Ok(record)
    }

    async fn update_collection(
        &self,
        id: &CollectionId,
        update: &SchemaUpdate,
    ) -> Result<CollectionRecord, StoreError> {
        let mut state = self.state();
        state.ensure_session()?;
        state.update_calls += 1;
        let fail_update = state.fail_update.clone();
        let record = state
            .collections
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("collection {}", id)))?;
        if fail_update.iter().any(|s| record.name.ends_with(s.as_str())) {
            return Err(StoreError::Api {
                status: 400,
                message: format!("injected update failure for {}", record.name),
            });
        }
        record.schema = update.schema.clone();
        Ok(record.clone())
    }

    async fn create_tenant_record(
        &self,
        name: &str,
        tenant_id: &TenantId,
    ) -> Result<TenantRecord, StoreError> {
        let mut state = self.state();
        state.ensure_session()?;
        if state.tenants.iter().any(|t| &t.tenant_id == tenant_id) {
            return Err(StoreError::Conflict(format!(
                "tenant_id '{}' already exists",
                tenant_id
            )));
        }
        let record = TenantRecord {
            id: RecordId::new(state.next_id("rec")),
            name: name.to_string(),
            tenant_id: tenant_id.clone(),
            created: None,
        };
        state.tenants.push(record.clone());
        Ok(record)
    }

    async fn identifier_in_use(&self, tenant_id: &TenantId) -> Result<bool, StoreError> {
        let mut state = self.state();
        state.ensure_session()?;
        state.probe_calls += 1;
        Ok(state.all_occupied
            || state.occupied.contains(tenant_id)
            || state.tenants.iter().any(|t| &t.tenant_id == tenant_id))
    }

    async fn find_tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantRecord>, StoreError> {
        let mut state = self.state();
        state.ensure_session()?;
        Ok(state
            .tenants
            .iter()
            .find(|t| &t.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_collections(&self, name_prefix: &str) -> Result<Vec<CollectionRecord>, StoreError> {
        let mut state = self.state();
        state.ensure_session()?;
        Ok(state
            .collections
            .iter()
            .filter(|c| c.name.starts_with(name_prefix))
            .cloned()
            .collect())
    }
}
