//! Tenant provisioning runs.
//!
//! [`TenantService`] ties the pieces together for one tenant:
//! validate name, load template, allocate an id, record the tenant, instantiate.
//! The template is loaded before anything is written to the store, so a broken
//! template never leaves a tenant record behind.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use vms_ids::{TenantId, DEFAULT_TENANT_ID_LEN};
use vms_schema::{Template, TemplateError};
use vms_store::CollectionStore;

use crate::allocator::{Allocation, TenantIdAllocator, DEFAULT_MAX_ATTEMPTS};
use crate::engine::{self, EngineOptions, InstantiationReport};
use crate::error::ProvisionError;

pub const MIN_TENANT_NAME_LEN: usize = 3;
pub const MAX_TENANT_NAME_LEN: usize = 64;

/// Where a run gets its template from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// Re-read on every run.
    Path(PathBuf),
    Loaded(Arc<Template>),
}

impl TemplateSource {
    pub fn load(&self) -> Result<Arc<Template>, TemplateError> {
        match self {
            TemplateSource::Path(path) => Ok(Arc::new(Template::load(path)?)),
            TemplateSource::Loaded(template) => Ok(Arc::clone(template)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub template: TemplateSource,
    pub engine: EngineOptions,
    pub max_attempts: u32,
    pub id_length: usize,
    /// Fixed allocator seed; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl ProvisionSettings {
    pub fn new(template: TemplateSource) -> Self {
        Self {
            template,
            engine: EngineOptions::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            id_length: DEFAULT_TENANT_ID_LEN,
            rng_seed: None,
        }
    }

    pub fn with_engine(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningResult {
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub collections_created: usize,
    pub status: &'static str,
    #[serde(skip_serializing)]
    pub report: InstantiationReport,
}

impl ProvisioningResult {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.report.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.report.finished_at
    }
}

/// A tenant as currently present in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantDetail {
    pub tenant_id: TenantId,
    pub tenant_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Names of collections carrying the tenant prefix.
    pub collections: Vec<String>,
}

/// Trim `name` and check it is usable as a tenant name.
pub fn validate_tenant_name(name: &str) -> Result<String, ProvisionError> {
    let name = name.trim();
    let len = name.chars().count();
    if len < MIN_TENANT_NAME_LEN || len > MAX_TENANT_NAME_LEN {
        return Err(ProvisionError::InvalidName(format!(
            "must be between {} and {} characters",
            MIN_TENANT_NAME_LEN, MAX_TENANT_NAME_LEN
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')))
    {
        return Err(ProvisionError::InvalidName(format!(
            "character '{}' is not allowed (letters, digits, spaces, '-' and '_' only)",
            c
        )));
    }
    Ok(name.to_string())
}

pub struct TenantService {
    store: Arc<dyn CollectionStore>,
    settings: ProvisionSettings,
}

impl TenantService {
    pub fn new(store: Arc<dyn CollectionStore>, settings: ProvisionSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.store
    }

    pub fn settings(&self) -> &ProvisionSettings {
        &self.settings
    }

    /// Provision a new tenant called `name`.
    pub async fn create_tenant_configuration(
        &self,
        name: &str,
    ) -> Result<ProvisioningResult, ProvisionError> {
        let name = validate_tenant_name(name)?;
        let template = self.settings.template.load()?;

        let tenant_id = self.allocate().await?;
        self.store
            .create_tenant_record(&name, &tenant_id)
            .await
            .map_err(ProvisionError::TenantRecord)?;
        tracing::info!("Recorded tenant '{}' as {}", name, tenant_id);

        let report =
            engine::instantiate(self.store.as_ref(), &template, &tenant_id, &self.settings.engine)
                .await;

        Ok(ProvisioningResult {
            tenant_id,
            tenant_name: name,
            collections_created: report.collections_created(),
            status: "success",
            report,
        })
    }

    async fn allocate(&self) -> Result<TenantId, ProvisionError> {
        let allocator = TenantIdAllocator::new(self.settings.max_attempts, self.settings.id_length)?;
        let mut rng = match self.settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        match allocator.allocate(self.store.as_ref(), &mut rng).await? {
            Allocation::Allocated(tenant_id) => Ok(tenant_id),
            Allocation::Exhausted { attempts } => Err(ProvisionError::Exhausted { attempts }),
        }
    }

    /// The tenant record plus the collections currently carrying its prefix.
    pub async fn describe_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<TenantDetail>, ProvisionError> {
        let Some(record) = self.store.find_tenant(tenant_id).await? else {
            return Ok(None);
        };
        let prefix = self.settings.engine.naming.tenant_prefix(tenant_id);
        let collections = self
            .store
            .list_collections(&prefix)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        Ok(Some(TenantDetail {
            tenant_id: record.tenant_id,
            tenant_name: record.name,
            created: record.created,
            collections,
        }))
    }
}
