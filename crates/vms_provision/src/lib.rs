//! Tenant provisioning
//!
//! Provides:
//! - **Allocator**: random, probed tenant ids ([`TenantIdAllocator`])
//! - **Engine**: two-pass template instantiation ([`instantiate`])
//! - **Service**: one full provisioning run per tenant ([`TenantService`])

pub mod allocator;
pub mod engine;
pub mod error;
pub mod naming;
pub mod service;

pub use allocator::{Allocation, TenantIdAllocator, DEFAULT_MAX_ATTEMPTS};
pub use engine::{
    instantiate, CollectionReport, CreationOutcome, EngineOptions, IdMapping, InstantiationReport,
    SkipReason, UnresolvedRelation, UnresolvedRelationPolicy, WiringOutcome, PLACEHOLDER_FIELD,
};
pub use error::ProvisionError;
pub use naming::{CollectionNaming, DEFAULT_APP_PREFIX};
pub use service::{
    validate_tenant_name, ProvisionSettings, ProvisioningResult, TemplateSource, TenantDetail,
    TenantService,
};
