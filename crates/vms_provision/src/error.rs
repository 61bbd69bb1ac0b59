use thiserror::Error;
use vms_schema::TemplateError;
use vms_store::StoreError;

/// Reasons a provisioning run stops before or instead of instantiating.
///
/// Per-collection failures are not errors; they are recorded in the
/// [`crate::InstantiationReport`].
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid tenant name: {0}")]
    InvalidName(String),

    #[error("Template load failed: {0}")]
    Template(#[from] TemplateError),

    #[error("Tenant ID length {length} is outside 1..={max}")]
    InvalidIdLength { length: usize, max: usize },

    #[error("No free tenant ID after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("Failed to create tenant record: {0}")]
    TenantRecord(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProvisionError {
    /// Caller-side mistake rather than a store or template problem.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ProvisionError::InvalidName(_))
    }
}
