//! Runtime configuration.
//!
//! Every setting is a command-line flag with an environment fallback, so the
//! server and the CLI resolve configuration the same way.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use vms_provision::{
    CollectionNaming, EngineOptions, ProvisionSettings, TemplateSource, UnresolvedRelationPolicy,
    DEFAULT_APP_PREFIX, DEFAULT_MAX_ATTEMPTS,
};
use vms_store::{StoreConfig, DEFAULT_BASE_URL, DEFAULT_TENANTS_COLLECTION};

pub const DEFAULT_TEMPLATE: &str = "pb_schema.json";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Store admin credentials are not configured")]
    MissingCredentials,
    #[error("Invalid store URL '{0}': expected http:// or https://")]
    InvalidStoreUrl(String),
}

/// Connection to the remote store.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Base URL of the store
    #[arg(long = "store-url", env = "VMS_STORE_URL", default_value = DEFAULT_BASE_URL)]
    pub store_url: String,

    /// Admin account email
    #[arg(long, env = "VMS_ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Admin account password
    #[arg(long, env = "VMS_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long = "insecure", env = "VMS_STORE_INSECURE")]
    pub accept_invalid_certs: bool,

    /// Per-request timeout in seconds
    #[arg(long = "store-timeout", env = "VMS_STORE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Collection holding tenant records
    #[arg(long, env = "VMS_TENANTS_COLLECTION", default_value = DEFAULT_TENANTS_COLLECTION)]
    pub tenants_collection: String,
}

impl StoreArgs {
    pub fn credentials_configured(&self) -> bool {
        let set = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        set(&self.admin_email) && set(&self.admin_password)
    }

    pub fn store_config(&self) -> Result<StoreConfig, ConfigError> {
        if !(self.store_url.starts_with("http://") || self.store_url.starts_with("https://")) {
            return Err(ConfigError::InvalidStoreUrl(self.store_url.clone()));
        }
        if !self.credentials_configured() {
            return Err(ConfigError::MissingCredentials);
        }
        let email = self.admin_email.clone().unwrap_or_default();
        let password = self.admin_password.clone().unwrap_or_default();
        Ok(StoreConfig::new(&self.store_url, email, password)
            .with_tenants_collection(&self.tenants_collection)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .accept_invalid_certs(self.accept_invalid_certs))
    }
}

/// How tenants are provisioned.
#[derive(Debug, Clone, Args)]
pub struct ProvisionArgs {
    /// Schema template (JSON export of collections)
    #[arg(long, env = "VMS_TEMPLATE", default_value = DEFAULT_TEMPLATE)]
    pub template: PathBuf,

    /// First segment of every tenant collection name
    #[arg(long, env = "VMS_APP_PREFIX", default_value = DEFAULT_APP_PREFIX)]
    pub app_prefix: String,

    /// Namespace separator inside template collection names
    #[arg(long, env = "VMS_TEMPLATE_SEPARATOR")]
    pub template_separator: Option<String>,

    /// Relations whose target was not created: leave, drop or fail
    #[arg(long, env = "VMS_UNRESOLVED_RELATIONS", default_value = "leave")]
    pub unresolved_relations: UnresolvedRelationPolicy,

    /// Tenant ID candidates to try before giving up
    #[arg(long, env = "VMS_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl ProvisionArgs {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            naming: CollectionNaming::new(&self.app_prefix)
                .with_template_separator(self.template_separator.clone()),
            unresolved_relations: self.unresolved_relations,
        }
    }

    pub fn settings(&self) -> ProvisionSettings {
        let mut settings = ProvisionSettings::new(TemplateSource::Path(self.template.clone()))
            .with_engine(self.engine_options());
        settings.max_attempts = self.max_attempts;
        settings
    }
}

/// Resolved configuration as shown to operators. Never carries the password.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub home: PathBuf,
    pub logs: PathBuf,
    pub store: StoreReport,
    pub provisioning: ProvisioningReport,
}

#[derive(Debug, Serialize)]
pub struct StoreReport {
    pub url: String,
    pub admin_email: Option<String>,
    pub admin_password_set: bool,
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
    pub tenants_collection: String,
}

#[derive(Debug, Serialize)]
pub struct ProvisioningReport {
    pub template: PathBuf,
    pub template_exists: bool,
    pub app_prefix: String,
    pub template_separator: Option<String>,
    pub unresolved_relations: UnresolvedRelationPolicy,
    pub max_attempts: u32,
}

impl ConfigReport {
    pub fn resolve(store: &StoreArgs, provision: &ProvisionArgs) -> Self {
        Self {
            home: vms_logging::vms_home(),
            logs: vms_logging::logs_dir(),
            store: StoreReport {
                url: store.store_url.clone(),
                admin_email: store.admin_email.clone(),
                admin_password_set: store
                    .admin_password
                    .as_deref()
                    .is_some_and(|p| !p.is_empty()),
                accept_invalid_certs: store.accept_invalid_certs,
                timeout_secs: store.timeout_secs,
                tenants_collection: store.tenants_collection.clone(),
            },
            provisioning: ProvisioningReport {
                template: provision.template.clone(),
                template_exists: provision.template.exists(),
                app_prefix: provision.app_prefix.clone(),
                template_separator: provision.template_separator.clone(),
                unresolved_relations: provision.unresolved_relations,
                max_attempts: provision.max_attempts,
            },
        }
    }
}
