//! CLI subcommands

pub mod config;
pub mod error;
pub mod provision;
pub mod serve;
pub mod tenant;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use vms::config::{ConfigError, StoreArgs};
use vms_provision::ProvisionError;
use vms_schema::TemplateError;
use vms_store::{CollectionStore, InMemoryStore, PocketBaseClient, StoreError};

use error::HelpfulError;

/// Store for a command: in-memory for dry runs, the configured store otherwise.
pub(crate) fn build_store(args: &StoreArgs, dry_run: bool) -> Result<Arc<dyn CollectionStore>> {
    if dry_run {
        tracing::info!("Dry run: using in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    let config = args.store_config().map_err(|e| match e {
        ConfigError::MissingCredentials => HelpfulError::missing_credentials(),
        ConfigError::InvalidStoreUrl(url) => HelpfulError::invalid_store_url(&url),
    })?;
    let client = PocketBaseClient::new(config).context("Failed to build store client")?;
    Ok(Arc::new(client))
}

pub(crate) fn ensure_template(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(HelpfulError::template_not_found(path).into());
    }
    Ok(())
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Turn a failed run into an operator-facing error.
pub(crate) fn explain(err: ProvisionError, store: &StoreArgs, template: &Path) -> anyhow::Error {
    match err {
        ProvisionError::Template(TemplateError::Io { .. }) => {
            HelpfulError::template_not_found(template).into()
        }
        ProvisionError::Template(e) => HelpfulError::invalid_template(template, &e.to_string()).into(),
        ProvisionError::Exhausted { attempts } => HelpfulError::allocation_exhausted(attempts).into(),
        ProvisionError::InvalidName(reason) => HelpfulError::new(format!("Invalid tenant name: {}", reason))
            .with_suggestion("TRY: Use 3-64 letters, digits, spaces, '-' or '_'")
            .into(),
        ProvisionError::Store(StoreError::Auth(details))
        | ProvisionError::TenantRecord(StoreError::Auth(details)) => {
            HelpfulError::authentication_failed(&store.store_url, &details).into()
        }
        ProvisionError::Store(StoreError::Http(details))
        | ProvisionError::TenantRecord(StoreError::Http(details)) => {
            HelpfulError::store_unreachable(&store.store_url, &details).into()
        }
        other => anyhow::Error::new(other).context("Provisioning failed"),
    }
}
