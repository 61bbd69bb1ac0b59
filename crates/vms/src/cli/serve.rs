//! `vms serve`: run the provisioning API.

use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use vms::api;
use vms::config::{ProvisionArgs, StoreArgs, DEFAULT_BIND};
use vms_provision::TenantService;

#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(long, env = "VMS_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Serve against an in-memory store
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub provision: ProvisionArgs,
}

pub fn run(cmd: ServeCommand) -> Result<()> {
    super::ensure_template(&cmd.provision.template)?;
    let store = super::build_store(&cmd.store, cmd.dry_run)?;
    let service = Arc::new(TenantService::new(store, cmd.provision.settings()));

    tracing::info!(
        "Serving tenants from template {} (prefix '{}', unresolved relations: {})",
        cmd.provision.template.display(),
        cmd.provision.app_prefix,
        cmd.provision.unresolved_relations
    );

    let rt = super::runtime()?;
    rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(cmd.bind)
            .await
            .with_context(|| format!("Failed to bind {}", cmd.bind))?;
        api::serve(listener, service).await.context("API server failed")
    })
}
