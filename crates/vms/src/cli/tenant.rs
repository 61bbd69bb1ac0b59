//! `vms tenant ...`: inspect provisioned tenants.

use anyhow::Result;
use clap::Subcommand;
use vms::config::{ProvisionArgs, StoreArgs};
use vms_ids::TenantId;
use vms_provision::{ProvisionError, TenantService};

use super::error::HelpfulError;

#[derive(Debug, Subcommand)]
pub enum TenantAction {
    /// Show a tenant and the collections carrying its prefix
    Show {
        /// Tenant ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        provision: ProvisionArgs,
    },
}

pub fn run(action: TenantAction) -> Result<()> {
    match action {
        TenantAction::Show {
            id,
            json,
            store,
            provision,
        } => run_show(&id, json, &store, &provision),
    }
}

fn run_show(id: &str, json: bool, store: &StoreArgs, provision: &ProvisionArgs) -> Result<()> {
    let tenant_id = TenantId::parse(id).map_err(|_| HelpfulError::invalid_tenant_id(id))?;
    let service = TenantService::new(super::build_store(store, false)?, provision.settings());

    let rt = super::runtime()?;
    let detail = rt
        .block_on(service.describe_tenant(&tenant_id))
        .map_err(|e: ProvisionError| super::explain(e, store, &provision.template))?;
    let Some(detail) = detail else {
        return Err(HelpfulError::tenant_not_found(id)
            .with_suggestion("TRY: vms provision <name>   # Create a tenant")
            .into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("TENANT {}", detail.tenant_id);
    println!();
    println!("Name:    {}", detail.tenant_name);
    if let Some(created) = &detail.created {
        println!("Created: {}", created);
    }
    println!("Collections ({}):", detail.collections.len());
    for name in &detail.collections {
        println!("  {}", name);
    }
    Ok(())
}
