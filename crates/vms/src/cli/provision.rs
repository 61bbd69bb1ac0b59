//! `vms provision <name>`: run one provisioning from the command line.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use vms::config::{ProvisionArgs, StoreArgs};
use vms_provision::{
    CollectionReport, CreationOutcome, InstantiationReport, ProvisioningResult, TenantService,
    WiringOutcome,
};

#[derive(Debug, Args)]
pub struct ProvisionCommand {
    /// Tenant display name
    pub name: String,

    /// Provision against an in-memory store; nothing is written remotely
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON, including the per-collection report
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub provision: ProvisionArgs,
}

#[derive(Serialize)]
struct ProvisionOutput<'a> {
    #[serde(flatten)]
    result: &'a ProvisioningResult,
    dry_run: bool,
    report: &'a InstantiationReport,
}

pub fn run(cmd: ProvisionCommand) -> Result<()> {
    super::ensure_template(&cmd.provision.template)?;
    let store = super::build_store(&cmd.store, cmd.dry_run)?;
    let service = TenantService::new(store, cmd.provision.settings());

    let rt = super::runtime()?;
    let result = rt
        .block_on(service.create_tenant_configuration(&cmd.name))
        .map_err(|e| super::explain(e, &cmd.store, &cmd.provision.template))?;

    if cmd.json {
        let output = ProvisionOutput {
            result: &result,
            dry_run: cmd.dry_run,
            report: &result.report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_summary(&result, cmd.dry_run);
    Ok(())
}

fn print_summary(result: &ProvisioningResult, dry_run: bool) {
    let report = &result.report;
    if dry_run {
        println!("TENANT PROVISIONED (dry run, nothing written)");
    } else {
        println!("TENANT PROVISIONED");
    }
    println!();
    println!("Name:        {}", result.tenant_name);
    println!("Tenant ID:   {}", result.tenant_id);
    println!(
        "Collections: {} of {} created",
        result.collections_created,
        report.collections.len()
    );
    let elapsed = result.finished_at() - result.started_at();
    println!("Duration:    {} ms", elapsed.num_milliseconds());
    println!();
    println!("{:<40} {:<10} {}", "COLLECTION", "CREATED", "RELATIONS");
    for collection in &report.collections {
        println!(
            "{:<40} {:<10} {}",
            collection.collection_name,
            creation_label(collection),
            wiring_label(collection)
        );
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("{} collection(s) need attention:", failures.len());
        for collection in failures {
            if let CreationOutcome::Failed { reason } = &collection.creation {
                println!("  {}: create failed: {}", collection.collection_name, reason);
            }
            if let Some(WiringOutcome::Failed { reason, .. }) = &collection.wiring {
                println!("  {}: update failed: {}", collection.collection_name, reason);
            }
        }
    }
}

fn creation_label(collection: &CollectionReport) -> &'static str {
    match collection.creation {
        CreationOutcome::Created { .. } => "yes",
        CreationOutcome::Failed { .. } => "FAILED",
    }
}

fn wiring_label(collection: &CollectionReport) -> String {
    match &collection.wiring {
        Some(WiringOutcome::Wired {
            relations,
            unresolved,
            dropped,
        }) => {
            let mut label = format!("{} wired", relations);
            if !unresolved.is_empty() {
                label.push_str(&format!(", {} unresolved", unresolved.len()));
            }
            if !dropped.is_empty() {
                label.push_str(&format!(", {} dropped", dropped.len()));
            }
            label
        }
        Some(WiringOutcome::Skipped { .. }) => "skipped".to_string(),
        Some(WiringOutcome::Failed { .. }) => "FAILED".to_string(),
        None => "-".to_string(),
    }
}
