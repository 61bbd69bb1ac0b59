//! `vms config`: show the resolved configuration.

use clap::Args;
use vms::config::{ConfigReport, ProvisionArgs, StoreArgs};

#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Show configuration in JSON format
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub provision: ProvisionArgs,
}

pub fn run(cmd: ConfigCommand) -> anyhow::Result<()> {
    let report = ConfigReport::resolve(&cmd.store, &cmd.provision);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let store = &report.store;
    let provisioning = &report.provisioning;
    println!("VMS CONFIGURATION");
    println!("=================");
    println!();
    println!("Home:     {}", report.home.display());
    println!("Logs:     {}", report.logs.display());
    println!();
    println!("Store:    {}", store.url);
    println!(
        "  Admin:  {}",
        store.admin_email.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Password: {}",
        if store.admin_password_set { "set" } else { "not set" }
    );
    println!("  Tenants collection: {}", store.tenants_collection);
    println!("  Timeout: {}s", store.timeout_secs);
    if store.accept_invalid_certs {
        println!("  TLS verification: DISABLED");
    }
    println!();
    println!(
        "Template: {} ({})",
        provisioning.template.display(),
        if provisioning.template_exists { "exists" } else { "not found" }
    );
    println!("  App prefix: {}", provisioning.app_prefix);
    println!(
        "  Template separator: {}",
        provisioning.template_separator.as_deref().unwrap_or("(none)")
    );
    println!("  Unresolved relations: {}", provisioning.unresolved_relations);
    println!("  Max ID attempts: {}", provisioning.max_attempts);

    Ok(())
}
