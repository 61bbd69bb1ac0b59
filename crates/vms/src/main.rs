//! VMS tenant provisioning launcher
//!
//! - **serve**: HTTP provisioning API
//! - **provision**: one-off provisioning from the shell
//! - **tenant show**: inspect a provisioned tenant
//! - **config**: resolved configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use vms_logging::LogConfig;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "vms", version, about = "Tenant provisioning for the VMS platform")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the provisioning API
    Serve(cli::serve::ServeCommand),

    /// Provision a new tenant from the schema template
    Provision(cli::provision::ProvisionCommand),

    /// Inspect tenants
    Tenant {
        #[command(subcommand)]
        action: cli::tenant::TenantAction,
    },

    /// Show resolved configuration
    Config(cli::config::ConfigCommand),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Provision(cmd) => cmd.json,
        Commands::Tenant {
            action: cli::tenant::TenantAction::Show { json, .. },
        } => *json,
        Commands::Config(cmd) => cmd.json,
        Commands::Serve(_) => false,
    }
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve(cmd) => cli::serve::run(cmd),
        Commands::Provision(cmd) => cli::provision::run(cmd),
        Commands::Tenant { action } => cli::tenant::run(action),
        Commands::Config(cmd) => cli::config::run(cmd),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let is_server = matches!(cli.command, Commands::Serve(_));
    let json_mode = command_wants_json(&cli.command);
    let _log_guard = match vms_logging::init_logging(LogConfig {
        app_name: "vms",
        verbose: cli.verbose || is_server,
        file: is_server,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                let body = serde_json::json!({
                    "status": "error",
                    "message": format!("{:#}", err),
                });
                println!("{}", body);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}
