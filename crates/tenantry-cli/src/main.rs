//! Tenantry operator CLI.
//!
//! ```bash
//! tenantry migrate
//! tenantry pool add --slot 1 --namespace pool --database tenant_001
//! tenantry capture ORDER-123 --simulate
//! tenantry reconcile list
//! tenantry reconcile retry <item-id>
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;
mod config;

use crate::commands::{App, CliResult};
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "tenantry")]
#[command(version)]
#[command(about = "Tenant store provisioning and login routing", long_about = None)]
struct Cli {
    /// Configuration file (TOML, extension optional)
    #[arg(long, short, env = "TENANTRY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply registry schema migrations
    Migrate,
    /// Manage the tenant pool
    Pool {
        #[command(subcommand)]
        action: PoolCommands,
    },
    /// Handle a payment capture callback for an order
    Capture {
        order_ref: String,
        /// Complete the capture with synthetic references
        #[arg(long)]
        simulate: bool,
    },
    /// Provisioning maintenance
    Provision {
        #[command(subcommand)]
        action: ProvisionCommands,
    },
    /// Resolve a login and print the principal and an access token
    Login {
        email: String,
        #[arg(long, env = "TENANTRY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Login directory maintenance
    Directory {
        #[command(subcommand)]
        action: DirectoryCommands,
    },
    /// Manual reconciliation queue
    Reconcile {
        #[command(subcommand)]
        action: ReconcileCommands,
    },
}

#[derive(Subcommand)]
enum PoolCommands {
    /// Prepare a store and add it to the pool
    Add {
        #[arg(long)]
        slot: u32,
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        database: String,
    },
    /// List pool entries in slot order
    List,
}

#[derive(Subcommand)]
enum ProvisionCommands {
    /// Replay provisioning for a customer with a settled payment
    Retry { customer_id: Uuid },
}

#[derive(Subcommand)]
enum DirectoryCommands {
    /// Enable routing for an email
    Enable { email: String },
    /// Disable routing for an email
    Disable { email: String },
}

#[derive(Subcommand)]
enum ReconcileCommands {
    /// List open items
    List,
    /// Replay provisioning for an item and resolve it on success
    Retry { item_id: Uuid },
    /// Close an item that was fixed by hand
    Resolve { item_id: Uuid },
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(&cli.config)?;
    let app = App::connect(config).await?;

    match cli.command {
        Commands::Migrate => app.migrate().await,
        Commands::Pool { action } => match action {
            PoolCommands::Add {
                slot,
                namespace,
                database,
            } => app.pool_add(slot, namespace, database).await,
            PoolCommands::List => app.pool_list().await,
        },
        Commands::Capture { order_ref, simulate } => app.capture(&order_ref, simulate).await,
        Commands::Provision { action } => match action {
            ProvisionCommands::Retry { customer_id } => app.provision_retry(customer_id).await,
        },
        Commands::Login { email, password } => app.login(&email, &password).await,
        Commands::Directory { action } => match action {
            DirectoryCommands::Enable { email } => app.directory_set_active(&email, true).await,
            DirectoryCommands::Disable { email } => app.directory_set_active(&email, false).await,
        },
        Commands::Reconcile { action } => match action {
            ReconcileCommands::List => app.reconcile_list().await,
            ReconcileCommands::Retry { item_id } => app.reconcile_retry(item_id).await,
            ReconcileCommands::Resolve { item_id } => app.reconcile_resolve(item_id).await,
        },
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tenantry=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
