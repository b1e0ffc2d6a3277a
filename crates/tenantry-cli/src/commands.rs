//! Command implementations over a live registry connection.

use serde::Serialize;
use surrealdb::engine::remote::ws::Client;
use tenantry_auth::{JwtCredentialIssuer, LoginResolver};
use tenantry_core::collaborator::{CredentialIssuer, CredentialRequest};
use tenantry_core::error::TenantryError;
use tenantry_core::models::pool::{CreatePoolEntry, StoreAddress};
use tenantry_core::repository::{
    DirectoryRepository, PoolRepository, ReconciliationRepository, Registry,
};
use tenantry_db::repository::SurrealRegistry;
use tenantry_db::{DbError, DbManager, RemoteStoreConnector};
use tenantry_provision::{
    PaymentCaptureHandler, PaymentMode, ProvisioningService, SimulatedCaptureVerifier,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("registry connection: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Tenantry(#[from] TenantryError),

    #[error("output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("live capture needs a payment provider; pass --simulate or set provision.payment_mode = \"simulated\"")]
    LiveCaptureUnavailable,
}

pub type CliResult<T> = Result<T, CliError>;

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Everything a command needs: the registry, the store connector and
/// the loaded configuration.
pub struct App {
    config: AppConfig,
    db: DbManager,
    registry: SurrealRegistry<Client>,
    connector: RemoteStoreConnector,
}

impl App {
    pub async fn connect(config: AppConfig) -> CliResult<Self> {
        let db = DbManager::connect(&config.db).await?;
        let registry = SurrealRegistry::build(
            db.client().clone(),
            config.auth.pepper.clone(),
            config.provision.claim_attempts,
        );
        let connector = RemoteStoreConnector::new(&config.db);
        Ok(Self {
            config,
            db,
            registry,
            connector,
        })
    }

    fn service(&self) -> ProvisioningService<SurrealRegistry<Client>, RemoteStoreConnector> {
        ProvisioningService::new(
            self.registry.clone(),
            self.connector.clone(),
            &self.config.provision,
        )
    }

    pub async fn migrate(&self) -> CliResult<()> {
        tenantry_db::run_migrations(self.db.client()).await?;
        info!("Registry migrations applied");
        Ok(())
    }

    pub async fn pool_add(&self, slot: u32, namespace: String, database: String) -> CliResult<()> {
        let address = StoreAddress::new(namespace, database);
        self.connector.prepare_store(&address).await?;
        let entry = self
            .registry
            .pool()
            .create(CreatePoolEntry { slot, address })
            .await?;
        info!(entry_id = %entry.id, slot = entry.slot, store = %entry.address, "Pool entry added");
        print_json(&entry)
    }

    pub async fn pool_list(&self) -> CliResult<()> {
        let entries = self.registry.pool().list().await?;
        print_json(&entries)
    }

    pub async fn capture(&self, order_ref: &str, simulate: bool) -> CliResult<()> {
        let mode = if simulate {
            PaymentMode::Simulated
        } else {
            self.config.provision.payment_mode
        };
        if mode == PaymentMode::Live {
            return Err(CliError::LiveCaptureUnavailable);
        }

        let handler = PaymentCaptureHandler::new(
            self.service(),
            SimulatedCaptureVerifier::new(),
            JwtCredentialIssuer::new(self.config.auth.clone()),
        );
        let outcome = handler.handle_capture(order_ref).await?;
        print_json(&serde_json::json!({
            "provisioned": outcome.provisioned,
            "credential": outcome.credential,
            "replayed": outcome.replayed,
        }))
    }

    pub async fn provision_retry(&self, customer_id: Uuid) -> CliResult<()> {
        let provisioned = self.service().retry(customer_id).await?;
        print_json(&provisioned)
    }

    pub async fn login(&self, email: &str, password: &str) -> CliResult<()> {
        let resolver = LoginResolver::new(
            self.registry.clone(),
            self.connector.clone(),
            &self.config.auth,
        );
        let principal = resolver.resolve(email, password).await?;
        let credential = JwtCredentialIssuer::new(self.config.auth.clone()).issue(
            &CredentialRequest {
                store_id: principal.store_id,
                user_id: principal.user_id,
                role: principal.role_name.clone(),
                customer_id: principal.customer.as_ref().map(|c| c.id),
            },
        )?;
        print_json(&serde_json::json!({
            "principal": principal,
            "credential": credential,
        }))
    }

    pub async fn directory_set_active(&self, email: &str, active: bool) -> CliResult<()> {
        let entry = self.registry.directory().set_active(email, active).await?;
        info!(email = %entry.email, active = entry.active, "Directory entry updated");
        print_json(&entry)
    }

    pub async fn reconcile_list(&self) -> CliResult<()> {
        let items = self.registry.reconciliations().list_open().await?;
        print_json(&items)
    }

    pub async fn reconcile_retry(&self, item_id: Uuid) -> CliResult<()> {
        let provisioned = self.service().retry_reconciliation(item_id).await?;
        print_json(&provisioned)
    }

    pub async fn reconcile_resolve(&self, item_id: Uuid) -> CliResult<()> {
        let item = self.registry.reconciliations().resolve(item_id).await?;
        info!(item_id = %item.id, "Reconciliation item closed by operator");
        print_json(&item)
    }
}
