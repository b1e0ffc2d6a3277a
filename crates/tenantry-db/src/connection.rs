//! SurrealDB connection management for the registry and tenant stores.

use std::collections::HashMap;

use serde::Deserialize;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::pool::StoreAddress;
use tenantry_core::repository::TenantStoreConnector;
use tracing::{info, warn};

use crate::error::DbError;
use crate::repository::SurrealTenantStore;
use crate::schema::run_store_migrations;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// Registry namespace.
    pub namespace: String,
    /// Registry database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "tenantry".into(),
            database: "registry".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

async fn open(
    url: &str,
    username: &str,
    password: &str,
) -> Result<Surreal<Client>, surrealdb::Error> {
    let db = Surreal::new::<Ws>(url).await?;
    db.signin(Root {
        username: username.to_string(),
        password: password.to_string(),
    })
    .await?;
    Ok(db)
}

/// Manages the connection to the central registry.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect to the registry using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to registry"
        );

        let db = open(&config.url, &config.username, &config.password).await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to registry");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

fn validate_identifier(value: &str) -> Result<(), DbError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(DbError::Query(format!("invalid store identifier: {value:?}")))
    }
}

/// Opens tenant stores that live on a SurrealDB server, one fresh
/// connection per call.
#[derive(Debug, Clone)]
pub struct RemoteStoreConnector {
    url: String,
    username: String,
    password: String,
}

impl RemoteStoreConnector {
    /// Uses the server URL and root credentials from `config`; the
    /// namespace and database come from each store address.
    pub fn new(config: &DbConfig) -> Self {
        Self {
            url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    async fn open_store(&self, address: &StoreAddress) -> Result<Surreal<Client>, DbError> {
        let db = open(&self.url, &self.username, &self.password).await?;
        db.use_ns(&address.namespace)
            .use_db(&address.database)
            .await?;
        Ok(db)
    }

    /// Create the store's namespace and database if absent and apply the
    /// fixed tenant schema. Run once per pool entry, before it is added
    /// to the pool.
    pub async fn prepare_store(&self, address: &StoreAddress) -> Result<(), DbError> {
        validate_identifier(&address.namespace)?;
        validate_identifier(&address.database)?;

        let db = open(&self.url, &self.username, &self.password).await?;
        let ddl = format!(
            "DEFINE NAMESPACE IF NOT EXISTS `{ns}`; \
             USE NS `{ns}`; \
             DEFINE DATABASE IF NOT EXISTS `{db}`;",
            ns = address.namespace,
            db = address.database,
        );
        db.query(ddl).await?.check().map_err(DbError::classify)?;
        db.use_ns(&address.namespace)
            .use_db(&address.database)
            .await?;
        run_store_migrations(&db).await?;

        info!(store = %address, "Tenant store prepared");
        Ok(())
    }
}

impl TenantStoreConnector for RemoteStoreConnector {
    type Store = SurrealTenantStore<Client>;

    async fn connect(&self, address: &StoreAddress) -> TenantryResult<Self::Store> {
        match self.open_store(address).await {
            Ok(db) => Ok(SurrealTenantStore::new(db)),
            Err(e) => {
                warn!(store = %address, error = %e, "Tenant store connection failed");
                Err(TenantryError::StoreUnreachable {
                    store: address.to_string(),
                })
            }
        }
    }
}

/// Connector over already-opened handles, keyed by store address.
///
/// Used for embedded deployments and tests where each store is its own
/// engine instance.
#[derive(Clone)]
pub struct HandleStoreConnector<C: Connection> {
    stores: HashMap<StoreAddress, Surreal<C>>,
}

impl<C: Connection> HandleStoreConnector<C> {
    pub fn new() -> Self {
        Self {
            stores: HashMap::new(),
        }
    }

    pub fn insert(&mut self, address: StoreAddress, db: Surreal<C>) {
        self.stores.insert(address, db);
    }

    pub fn handle(&self, address: &StoreAddress) -> Option<&Surreal<C>> {
        self.stores.get(address)
    }
}

impl<C: Connection> Default for HandleStoreConnector<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection> TenantStoreConnector for HandleStoreConnector<C> {
    type Store = SurrealTenantStore<C>;

    async fn connect(&self, address: &StoreAddress) -> TenantryResult<Self::Store> {
        self.stores
            .get(address)
            .cloned()
            .map(SurrealTenantStore::new)
            .ok_or_else(|| TenantryError::StoreUnreachable {
                store: address.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_restricted() {
        assert!(validate_identifier("tenant_007").is_ok());
        assert!(validate_identifier("pool-a").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("x`; REMOVE NAMESPACE y").is_err());
    }
}
