//! Login resolution across the central directory and tenant stores.
//!
//! A login costs one directory lookup and one tenant-store lookup,
//! whatever the number of provisioned stores. The directory row names
//! both the store and the user id inside it, so no store is ever probed
//! speculatively.
//!
//! Callers only see [`TenantryError::InvalidCredentials`],
//! [`TenantryError::InactiveAccount`], or an infrastructure error.
//! An unknown email and a wrong password are indistinguishable.

use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::customer::CustomerSummary;
use tenantry_core::models::directory::{DirectoryEntry, UserType, normalize_email};
use tenantry_core::models::pool::PoolEntry;
use tenantry_core::models::principal::SessionPrincipal;
use tenantry_core::models::tenant::UserStatus;
use tenantry_core::repository::{
    CustomerRepository, DirectoryRepository, PoolRepository, Registry, TenantStore,
    TenantStoreConnector,
};
use tracing::{error, info, warn};

use crate::config::AuthConfig;
use crate::password;

/// Resolves `(email, password)` to a store-scoped session principal.
///
/// Generic over the registry and the tenant-store connector so that the
/// auth layer has no dependency on the database crate.
pub struct LoginResolver<R: Registry, K: TenantStoreConnector> {
    registry: R,
    connector: K,
    pepper: Option<String>,
}

impl<R: Registry, K: TenantStoreConnector> LoginResolver<R, K> {
    pub fn new(registry: R, connector: K, config: &AuthConfig) -> Self {
        Self {
            registry,
            connector,
            pepper: config.pepper.clone(),
        }
    }

    pub async fn resolve(&self, email: &str, password: &str) -> TenantryResult<SessionPrincipal> {
        let email = normalize_email(email);

        // Phase 1: directory.
        let entry = match self.registry.directory().get_by_email(&email).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => {
                password::verify_decoy(password);
                info!(email = %email, "Login rejected: no directory entry");
                return Err(TenantryError::InvalidCredentials);
            }
            Err(e) => {
                error!(email = %email, error = %e, "Directory lookup failed");
                return Err(TenantryError::RegistryUnavailable);
            }
        };

        if !entry.active {
            info!(email = %email, "Login rejected: directory entry inactive");
            return Err(TenantryError::InactiveAccount);
        }

        let pool_entry = self.store_of(&entry).await?;

        // Phase 2: the one tenant store that holds this user.
        let store = self.connector.connect(&pool_entry.address).await.map_err(|e| {
            error!(store = %pool_entry.address, error = %e, "Tenant store unreachable during login");
            TenantryError::StoreUnreachable {
                store: pool_entry.address.to_string(),
            }
        })?;

        let user = match store.get_user(entry.user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                warn!(
                    email = %email,
                    store = %pool_entry.address,
                    user_id = %entry.user_id,
                    "Directory points at a user the store does not have"
                );
                password::verify_decoy(password);
                return Err(TenantryError::InvalidCredentials);
            }
            Err(e) => {
                error!(store = %pool_entry.address, error = %e, "Tenant store user lookup failed");
                return Err(TenantryError::StoreUnreachable {
                    store: pool_entry.address.to_string(),
                });
            }
        };

        match password::verify_password(password, &user.password_hash, self.pepper.as_deref()) {
            Ok(true) => {}
            Ok(false) => {
                info!(email = %email, "Login rejected: password mismatch");
                return Err(TenantryError::InvalidCredentials);
            }
            Err(e) => {
                error!(email = %email, error = %e, "Stored password hash is unusable");
                return Err(TenantryError::InvalidCredentials);
            }
        }

        if user.status != UserStatus::Active {
            info!(email = %email, "Login rejected: store user inactive");
            return Err(TenantryError::InactiveAccount);
        }

        if let Err(e) = store.record_login(user.id).await {
            warn!(user_id = %user.id, error = %e, "Failed to record last login");
        }

        let customer = match entry.user_type {
            UserType::Administrator => self.customer_summary(&pool_entry).await,
            UserType::Member => None,
        };

        info!(
            email = %email,
            store = %pool_entry.address,
            user_id = %user.id,
            role = %user.role_name,
            "Login resolved"
        );

        Ok(SessionPrincipal {
            store_id: entry.store_id,
            store_address: pool_entry.address,
            user_id: user.id,
            username: user.username,
            email: user.email,
            role_id: user.role_id,
            role_name: user.role_name,
            user_type: entry.user_type,
            customer,
        })
    }

    async fn store_of(&self, entry: &DirectoryEntry) -> TenantryResult<PoolEntry> {
        self.registry
            .pool()
            .get_by_id(entry.store_id)
            .await
            .map_err(|e| {
                error!(
                    email = %entry.email,
                    store_id = %entry.store_id,
                    error = %e,
                    "Pool entry lookup failed during login"
                );
                if e.is_not_found() {
                    TenantryError::StoreUnreachable {
                        store: entry.store_id.to_string(),
                    }
                } else {
                    TenantryError::RegistryUnavailable
                }
            })
    }

    async fn customer_summary(&self, pool_entry: &PoolEntry) -> Option<CustomerSummary> {
        let customer_id = pool_entry.claimant?;
        match self.registry.customers().get_by_id(customer_id).await {
            Ok(customer) => Some(customer.summary()),
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "Customer summary unavailable");
                None
            }
        }
    }
}
