//! Value objects exchanged by the provisioning saga.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::customer::Customer;
use super::pool::StoreAddress;

/// Customer data the store initializer needs, and nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub company_name: String,
    pub admin_first_name: String,
    pub admin_last_name: String,
    pub admin_email: String,
    pub admin_password_hash: String,
}

impl From<&Customer> for CustomerProfile {
    fn from(customer: &Customer) -> Self {
        Self {
            company_name: customer.company_name.clone(),
            admin_first_name: customer.admin_first_name.clone(),
            admin_last_name: customer.admin_last_name.clone(),
            admin_email: customer.admin_email.clone(),
            admin_password_hash: customer.admin_password_hash.clone(),
        }
    }
}

/// Result of initializing a tenant store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitializedStore {
    pub user_id: Uuid,
    pub role_id: Uuid,
    /// False when the administrator already existed.
    pub created: bool,
}

/// Linkage returned by a successful provisioning call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionedStore {
    pub customer_id: Uuid,
    pub store_id: Uuid,
    pub store_address: StoreAddress,
    pub user_id: Uuid,
    pub role_id: Uuid,
}
