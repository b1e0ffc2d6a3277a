//! Customer domain model.
//!
//! A customer is one registration in the registry. Registration itself
//! happens elsewhere; this subsystem only mutates a customer once its
//! payment is confirmed, and never deletes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Where the customer stands in the provisioning saga.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProvisioningStatus {
    /// No store has been claimed yet.
    Unassigned,
    /// A store is claimed and linked but not yet initialized.
    Assigned,
    /// Store initialized and the administrator is routable.
    Active,
    /// A claim was released after the store failed to initialize.
    /// Needs an operator or a retried provisioning call.
    AssignedUninitialized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub company_name: String,
    pub admin_first_name: String,
    pub admin_last_name: String,
    pub admin_email: String,
    /// Argon2id hash captured at registration; copied into the tenant store.
    pub admin_password_hash: String,
    pub payment_status: PaymentStatus,
    pub provisioning_status: ProvisioningStatus,
    /// Pool entry currently linked to this customer.
    pub store_id: Option<Uuid>,
    pub admin_user_id: Option<Uuid>,
    pub admin_role_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            company_name: self.company_name.clone(),
            payment_status: self.payment_status,
            provisioning_status: self.provisioning_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomer {
    pub company_name: String,
    pub admin_first_name: String,
    pub admin_last_name: String,
    pub admin_email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub admin_password: String,
}

/// Customer details exposed on an administrator's session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub company_name: String,
    pub payment_status: PaymentStatus,
    pub provisioning_status: ProvisioningStatus,
}
