//! Registry-side transactions of the provisioning saga.
//!
//! Settling the ledger, marking the customer assigned and claiming a
//! pool entry commit together or not at all. Compensation and activation
//! are single transactions too, and both are guarded on the customer
//! still being `Assigned` to the claimed entry. Two concurrent calls for
//! one customer write the same customer record, so whichever of the two
//! commits second re-reads that guard and becomes a no-op.

use surrealdb::{Connection, Surreal};
use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::customer::{Customer, ProvisioningStatus};
use tenantry_core::models::directory::{RegisterDirectoryEntry, normalize_email};
use tenantry_core::models::payment::PaymentSettlement;
use tenantry_core::models::pool::PoolEntry;
use tenantry_core::repository::ProvisioningRepository;
use tracing::{debug, info};
use uuid::Uuid;

use super::customer::load_customer;
use super::directory::user_type_to_string;
use super::pool::{DEFAULT_CLAIM_ATTEMPTS, RELEASE_ENTRY, held_by, retry_on_conflict};
use crate::error::DbError;

const SETTLE_AND_CLAIM: &str = "\
BEGIN TRANSACTION;
LET $customer = (SELECT * FROM type::record('customer', $customer_id))[0];
LET $payment = (SELECT * FROM payment \
    WHERE order_ref = $order_ref AND customer_id = $customer_id)[0];
LET $held = (SELECT * FROM pool_entry WHERE claimant = $customer_id LIMIT 1)[0];
LET $free = (SELECT * FROM pool_entry WHERE available = true \
    ORDER BY slot ASC LIMIT 1)[0];
LET $target = $held ?? $free;
IF $customer != NONE AND $payment != NONE AND $payment.status != 'Failed' \
    AND $customer.store_id = NONE AND $target != NONE {
    UPDATE $target.id SET available = false, claimant = $customer_id, \
        claimed_at = time::now();
    UPDATE $payment.id SET status = 'Completed', payer_id = $payer_id, \
        payer_email = $payer_email, transaction_ref = $transaction_ref, \
        settled_at = time::now() WHERE status = 'Pending';
    UPDATE $customer.id SET payment_status = 'Completed', \
        provisioning_status = 'Assigned', store_id = meta::id($target.id), \
        updated_at = time::now();
};
COMMIT TRANSACTION;
";

const ACTIVATE: &str = "\
BEGIN TRANSACTION;
LET $customer = (SELECT * FROM type::record('customer', $customer_id))[0];
IF $customer != NONE \
    AND $customer.provisioning_status IN ['Assigned', 'Active'] \
    AND $customer.store_id = $store_id {
    IF (SELECT * FROM directory WHERE email = $email LIMIT 1)[0] = NONE {
        CREATE type::record('directory', $directory_id) SET email = $email, \
            store_id = $store_id, user_type = $user_type, user_id = $user_id, \
            active = true;
    };
    UPDATE $customer.id SET provisioning_status = 'Active', \
        admin_user_id = $user_id, admin_role_id = $role_id, \
        updated_at = time::now();
};
COMMIT TRANSACTION;
";

/// SurrealDB implementation of the saga's registry transactions.
#[derive(Clone)]
pub struct SurrealProvisioningRepository<C: Connection> {
    db: Surreal<C>,
    claim_attempts: u32,
}

impl<C: Connection> SurrealProvisioningRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            claim_attempts: DEFAULT_CLAIM_ATTEMPTS,
        }
    }

    pub fn with_claim_attempts(db: Surreal<C>, claim_attempts: u32) -> Self {
        Self { db, claim_attempts }
    }

    async fn try_settle_and_claim(
        &self,
        customer_id: Uuid,
        settlement: &PaymentSettlement,
    ) -> Result<(), DbError> {
        self.db
            .query(SETTLE_AND_CLAIM)
            .bind(("customer_id", customer_id.to_string()))
            .bind(("order_ref", settlement.order_ref.clone()))
            .bind(("payer_id", settlement.payer_id.clone()))
            .bind(("payer_email", settlement.payer_email.clone()))
            .bind(("transaction_ref", settlement.transaction_ref.clone()))
            .await
            .map_err(DbError::classify)?
            .check()
            .map_err(DbError::classify)?;
        Ok(())
    }

    async fn try_compensate(&self, customer_id: Uuid, entry_id: Uuid) -> Result<(), DbError> {
        let sql = format!(
            "BEGIN TRANSACTION; \
             LET $customer = (SELECT * FROM type::record('customer', $customer_id))[0]; \
             IF $customer != NONE AND $customer.provisioning_status = 'Assigned' \
                 AND $customer.store_id = $entry_id {{ \
                 {RELEASE_ENTRY} WHERE claimant = $customer_id; \
                 UPDATE $customer.id SET \
                     provisioning_status = 'AssignedUninitialized', \
                     store_id = NONE, updated_at = time::now(); \
             }}; \
             COMMIT TRANSACTION;"
        );
        self.db
            .query(sql)
            .bind(("entry_id", entry_id.to_string()))
            .bind(("customer_id", customer_id.to_string()))
            .await
            .map_err(DbError::classify)?
            .check()
            .map_err(DbError::classify)?;
        Ok(())
    }

    async fn try_activate(
        &self,
        customer_id: Uuid,
        admin: &RegisterDirectoryEntry,
        email: &str,
        role_id: Uuid,
    ) -> Result<(), DbError> {
        self.db
            .query(ACTIVATE)
            .bind(("customer_id", customer_id.to_string()))
            .bind(("store_id", admin.store_id.to_string()))
            .bind(("directory_id", Uuid::new_v4().to_string()))
            .bind(("email", email.to_string()))
            .bind(("user_type", user_type_to_string(admin.user_type)))
            .bind(("user_id", admin.user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::classify)?
            .check()
            .map_err(DbError::classify)?;
        Ok(())
    }
}

impl<C: Connection> ProvisioningRepository for SurrealProvisioningRepository<C> {
    async fn settle_and_claim(
        &self,
        customer_id: Uuid,
        settlement: PaymentSettlement,
    ) -> TenantryResult<Option<PoolEntry>> {
        debug!(
            customer_id = %customer_id,
            order_ref = %settlement.order_ref,
            "Settling ledger and claiming pool entry"
        );
        retry_on_conflict(self.claim_attempts, || {
            self.try_settle_and_claim(customer_id, &settlement)
        })
        .await?;

        let entry = held_by(&self.db, customer_id).await?;
        if let Some(e) = &entry {
            info!(
                customer_id = %customer_id,
                entry_id = %e.id,
                slot = e.slot,
                store = %e.address,
                "Registry transaction committed"
            );
        }
        Ok(entry)
    }

    async fn compensate_failed_initialization(
        &self,
        customer_id: Uuid,
        entry_id: Uuid,
    ) -> TenantryResult<Customer> {
        retry_on_conflict(self.claim_attempts, || {
            self.try_compensate(customer_id, entry_id)
        })
        .await?;

        let customer = load_customer(&self.db, customer_id).await?;
        if customer.provisioning_status == ProvisioningStatus::AssignedUninitialized {
            info!(
                customer_id = %customer_id,
                entry_id = %entry_id,
                "Pool entry released, customer marked assigned-but-uninitialized"
            );
        } else {
            debug!(
                customer_id = %customer_id,
                entry_id = %entry_id,
                status = ?customer.provisioning_status,
                "Customer no longer assigned to entry, nothing released"
            );
        }
        Ok(customer)
    }

    async fn activate(
        &self,
        customer_id: Uuid,
        admin: RegisterDirectoryEntry,
        role_id: Uuid,
    ) -> TenantryResult<Customer> {
        let email = normalize_email(&admin.email);
        if email.is_empty() {
            return Err(TenantryError::Validation {
                message: "directory email must not be empty".into(),
            });
        }

        retry_on_conflict(self.claim_attempts, || {
            self.try_activate(customer_id, &admin, &email, role_id)
        })
        .await?;

        let customer = load_customer(&self.db, customer_id).await?;
        if customer.provisioning_status == ProvisioningStatus::Active {
            info!(
                customer_id = %customer_id,
                email = %email,
                store_id = %admin.store_id,
                "Administrator registered, customer active"
            );
        }
        Ok(customer)
    }
}
