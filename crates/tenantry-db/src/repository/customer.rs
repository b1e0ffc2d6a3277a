//! SurrealDB implementation of [`CustomerRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantry_core::error::TenantryResult;
use tenantry_core::models::customer::{
    CreateCustomer, Customer, PaymentStatus, ProvisioningStatus,
};
use tenantry_core::models::directory::normalize_email;
use tenantry_core::repository::CustomerRepository;
use uuid::Uuid;

use crate::error::{DbError, parse_opt_uuid};
use crate::password::hash_password;

#[derive(Debug, SurrealValue)]
struct CustomerRow {
    company_name: String,
    admin_first_name: String,
    admin_last_name: String,
    admin_email: String,
    admin_password_hash: String,
    payment_status: String,
    provisioning_status: String,
    store_id: Option<String>,
    admin_user_id: Option<String>,
    admin_role_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub(crate) fn parse_payment_status(s: &str) -> Result<PaymentStatus, DbError> {
    match s {
        "Pending" => Ok(PaymentStatus::Pending),
        "Completed" => Ok(PaymentStatus::Completed),
        "Failed" => Ok(PaymentStatus::Failed),
        other => Err(DbError::Query(format!("unknown payment status: {other}"))),
    }
}

fn parse_provisioning_status(s: &str) -> Result<ProvisioningStatus, DbError> {
    match s {
        "Unassigned" => Ok(ProvisioningStatus::Unassigned),
        "Assigned" => Ok(ProvisioningStatus::Assigned),
        "Active" => Ok(ProvisioningStatus::Active),
        "AssignedUninitialized" => Ok(ProvisioningStatus::AssignedUninitialized),
        other => Err(DbError::Query(format!(
            "unknown provisioning status: {other}"
        ))),
    }
}

fn first_customer(id: Uuid, rows: Vec<CustomerRow>) -> TenantryResult<Customer> {
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "customer".into(),
        id: id.to_string(),
    })?;
    Ok(row.into_customer(id)?)
}

/// Current state of one customer. Shared with the saga's registry
/// transactions, which re-read the customer after commit.
pub(crate) async fn load_customer<C: Connection>(
    db: &Surreal<C>,
    id: Uuid,
) -> TenantryResult<Customer> {
    let mut result = db
        .query("SELECT * FROM type::record('customer', $id)")
        .bind(("id", id.to_string()))
        .await
        .map_err(DbError::from)?;

    let rows: Vec<CustomerRow> = result.take(0).map_err(DbError::from)?;
    first_customer(id, rows)
}

impl CustomerRow {
    fn into_customer(self, id: Uuid) -> Result<Customer, DbError> {
        Ok(Customer {
            id,
            company_name: self.company_name,
            admin_first_name: self.admin_first_name,
            admin_last_name: self.admin_last_name,
            admin_email: self.admin_email,
            admin_password_hash: self.admin_password_hash,
            payment_status: parse_payment_status(&self.payment_status)?,
            provisioning_status: parse_provisioning_status(&self.provisioning_status)?,
            store_id: parse_opt_uuid("store", self.store_id.as_deref())?,
            admin_user_id: parse_opt_uuid("admin user", self.admin_user_id.as_deref())?,
            admin_role_id: parse_opt_uuid("admin role", self.admin_role_id.as_deref())?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Customer repository.
#[derive(Clone)]
pub struct SurrealCustomerRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealCustomerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }
}

impl<C: Connection> CustomerRepository for SurrealCustomerRepository<C> {
    async fn create(&self, input: CreateCustomer) -> TenantryResult<Customer> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.admin_password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(
                "CREATE type::record('customer', $id) SET \
                 company_name = $company_name, \
                 admin_first_name = $first_name, \
                 admin_last_name = $last_name, \
                 admin_email = $email, \
                 admin_password_hash = $password_hash, \
                 payment_status = 'Pending', \
                 provisioning_status = 'Unassigned'",
            )
            .bind(("id", id.to_string()))
            .bind(("company_name", input.company_name))
            .bind(("first_name", input.admin_first_name))
            .bind(("last_name", input.admin_last_name))
            .bind(("email", normalize_email(&input.admin_email)))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::classify)?;
        let rows: Vec<CustomerRow> = result.take(0).map_err(DbError::from)?;
        first_customer(id, rows)
    }

    async fn get_by_id(&self, id: Uuid) -> TenantryResult<Customer> {
        load_customer(&self.db, id).await
    }

    async fn mark_payment_failed(&self, id: Uuid) -> TenantryResult<Customer> {
        self.db
            .query(
                "UPDATE type::record('customer', $id) SET \
                 payment_status = 'Failed', updated_at = time::now() \
                 WHERE payment_status = 'Pending'",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        self.get_by_id(id).await
    }
}
