//! SurrealDB implementation of [`PaymentRepository`].
//!
//! The ledger is append-then-settle: an entry is created `Pending` and
//! moves to a terminal state at most once. Every status update is
//! guarded with `WHERE status = 'Pending'`, so a replayed write leaves a
//! terminal entry untouched.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::payment::{CreatePayment, PaymentEntry};
use tenantry_core::repository::PaymentRepository;
use uuid::Uuid;

use super::customer::parse_payment_status;
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct PaymentRow {
    record_id: String,
    customer_id: String,
    order_ref: String,
    amount_minor: i64,
    currency: String,
    status: String,
    payer_id: Option<String>,
    payer_email: Option<String>,
    transaction_ref: Option<String>,
    settled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

const SELECT_PAYMENT: &str = "SELECT meta::id(id) AS record_id, customer_id, order_ref, \
     amount_minor, currency, status, payer_id, payer_email, transaction_ref, \
     settled_at, created_at FROM payment";

impl PaymentRow {
    fn try_into_entry(self) -> Result<PaymentEntry, DbError> {
        Ok(PaymentEntry {
            id: parse_uuid("payment", &self.record_id)?,
            customer_id: parse_uuid("customer", &self.customer_id)?,
            order_ref: self.order_ref,
            amount_minor: self.amount_minor,
            currency: self.currency,
            status: parse_payment_status(&self.status)?,
            payer_id: self.payer_id,
            payer_email: self.payer_email,
            transaction_ref: self.transaction_ref,
            settled_at: self.settled_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the payment ledger.
#[derive(Clone)]
pub struct SurrealPaymentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPaymentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PaymentRepository for SurrealPaymentRepository<C> {
    async fn create(&self, input: CreatePayment) -> TenantryResult<PaymentEntry> {
        if input.order_ref.trim().is_empty() {
            return Err(TenantryError::Validation {
                message: "order reference must not be empty".into(),
            });
        }

        let id = Uuid::new_v4();
        self.db
            .query(
                "CREATE type::record('payment', $id) SET \
                 customer_id = $customer_id, \
                 order_ref = $order_ref, \
                 amount_minor = $amount_minor, \
                 currency = $currency, \
                 status = 'Pending'",
            )
            .bind(("id", id.to_string()))
            .bind(("customer_id", input.customer_id.to_string()))
            .bind(("order_ref", input.order_ref.clone()))
            .bind(("amount_minor", input.amount_minor))
            .bind(("currency", input.currency))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        self.get_by_order_ref(&input.order_ref).await
    }

    async fn get_by_order_ref(&self, order_ref: &str) -> TenantryResult<PaymentEntry> {
        let mut result = self
            .db
            .query(format!("{SELECT_PAYMENT} WHERE order_ref = $order_ref"))
            .bind(("order_ref", order_ref.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PaymentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "payment".into(),
            id: order_ref.to_string(),
        })?;
        Ok(row.try_into_entry()?)
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> TenantryResult<Vec<PaymentEntry>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_PAYMENT} WHERE customer_id = $customer_id ORDER BY created_at ASC"
            ))
            .bind(("customer_id", customer_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PaymentRow> = result.take(0).map_err(DbError::from)?;
        let entries = rows
            .into_iter()
            .map(PaymentRow::try_into_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn mark_failed(&self, order_ref: &str) -> TenantryResult<PaymentEntry> {
        self.db
            .query(
                "UPDATE payment SET status = 'Failed', settled_at = time::now() \
                 WHERE order_ref = $order_ref AND status = 'Pending'",
            )
            .bind(("order_ref", order_ref.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        self.get_by_order_ref(order_ref).await
    }
}
