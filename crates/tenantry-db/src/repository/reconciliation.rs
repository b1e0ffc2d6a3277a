//! SurrealDB implementation of [`ReconciliationRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantry_core::error::TenantryResult;
use tenantry_core::models::reconciliation::{
    CreateReconciliationItem, ReconciliationItem, ReconciliationReason,
};
use tenantry_core::repository::ReconciliationRepository;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct ReconciliationRow {
    record_id: String,
    customer_id: String,
    reason: String,
    order_ref: String,
    payer_id: String,
    payer_email: String,
    transaction_ref: String,
    detail: String,
    resolved: bool,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

const SELECT_ITEM: &str = "SELECT meta::id(id) AS record_id, customer_id, reason, \
     order_ref, payer_id, payer_email, transaction_ref, detail, resolved, \
     created_at, resolved_at FROM reconciliation";

fn parse_reason(s: &str) -> Result<ReconciliationReason, DbError> {
    match s {
        "PoolExhausted" => Ok(ReconciliationReason::PoolExhausted),
        "InitializationFailed" => Ok(ReconciliationReason::InitializationFailed),
        other => Err(DbError::Query(format!("unknown reconciliation reason: {other}"))),
    }
}

fn reason_to_string(r: ReconciliationReason) -> &'static str {
    match r {
        ReconciliationReason::PoolExhausted => "PoolExhausted",
        ReconciliationReason::InitializationFailed => "InitializationFailed",
    }
}

impl ReconciliationRow {
    fn try_into_item(self) -> Result<ReconciliationItem, DbError> {
        Ok(ReconciliationItem {
            id: parse_uuid("reconciliation", &self.record_id)?,
            customer_id: parse_uuid("customer", &self.customer_id)?,
            reason: parse_reason(&self.reason)?,
            order_ref: self.order_ref,
            payer_id: self.payer_id,
            payer_email: self.payer_email,
            transaction_ref: self.transaction_ref,
            detail: self.detail,
            resolved: self.resolved,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

/// SurrealDB implementation of the manual reconciliation queue.
#[derive(Clone)]
pub struct SurrealReconciliationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReconciliationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ReconciliationRepository for SurrealReconciliationRepository<C> {
    async fn enqueue(&self, input: CreateReconciliationItem) -> TenantryResult<ReconciliationItem> {
        let id = Uuid::new_v4();
        self.db
            .query(
                "CREATE type::record('reconciliation', $id) SET \
                 customer_id = $customer_id, reason = $reason, \
                 order_ref = $order_ref, payer_id = $payer_id, \
                 payer_email = $payer_email, transaction_ref = $transaction_ref, \
                 detail = $detail, resolved = false",
            )
            .bind(("id", id.to_string()))
            .bind(("customer_id", input.customer_id.to_string()))
            .bind(("reason", reason_to_string(input.reason)))
            .bind(("order_ref", input.order_ref))
            .bind(("payer_id", input.payer_id))
            .bind(("payer_email", input.payer_email))
            .bind(("transaction_ref", input.transaction_ref))
            .bind(("detail", input.detail))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> TenantryResult<ReconciliationItem> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_ITEM} WHERE id = type::record('reconciliation', $id)"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReconciliationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "reconciliation".into(),
            id: id.to_string(),
        })?;
        Ok(row.try_into_item()?)
    }

    async fn list_open(&self) -> TenantryResult<Vec<ReconciliationItem>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_ITEM} WHERE resolved = false ORDER BY created_at ASC"
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReconciliationRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ReconciliationRow::try_into_item)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn resolve(&self, id: Uuid) -> TenantryResult<ReconciliationItem> {
        // Check existence first so an unknown id is NotFound, not a silent no-op.
        self.get_by_id(id).await?;

        self.db
            .query(
                "UPDATE type::record('reconciliation', $id) SET \
                 resolved = true, resolved_at = time::now() \
                 WHERE resolved = false",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        info!(item_id = %id, "Reconciliation item resolved");
        self.get_by_id(id).await
    }
}
