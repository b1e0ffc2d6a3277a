//! SurrealDB implementation of [`PoolRepository`].
//!
//! Claims run inside a registry transaction. Two claimers that pick the
//! same entry write the same record, so one of them fails at commit with
//! a transaction conflict; the loser re-reads availability on the next
//! attempt. Nothing about availability is cached in-process.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantry_core::error::TenantryResult;
use tenantry_core::models::pool::{CreatePoolEntry, PoolEntry, StoreAddress};
use tenantry_core::repository::PoolRepository;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, parse_opt_uuid, parse_uuid};

/// Attempts made before a conflicting claim gives up.
pub const DEFAULT_CLAIM_ATTEMPTS: u32 = 8;

#[derive(Debug, SurrealValue)]
pub(crate) struct PoolRow {
    record_id: String,
    slot: u32,
    namespace: String,
    database: String,
    available: bool,
    claimant: Option<String>,
    claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

pub(crate) const SELECT_POOL_ENTRY: &str = "SELECT meta::id(id) AS record_id, slot, \
     namespace, database, available, claimant, claimed_at, created_at FROM pool_entry";

/// Marks an entry free again. Shared with the saga's compensation.
pub(crate) const RELEASE_ENTRY: &str = "UPDATE type::record('pool_entry', $entry_id) SET \
     available = true, claimant = NONE, claimed_at = NONE";

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

impl PoolRow {
    pub(crate) fn try_into_entry(self) -> Result<PoolEntry, DbError> {
        Ok(PoolEntry {
            id: parse_uuid("pool entry", &self.record_id)?,
            slot: self.slot,
            address: StoreAddress::new(self.namespace, self.database),
            available: self.available,
            claimant: parse_opt_uuid("claimant", self.claimant.as_deref())?,
            claimed_at: self.claimed_at,
            created_at: self.created_at,
        })
    }
}

/// Run `op` until it succeeds or fails with something other than a
/// transaction conflict, at most `attempts` times.
pub(crate) async fn retry_on_conflict<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_conflict() && attempt < attempts => {
                debug!(attempt, error = %e, "Registry transaction conflict, retrying");
                tokio::time::sleep(Duration::from_millis(5 * u64::from(attempt))).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Entry currently held by `customer_id`, if any.
pub(crate) async fn held_by<C: Connection>(
    db: &Surreal<C>,
    customer_id: Uuid,
) -> Result<Option<PoolEntry>, DbError> {
    let mut result = db
        .query(format!("{SELECT_POOL_ENTRY} WHERE claimant = $customer_id LIMIT 1"))
        .bind(("customer_id", customer_id.to_string()))
        .await?;
    let rows: Vec<PoolRow> = result.take(0)?;
    rows.into_iter().next().map(PoolRow::try_into_entry).transpose()
}

/// SurrealDB implementation of the tenant pool.
#[derive(Clone)]
pub struct SurrealPoolRepository<C: Connection> {
    db: Surreal<C>,
    claim_attempts: u32,
}

impl<C: Connection> SurrealPoolRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            claim_attempts: DEFAULT_CLAIM_ATTEMPTS,
        }
    }

    pub fn with_claim_attempts(db: Surreal<C>, claim_attempts: u32) -> Self {
        Self { db, claim_attempts }
    }

    async fn try_claim(&self, customer_id: Uuid) -> Result<(), DbError> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $held = (SELECT * FROM pool_entry WHERE claimant = $customer_id LIMIT 1)[0]; \
                 LET $free = (SELECT * FROM pool_entry WHERE available = true \
                     ORDER BY slot ASC LIMIT 1)[0]; \
                 IF $held = NONE AND $free != NONE { \
                     UPDATE $free.id SET available = false, \
                         claimant = $customer_id, claimed_at = time::now(); \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("customer_id", customer_id.to_string()))
            .await
            .map_err(DbError::classify)?
            .check()
            .map_err(DbError::classify)?;
        Ok(())
    }
}

impl<C: Connection> PoolRepository for SurrealPoolRepository<C> {
    async fn create(&self, input: CreatePoolEntry) -> TenantryResult<PoolEntry> {
        let id = Uuid::new_v4();
        self.db
            .query(
                "CREATE type::record('pool_entry', $id) SET \
                 slot = $slot, namespace = $namespace, database = $database, \
                 available = true, claimant = NONE, claimed_at = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("slot", input.slot))
            .bind(("namespace", input.address.namespace.clone()))
            .bind(("database", input.address.database.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        info!(entry_id = %id, slot = input.slot, store = %input.address, "Pool entry added");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> TenantryResult<PoolEntry> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_POOL_ENTRY} WHERE id = type::record('pool_entry', $id)"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PoolRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pool_entry".into(),
            id: id.to_string(),
        })?;
        Ok(row.try_into_entry()?)
    }

    async fn list(&self) -> TenantryResult<Vec<PoolEntry>> {
        let mut result = self
            .db
            .query(format!("{SELECT_POOL_ENTRY} ORDER BY slot ASC"))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PoolRow> = result.take(0).map_err(DbError::from)?;
        let entries = rows
            .into_iter()
            .map(PoolRow::try_into_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn claim(&self, customer_id: Uuid) -> TenantryResult<Option<PoolEntry>> {
        retry_on_conflict(self.claim_attempts, || self.try_claim(customer_id)).await?;

        let entry = held_by(&self.db, customer_id).await?;
        match &entry {
            Some(e) => info!(
                customer_id = %customer_id,
                entry_id = %e.id,
                slot = e.slot,
                store = %e.address,
                "Pool entry claimed"
            ),
            None => warn!(customer_id = %customer_id, "Pool exhausted"),
        }
        Ok(entry)
    }

    async fn release(&self, id: Uuid) -> TenantryResult<()> {
        self.db
            .query(RELEASE_ENTRY)
            .bind(("entry_id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        info!(entry_id = %id, "Pool entry released");
        Ok(())
    }

    async fn count_available(&self) -> TenantryResult<u64> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM pool_entry WHERE available = true GROUP ALL")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
