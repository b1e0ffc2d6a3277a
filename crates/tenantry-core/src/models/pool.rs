//! Tenant pool domain model.
//!
//! Pool entries are pre-provisioned, schema-identical stores. An entry
//! is either available or claimed by exactly one customer; the two
//! states are mutually exclusive.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit location of a tenant store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StoreAddress {
    pub namespace: String,
    pub database: String,
}

impl StoreAddress {
    pub fn new(namespace: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.database)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEntry {
    pub id: Uuid,
    /// Allocation order; the free entry with the lowest slot is claimed first.
    pub slot: u32,
    pub address: StoreAddress,
    pub available: bool,
    pub claimant: Option<Uuid>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PoolEntry {
    /// Checks the availability/claimant exclusivity invariant.
    pub fn is_consistent(&self) -> bool {
        self.available != self.claimant.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePoolEntry {
    pub slot: u32,
    pub address: StoreAddress,
}
