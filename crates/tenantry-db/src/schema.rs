//! Schema definitions and migration runner for SurrealDB.
//!
//! Two independent schema sets exist: one for the central registry and
//! one applied to every pre-provisioned tenant store. Each database
//! tracks its own applied versions in a `_migration` table.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings. Enums are stored as strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static REGISTRY_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "registry_initial",
    sql: REGISTRY_V1,
}];

static STORE_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "store_initial",
    sql: STORE_V1,
}];

// -----------------------------------------------------------------------
// Registry v1
// -----------------------------------------------------------------------

const REGISTRY_V1: &str = "\
-- =======================================================================
-- Customers
-- =======================================================================
DEFINE TABLE customer SCHEMAFULL;
DEFINE FIELD company_name ON TABLE customer TYPE string;
DEFINE FIELD admin_first_name ON TABLE customer TYPE string;
DEFINE FIELD admin_last_name ON TABLE customer TYPE string;
DEFINE FIELD admin_email ON TABLE customer TYPE string;
DEFINE FIELD admin_password_hash ON TABLE customer TYPE string;
DEFINE FIELD payment_status ON TABLE customer TYPE string \
    ASSERT $value IN ['Pending', 'Completed', 'Failed'];
DEFINE FIELD provisioning_status ON TABLE customer TYPE string \
    ASSERT $value IN ['Unassigned', 'Assigned', 'Active', \
    'AssignedUninitialized'];
DEFINE FIELD store_id ON TABLE customer TYPE option<string>;
DEFINE FIELD admin_user_id ON TABLE customer TYPE option<string>;
DEFINE FIELD admin_role_id ON TABLE customer TYPE option<string>;
DEFINE FIELD created_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_customer_admin_email ON TABLE customer \
    COLUMNS admin_email UNIQUE;

-- =======================================================================
-- Payment ledger
-- =======================================================================
DEFINE TABLE payment SCHEMAFULL;
DEFINE FIELD customer_id ON TABLE payment TYPE string;
DEFINE FIELD order_ref ON TABLE payment TYPE string;
DEFINE FIELD amount_minor ON TABLE payment TYPE int;
DEFINE FIELD currency ON TABLE payment TYPE string;
DEFINE FIELD status ON TABLE payment TYPE string \
    ASSERT $value IN ['Pending', 'Completed', 'Failed'];
DEFINE FIELD payer_id ON TABLE payment TYPE option<string>;
DEFINE FIELD payer_email ON TABLE payment TYPE option<string>;
DEFINE FIELD transaction_ref ON TABLE payment TYPE option<string>;
DEFINE FIELD settled_at ON TABLE payment TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE payment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_payment_order_ref ON TABLE payment \
    COLUMNS order_ref UNIQUE;
DEFINE INDEX idx_payment_customer ON TABLE payment \
    COLUMNS customer_id;

-- =======================================================================
-- Tenant pool
-- =======================================================================
DEFINE TABLE pool_entry SCHEMAFULL;
DEFINE FIELD slot ON TABLE pool_entry TYPE int;
DEFINE FIELD namespace ON TABLE pool_entry TYPE string;
DEFINE FIELD database ON TABLE pool_entry TYPE string;
DEFINE FIELD available ON TABLE pool_entry TYPE bool DEFAULT true;
DEFINE FIELD claimant ON TABLE pool_entry TYPE option<string>;
DEFINE FIELD claimed_at ON TABLE pool_entry TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE pool_entry TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_pool_slot ON TABLE pool_entry COLUMNS slot UNIQUE;
DEFINE INDEX idx_pool_address ON TABLE pool_entry \
    COLUMNS namespace, database UNIQUE;
DEFINE INDEX idx_pool_available ON TABLE pool_entry COLUMNS available;
DEFINE INDEX idx_pool_claimant ON TABLE pool_entry COLUMNS claimant;

-- =======================================================================
-- Login directory (email is unique across every store)
-- =======================================================================
DEFINE TABLE directory SCHEMAFULL;
DEFINE FIELD email ON TABLE directory TYPE string;
DEFINE FIELD store_id ON TABLE directory TYPE string;
DEFINE FIELD user_type ON TABLE directory TYPE string \
    ASSERT $value IN ['Administrator', 'Member'];
DEFINE FIELD user_id ON TABLE directory TYPE string;
DEFINE FIELD active ON TABLE directory TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE directory TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_directory_email ON TABLE directory \
    COLUMNS email UNIQUE;

-- =======================================================================
-- Reconciliation queue
-- =======================================================================
DEFINE TABLE reconciliation SCHEMAFULL;
DEFINE FIELD customer_id ON TABLE reconciliation TYPE string;
DEFINE FIELD reason ON TABLE reconciliation TYPE string \
    ASSERT $value IN ['PoolExhausted', 'InitializationFailed'];
DEFINE FIELD order_ref ON TABLE reconciliation TYPE string;
DEFINE FIELD payer_id ON TABLE reconciliation TYPE string;
DEFINE FIELD payer_email ON TABLE reconciliation TYPE string;
DEFINE FIELD transaction_ref ON TABLE reconciliation TYPE string;
DEFINE FIELD detail ON TABLE reconciliation TYPE string;
DEFINE FIELD resolved ON TABLE reconciliation TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE reconciliation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD resolved_at ON TABLE reconciliation TYPE option<datetime>;
DEFINE INDEX idx_reconciliation_open ON TABLE reconciliation \
    COLUMNS resolved, created_at;
";

// -----------------------------------------------------------------------
// Tenant store v1
// -----------------------------------------------------------------------

const STORE_V1: &str = "\
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD rank ON TABLE role TYPE int;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE record<role>;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

async fn apply<C: Connection>(db: &Surreal<C>, migrations: &[Migration]) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Run all pending registry migrations against the given client.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    apply(db, REGISTRY_MIGRATIONS).await
}

/// Apply the fixed tenant-store schema. Safe to re-run.
pub async fn run_store_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    apply(db, STORE_MIGRATIONS).await
}

/// Raw registry DDL for version 1.
pub fn registry_schema() -> &'static str {
    REGISTRY_V1
}

/// Raw tenant-store DDL for version 1.
pub fn store_schema() -> &'static str {
    STORE_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_are_nonempty() {
        assert!(!REGISTRY_V1.is_empty());
        assert!(!STORE_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for set in [REGISTRY_MIGRATIONS, STORE_MIGRATIONS] {
            for window in set.windows(2) {
                assert!(
                    window[0].version < window[1].version,
                    "Migrations must be in ascending version order"
                );
            }
        }
    }

    #[test]
    fn directory_email_is_unique() {
        assert!(REGISTRY_V1.contains("idx_directory_email ON TABLE directory COLUMNS email UNIQUE"));
    }
}
