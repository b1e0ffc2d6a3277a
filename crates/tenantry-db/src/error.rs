//! Database-specific error types and conversions.

use tenantry_core::error::TenantryError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique index violated: {0}")]
    UniqueViolation(String),

    #[error("Transaction conflict: {0}")]
    Conflict(String),
}

impl DbError {
    /// Classify a failed query or statement by its message.
    ///
    /// SurrealDB reports index violations and optimistic transaction
    /// conflicts as plain errors; callers need to tell them apart. A
    /// statement cancelled because its transaction failed counts as a
    /// conflict.
    pub fn classify(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("already contains") {
            DbError::UniqueViolation(message)
        } else if lower.contains("conflict")
            || lower.contains("can be retried")
            || lower.contains("failed transaction")
        {
            DbError::Conflict(message)
        } else {
            DbError::Query(message)
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation(_))
    }
}

impl From<DbError> for TenantryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TenantryError::NotFound { entity, id },
            DbError::UniqueViolation(detail) => TenantryError::AlreadyExists {
                entity: violated_index(&detail).to_string(),
            },
            other => TenantryError::Database(other.to_string()),
        }
    }
}

/// Name of the index in a SurrealDB violation message such as
/// "Database index `idx_x` already contains ...". The rest of the message
/// carries stored values and stays out of the taxonomy.
fn violated_index(detail: &str) -> &str {
    detail
        .split('`')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or("record")
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(value).map_err(|e| DbError::Query(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(field: &str, value: Option<&str>) -> Result<Option<uuid::Uuid>, DbError> {
    value.map(|v| parse_uuid(field, v)).transpose()
}
