//! SurrealDB implementation of [`DirectoryRepository`].
//!
//! The unique index on `email` is the only guard against ambiguous
//! routing; a duplicate insert is reported as
//! [`TenantryError::DirectoryConflict`] and never retried here.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::directory::{
    DirectoryEntry, RegisterDirectoryEntry, UserType, normalize_email,
};
use tenantry_core::repository::DirectoryRepository;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct DirectoryRow {
    record_id: String,
    email: String,
    store_id: String,
    user_type: String,
    user_id: String,
    active: bool,
    created_at: DateTime<Utc>,
}

const SELECT_DIRECTORY: &str = "SELECT meta::id(id) AS record_id, email, store_id, \
     user_type, user_id, active, created_at FROM directory";

fn parse_user_type(s: &str) -> Result<UserType, DbError> {
    match s {
        "Administrator" => Ok(UserType::Administrator),
        "Member" => Ok(UserType::Member),
        other => Err(DbError::Query(format!("unknown user type: {other}"))),
    }
}

pub(crate) fn user_type_to_string(t: UserType) -> &'static str {
    match t {
        UserType::Administrator => "Administrator",
        UserType::Member => "Member",
    }
}

impl DirectoryRow {
    fn try_into_entry(self) -> Result<DirectoryEntry, DbError> {
        Ok(DirectoryEntry {
            id: parse_uuid("directory", &self.record_id)?,
            email: self.email,
            store_id: parse_uuid("store", &self.store_id)?,
            user_type: parse_user_type(&self.user_type)?,
            user_id: parse_uuid("user", &self.user_id)?,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the login directory.
#[derive(Clone)]
pub struct SurrealDirectoryRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDirectoryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DirectoryRepository for SurrealDirectoryRepository<C> {
    async fn register(&self, input: RegisterDirectoryEntry) -> TenantryResult<DirectoryEntry> {
        let email = normalize_email(&input.email);
        if email.is_empty() {
            return Err(TenantryError::Validation {
                message: "directory email must not be empty".into(),
            });
        }

        let id = Uuid::new_v4();
        let outcome = self
            .db
            .query(
                "CREATE type::record('directory', $id) SET \
                 email = $email, store_id = $store_id, \
                 user_type = $user_type, user_id = $user_id, \
                 active = true",
            )
            .bind(("id", id.to_string()))
            .bind(("email", email.clone()))
            .bind(("store_id", input.store_id.to_string()))
            .bind(("user_type", user_type_to_string(input.user_type)))
            .bind(("user_id", input.user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify);

        match outcome {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                return Err(TenantryError::DirectoryConflict { email });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            email = %email,
            store_id = %input.store_id,
            user_id = %input.user_id,
            "Directory entry registered"
        );
        self.get_by_email(&email).await
    }

    async fn get_by_email(&self, email: &str) -> TenantryResult<DirectoryEntry> {
        let email = normalize_email(email);
        let mut result = self
            .db
            .query(format!("{SELECT_DIRECTORY} WHERE email = $email LIMIT 1"))
            .bind(("email", email.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DirectoryRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "directory".into(),
            id: email,
        })?;
        Ok(row.try_into_entry()?)
    }

    async fn set_active(&self, email: &str, active: bool) -> TenantryResult<DirectoryEntry> {
        let email = normalize_email(email);
        self.db
            .query("UPDATE directory SET active = $active WHERE email = $email")
            .bind(("email", email.clone()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        info!(email = %email, active, "Directory entry activation changed");
        self.get_by_email(&email).await
    }
}
