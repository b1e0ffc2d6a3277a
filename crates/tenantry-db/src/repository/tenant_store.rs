//! SurrealDB implementation of [`TenantStore`].
//!
//! A handle is bound to exactly one tenant store (its own namespace and
//! database) and never touches the registry. Users carry a record link
//! to their role so a single query yields both.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantry_core::error::TenantryResult;
use tenantry_core::models::directory::normalize_email;
use tenantry_core::models::tenant::{
    NewTenantRole, NewTenantUser, TenantRole, TenantUser, UserStatus,
};
use tenantry_core::repository::TenantStore;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role_id: String,
    role_name: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    name: String,
    description: String,
    rank: u32,
    created_at: DateTime<Utc>,
}

const SELECT_USER: &str = "SELECT meta::id(id) AS record_id, username, email, \
     first_name, last_name, password_hash, meta::id(role) AS role_id, \
     role.name AS role_name, status, last_login_at, created_at FROM user";

const SEED: &str = "\
BEGIN TRANSACTION;
FOR $r IN $roles {
    UPSERT type::record('role', $r.id) SET name = $r.name, \
        description = $r.description, rank = $r.rank;
};
CREATE type::record('user', $user_id) SET username = $username, \
    email = $email, first_name = $first_name, last_name = $last_name, \
    password_hash = $password_hash, role = type::record('role', $role_id), \
    status = 'Active';
COMMIT TRANSACTION;
";

fn parse_status(s: &str) -> Result<UserStatus, DbError> {
    match s {
        "Active" => Ok(UserStatus::Active),
        "Inactive" => Ok(UserStatus::Inactive),
        other => Err(DbError::Query(format!("unknown user status: {other}"))),
    }
}

impl UserRow {
    fn try_into_user(self) -> Result<TenantUser, DbError> {
        Ok(TenantUser {
            id: parse_uuid("user", &self.record_id)?,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            role_id: parse_uuid("role", &self.role_id)?,
            role_name: self.role_name,
            status: parse_status(&self.status)?,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
        })
    }
}

impl RoleRow {
    fn try_into_role(self) -> Result<TenantRole, DbError> {
        Ok(TenantRole {
            id: parse_uuid("role", &self.record_id)?,
            name: self.name,
            description: self.description,
            rank: self.rank,
            created_at: self.created_at,
        })
    }
}

/// Handle to one tenant store.
#[derive(Clone)]
pub struct SurrealTenantStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }
}

impl<C: Connection> TenantStore for SurrealTenantStore<C> {
    async fn find_user_by_email(&self, email: &str) -> TenantryResult<Option<TenantUser>> {
        let mut result = self
            .db
            .query(format!("{SELECT_USER} WHERE email = $email LIMIT 1"))
            .bind(("email", normalize_email(email)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(UserRow::try_into_user)
            .transpose()?)
    }

    async fn get_user(&self, id: Uuid) -> TenantryResult<TenantUser> {
        let mut result = self
            .db
            .query(format!("{SELECT_USER} WHERE id = type::record('user', $id)"))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })?;
        Ok(row.try_into_user()?)
    }

    async fn list_roles(&self) -> TenantryResult<Vec<TenantRole>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, name, description, rank, created_at \
                 FROM role ORDER BY rank ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let roles = rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roles)
    }

    async fn seed(&self, roles: Vec<NewTenantRole>, user: NewTenantUser) -> TenantryResult<TenantUser> {
        let roles: Vec<serde_json::Value> = roles
            .into_iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id.to_string(),
                    "name": r.name,
                    "description": r.description,
                    "rank": r.rank,
                })
            })
            .collect();
        debug!(roles = roles.len(), user_id = %user.id, "Seeding tenant store");

        self.db
            .query(SEED)
            .bind(("roles", serde_json::Value::Array(roles)))
            .bind(("user_id", user.id.to_string()))
            .bind(("username", user.username))
            .bind(("email", normalize_email(&user.email)))
            .bind(("first_name", user.first_name))
            .bind(("last_name", user.last_name))
            .bind(("password_hash", user.password_hash))
            .bind(("role_id", user.role_id.to_string()))
            .await
            .map_err(DbError::classify)?
            .check()
            .map_err(DbError::classify)?;

        self.get_user(user.id).await
    }

    async fn record_login(&self, user_id: Uuid) -> TenantryResult<()> {
        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 last_login_at = time::now(), updated_at = time::now()",
            )
            .bind(("id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;
        Ok(())
    }

    async fn set_user_status(&self, user_id: Uuid, status: UserStatus) -> TenantryResult<TenantUser> {
        let status = match status {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        };
        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", user_id.to_string()))
            .bind(("status", status))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::classify)?;

        self.get_user(user_id).await
    }
}
