//! Tenant-store domain models.
//!
//! Roles and users live only inside an allocated store. The registry
//! never duplicates them; it points at a user through the directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One role of the fixed catalog seeded into every new store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDefinition {
    pub key: &'static str,
    pub description: &'static str,
    /// 0 is the top-privilege role; larger numbers are less privileged.
    pub rank: u32,
}

impl RoleDefinition {
    /// Deterministic role id, identical in every store.
    pub fn id(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("tenantry.role.{}", self.key).as_bytes())
    }
}

pub const ROLE_CATALOG: &[RoleDefinition] = &[
    RoleDefinition {
        key: "owner",
        description: "Legal representative with full control of the account",
        rank: 0,
    },
    RoleDefinition {
        key: "admin",
        description: "Manages users, settings and billing",
        rank: 1,
    },
    RoleDefinition {
        key: "manager",
        description: "Manages teams and hiring pipelines",
        rank: 2,
    },
    RoleDefinition {
        key: "recruiter",
        description: "Works candidates through open positions",
        rank: 3,
    },
    RoleDefinition {
        key: "employee",
        description: "Self-service access",
        rank: 4,
    },
];

/// The top-privilege role of the catalog.
pub fn top_role() -> &'static RoleDefinition {
    ROLE_CATALOG
        .iter()
        .min_by_key(|r| r.rank)
        .unwrap_or(&ROLE_CATALOG[0])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRole {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub rank: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenantRole {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub rank: u32,
}

impl From<&RoleDefinition> for NewTenantRole {
    fn from(def: &RoleDefinition) -> Self {
        Self {
            id: def.id(),
            name: def.key.to_string(),
            description: def.description.to_string(),
            rank: def.rank,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenantUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Already hashed; the store never sees a raw password.
    pub password_hash: String,
    pub role_id: Uuid,
}
