//! Login directory domain model.
//!
//! One row per routable login. Email is unique across every store, which
//! is what keeps routing unambiguous.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserType {
    /// The customer's legal representative (first privileged user).
    Administrator,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub email: String,
    /// Pool entry that holds the user's store.
    pub store_id: Uuid,
    pub user_type: UserType,
    /// User id inside that store.
    pub user_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDirectoryEntry {
    pub email: String,
    pub store_id: Uuid,
    pub user_type: UserType,
    pub user_id: Uuid,
}

/// Canonical form used for every directory read and write.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ada.Lovelace@Example.COM "), "ada.lovelace@example.com");
    }
}
