//! Seeds a freshly claimed tenant store.
//!
//! Knows nothing about the registry or the pool: it works on one store
//! handle and the customer's profile. Re-running it against a store that
//! already holds the administrator is a no-op that returns the existing
//! identifiers.

use tenantry_core::error::TenantryResult;
use tenantry_core::models::provisioning::{CustomerProfile, InitializedStore};
use tenantry_core::models::tenant::{NewTenantRole, NewTenantUser, ROLE_CATALOG, top_role};
use tenantry_core::repository::TenantStore;
use tracing::{info, warn};
use uuid::Uuid;

/// Lower-cased first initial plus surname, keeping only alphanumerics.
///
/// Falls back to `admin` when nothing usable remains.
pub fn derive_username(first_name: &str, last_name: &str) -> String {
    let initial = first_name.chars().find(|c| c.is_alphanumeric());
    let username: String = initial
        .into_iter()
        .chain(last_name.chars())
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    if username.is_empty() {
        "admin".to_string()
    } else {
        username
    }
}

/// Seed the role catalog and the first administrator into `store`.
///
/// Both writes happen in one store-local transaction, so a failure
/// leaves no partial state. If the administrator's email is already
/// present, nothing is written and the existing user is returned with
/// `created = false`.
pub async fn initialize_store<S: TenantStore>(
    store: &S,
    profile: &CustomerProfile,
) -> TenantryResult<InitializedStore> {
    if let Some(existing) = store.find_user_by_email(&profile.admin_email).await? {
        info!(
            user_id = %existing.id,
            role = %existing.role_name,
            "Store already initialized, reusing administrator"
        );
        return Ok(InitializedStore {
            user_id: existing.id,
            role_id: existing.role_id,
            created: false,
        });
    }

    let roles: Vec<NewTenantRole> = ROLE_CATALOG.iter().map(NewTenantRole::from).collect();
    let admin = NewTenantUser {
        id: Uuid::new_v4(),
        username: derive_username(&profile.admin_first_name, &profile.admin_last_name),
        email: profile.admin_email.clone(),
        first_name: profile.admin_first_name.clone(),
        last_name: profile.admin_last_name.clone(),
        password_hash: profile.admin_password_hash.clone(),
        role_id: top_role().id(),
    };

    match store.seed(roles, admin).await {
        Ok(user) => {
            info!(
                user_id = %user.id,
                username = %user.username,
                role = %user.role_name,
                "Store initialized"
            );
            Ok(InitializedStore {
                user_id: user.id,
                role_id: user.role_id,
                created: true,
            })
        }
        Err(seed_err) => {
            // A concurrent initializer may have won the race.
            match store.find_user_by_email(&profile.admin_email).await {
                Ok(Some(existing)) => {
                    warn!(
                        user_id = %existing.id,
                        error = %seed_err,
                        "Seed lost a race, reusing administrator"
                    );
                    Ok(InitializedStore {
                        user_id: existing.id,
                        role_id: existing.role_id,
                        created: false,
                    })
                }
                _ => Err(seed_err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_initial_plus_surname() {
        assert_eq!(derive_username("Ada", "Lovelace"), "alovelace");
    }

    #[test]
    fn username_strips_punctuation_and_spaces() {
        assert_eq!(derive_username("Mary-Jane", "O'Neil Smith"), "moneilsmith");
        assert_eq!(derive_username("  grace", "Hopper"), "ghopper");
    }

    #[test]
    fn username_keeps_non_ascii_letters() {
        assert_eq!(derive_username("Émile", "Zola"), "ézola");
    }

    #[test]
    fn empty_username_falls_back() {
        assert_eq!(derive_username("", "--"), "admin");
    }
}
