//! Integration tests for a single tenant store using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tenantry_core::models::pool::StoreAddress;
use tenantry_core::models::tenant::{
    NewTenantRole, NewTenantUser, ROLE_CATALOG, UserStatus, top_role,
};
use tenantry_core::repository::{TenantStore, TenantStoreConnector};
use tenantry_db::HandleStoreConnector;
use tenantry_db::repository::SurrealTenantStore;
use uuid::Uuid;

async fn open_store() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("pool").use_db("tenant_001").await.unwrap();
    tenantry_db::run_store_migrations(&db).await.unwrap();
    db
}

fn catalog() -> Vec<NewTenantRole> {
    ROLE_CATALOG.iter().map(NewTenantRole::from).collect()
}

fn owner(email: &str) -> NewTenantUser {
    NewTenantUser {
        id: Uuid::new_v4(),
        username: "alovelace".into(),
        email: email.into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
        role_id: top_role().id(),
    }
}

#[tokio::test]
async fn seed_writes_catalog_and_owner() {
    let store = SurrealTenantStore::new(open_store().await);

    let user = store.seed(catalog(), owner("ada@example.com")).await.unwrap();
    assert_eq!(user.role_id, top_role().id());
    assert_eq!(user.role_name, "owner");
    assert_eq!(user.status, UserStatus::Active);
    assert!(user.last_login_at.is_none());

    let roles = store.list_roles().await.unwrap();
    assert_eq!(roles.len(), ROLE_CATALOG.len());
    assert_eq!(roles[0].name, "owner");
    assert_eq!(roles[0].rank, 0);

    let found = store.find_user_by_email("ADA@example.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
}

#[tokio::test]
async fn failed_seed_leaves_no_partial_state() {
    let store = SurrealTenantStore::new(open_store().await);
    store.seed(catalog(), owner("ada@example.com")).await.unwrap();

    // Second seed reuses the username: the user insert fails, and the
    // role upserts in the same transaction must not persist either.
    let mut roles = catalog();
    roles.push(NewTenantRole {
        id: Uuid::new_v4(),
        name: "contractor".into(),
        description: "Should never be written".into(),
        rank: 9,
    });
    let mut duplicate = owner("grace@example.com");
    duplicate.username = "alovelace".into();

    assert!(store.seed(roles, duplicate).await.is_err());
    assert_eq!(store.list_roles().await.unwrap().len(), ROLE_CATALOG.len());
    assert!(
        store
            .find_user_by_email("grace@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn record_login_and_status_changes() {
    let store = SurrealTenantStore::new(open_store().await);
    let user = store.seed(catalog(), owner("ada@example.com")).await.unwrap();

    store.record_login(user.id).await.unwrap();
    let user = store.get_user(user.id).await.unwrap();
    assert!(user.last_login_at.is_some());

    let user = store.set_user_status(user.id, UserStatus::Inactive).await.unwrap();
    assert_eq!(user.status, UserStatus::Inactive);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let store = SurrealTenantStore::new(open_store().await);
    assert!(store.get_user(Uuid::new_v4()).await.unwrap_err().is_not_found());
    assert!(store.find_user_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn handle_connector_routes_by_address() {
    let address = StoreAddress::new("pool", "tenant_001");
    let mut connector = HandleStoreConnector::new();
    connector.insert(address.clone(), open_store().await);

    let store = connector.connect(&address).await.unwrap();
    store.seed(catalog(), owner("ada@example.com")).await.unwrap();

    let unknown = StoreAddress::new("pool", "tenant_999");
    let err = connector.connect(&unknown).await.err().expect("unknown store");
    assert!(matches!(
        err,
        tenantry_core::error::TenantryError::StoreUnreachable { .. }
    ));
}
