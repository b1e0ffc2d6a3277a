//! Integration tests for the login resolver against in-memory SurrealDB
//! registry and tenant stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tenantry_auth::{AuthConfig, LoginResolver};
use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::customer::CreateCustomer;
use tenantry_core::models::directory::{DirectoryEntry, RegisterDirectoryEntry, UserType};
use tenantry_core::models::pool::{CreatePoolEntry, StoreAddress};
use tenantry_core::models::tenant::{
    NewTenantRole, NewTenantUser, ROLE_CATALOG, TenantRole, TenantUser, UserStatus, top_role,
};
use tenantry_core::repository::{
    CustomerRepository, DirectoryRepository, PoolRepository, Registry, TenantStore,
    TenantStoreConnector,
};
use tenantry_db::HandleStoreConnector;
use tenantry_db::repository::{
    SurrealCustomerRepository, SurrealDirectoryRepository, SurrealPaymentRepository,
    SurrealPoolRepository, SurrealProvisioningRepository, SurrealReconciliationRepository,
    SurrealRegistry, SurrealTenantStore,
};
use uuid::Uuid;

const PASSWORD: &str = "correct horse battery staple";

// -----------------------------------------------------------------------
// Lookup-counting doubles
// -----------------------------------------------------------------------

#[derive(Clone, Default)]
struct Counters {
    directory_lookups: Arc<AtomicUsize>,
    store_connects: Arc<AtomicUsize>,
    store_user_lookups: Arc<AtomicUsize>,
}

struct CountingDirectory {
    inner: SurrealDirectoryRepository<Db>,
    counters: Counters,
}

impl DirectoryRepository for CountingDirectory {
    async fn register(&self, input: RegisterDirectoryEntry) -> TenantryResult<DirectoryEntry> {
        self.inner.register(input).await
    }

    async fn get_by_email(&self, email: &str) -> TenantryResult<DirectoryEntry> {
        self.counters.directory_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_email(email).await
    }

    async fn set_active(&self, email: &str, active: bool) -> TenantryResult<DirectoryEntry> {
        self.inner.set_active(email, active).await
    }
}

struct CountingRegistry {
    inner: SurrealRegistry<Db>,
    directory: CountingDirectory,
}

impl Registry for CountingRegistry {
    type Customers = SurrealCustomerRepository<Db>;
    type Payments = SurrealPaymentRepository<Db>;
    type Pool = SurrealPoolRepository<Db>;
    type Directory = CountingDirectory;
    type Reconciliations = SurrealReconciliationRepository<Db>;
    type Provisioning = SurrealProvisioningRepository<Db>;

    fn customers(&self) -> &Self::Customers {
        self.inner.customers()
    }
    fn payments(&self) -> &Self::Payments {
        self.inner.payments()
    }
    fn pool(&self) -> &Self::Pool {
        self.inner.pool()
    }
    fn directory(&self) -> &Self::Directory {
        &self.directory
    }
    fn reconciliations(&self) -> &Self::Reconciliations {
        self.inner.reconciliations()
    }
    fn provisioning(&self) -> &Self::Provisioning {
        self.inner.provisioning()
    }
}

struct CountingStore {
    inner: SurrealTenantStore<Db>,
    counters: Counters,
}

impl TenantStore for CountingStore {
    async fn find_user_by_email(&self, email: &str) -> TenantryResult<Option<TenantUser>> {
        self.counters.store_user_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_user_by_email(email).await
    }
    async fn get_user(&self, id: Uuid) -> TenantryResult<TenantUser> {
        self.counters.store_user_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_user(id).await
    }
    async fn list_roles(&self) -> TenantryResult<Vec<TenantRole>> {
        self.inner.list_roles().await
    }
    async fn seed(&self, roles: Vec<NewTenantRole>, user: NewTenantUser) -> TenantryResult<TenantUser> {
        self.inner.seed(roles, user).await
    }
    async fn record_login(&self, user_id: Uuid) -> TenantryResult<()> {
        self.inner.record_login(user_id).await
    }
    async fn set_user_status(&self, user_id: Uuid, status: UserStatus) -> TenantryResult<TenantUser> {
        self.inner.set_user_status(user_id, status).await
    }
}

struct CountingConnector {
    inner: HandleStoreConnector<Db>,
    counters: Counters,
}

impl TenantStoreConnector for CountingConnector {
    type Store = CountingStore;

    async fn connect(&self, address: &StoreAddress) -> TenantryResult<Self::Store> {
        self.counters.store_connects.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.connect(address).await?;
        Ok(CountingStore {
            inner,
            counters: self.counters.clone(),
        })
    }
}

// -----------------------------------------------------------------------
// Fixture
// -----------------------------------------------------------------------

struct Fixture {
    registry: SurrealRegistry<Db>,
    stores: HandleStoreConnector<Db>,
    addresses: Vec<StoreAddress>,
    customer_id: Uuid,
    admin_user_id: Uuid,
}

impl Fixture {
    fn resolver(&self) -> (LoginResolver<CountingRegistry, CountingConnector>, Counters) {
        let counters = Counters::default();
        let registry = CountingRegistry {
            inner: self.registry.clone(),
            directory: CountingDirectory {
                inner: self.registry.directory().clone(),
                counters: counters.clone(),
            },
        };
        let connector = CountingConnector {
            inner: self.stores.clone(),
            counters: counters.clone(),
        };
        (
            LoginResolver::new(registry, connector, &AuthConfig::default()),
            counters,
        )
    }

    fn store(&self, index: usize) -> SurrealTenantStore<Db> {
        let handle = self.stores.handle(&self.addresses[index]).unwrap();
        SurrealTenantStore::new(handle.clone())
    }
}

/// Three provisioned-looking stores; the administrator lives in the
/// second so a fan-out would be visible in the counters.
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("registry").await.unwrap();
    tenantry_db::run_migrations(&db).await.unwrap();
    let registry = SurrealRegistry::new(db);

    let mut stores = HandleStoreConnector::new();
    let mut addresses = Vec::new();
    for slot in 1..=3u32 {
        let address = StoreAddress::new("pool", format!("tenant_{slot:03}"));
        let store = Surreal::new::<Mem>(()).await.unwrap();
        store.use_ns("pool").use_db(format!("tenant_{slot:03}")).await.unwrap();
        tenantry_db::run_store_migrations(&store).await.unwrap();
        stores.insert(address.clone(), store);
        registry
            .pool()
            .create(CreatePoolEntry {
                slot,
                address: address.clone(),
            })
            .await
            .unwrap();
        addresses.push(address);
    }

    // Occupy slot 1 so the administrator lands in slot 2.
    registry.pool().claim(Uuid::new_v4()).await.unwrap().unwrap();

    let customer = registry
        .customers()
        .create(CreateCustomer {
            company_name: "Acme Staffing".into(),
            admin_first_name: "Ada".into(),
            admin_last_name: "Lovelace".into(),
            admin_email: "ada@example.com".into(),
            admin_password: PASSWORD.into(),
        })
        .await
        .unwrap();
    let entry = registry.pool().claim(customer.id).await.unwrap().unwrap();
    assert_eq!(entry.address, addresses[1]);

    let store = SurrealTenantStore::new(stores.handle(&entry.address).unwrap().clone());
    let roles: Vec<NewTenantRole> = ROLE_CATALOG.iter().map(NewTenantRole::from).collect();
    let admin = store
        .seed(
            roles,
            NewTenantUser {
                id: Uuid::new_v4(),
                username: "alovelace".into(),
                email: customer.admin_email.clone(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                password_hash: customer.admin_password_hash.clone(),
                role_id: top_role().id(),
            },
        )
        .await
        .unwrap();
    registry
        .directory()
        .register(RegisterDirectoryEntry {
            email: admin.email.clone(),
            store_id: entry.id,
            user_type: UserType::Administrator,
            user_id: admin.id,
        })
        .await
        .unwrap();

    Fixture {
        registry,
        stores,
        addresses,
        customer_id: customer.id,
        admin_user_id: admin.id,
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn resolve_returns_store_scoped_principal() {
    let fx = setup().await;
    let (resolver, counters) = fx.resolver();

    let principal = resolver.resolve(" Ada@Example.com ", PASSWORD).await.unwrap();

    assert_eq!(principal.store_address, fx.addresses[1]);
    assert_eq!(principal.user_id, fx.admin_user_id);
    assert_eq!(principal.role_name, "owner");
    assert_eq!(principal.role_id, top_role().id());
    assert_eq!(principal.username, "alovelace");
    assert_eq!(principal.user_type, UserType::Administrator);
    let customer = principal.customer.expect("administrators carry the customer");
    assert_eq!(customer.id, fx.customer_id);
    assert_eq!(customer.company_name, "Acme Staffing");

    assert_eq!(counters.directory_lookups.load(Ordering::SeqCst), 1);
    assert_eq!(counters.store_connects.load(Ordering::SeqCst), 1);
    assert_eq!(counters.store_user_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resolve_records_last_login() {
    let fx = setup().await;
    let (resolver, _) = fx.resolver();

    resolver.resolve("ada@example.com", PASSWORD).await.unwrap();

    let user = fx.store(1).get_user(fx.admin_user_id).await.unwrap();
    assert!(user.last_login_at.is_some());
}

#[tokio::test]
async fn unknown_email_is_invalid_credentials_without_store_access() {
    let fx = setup().await;
    let (resolver, counters) = fx.resolver();

    let err = resolver.resolve("nobody@example.com", PASSWORD).await.unwrap_err();

    assert!(matches!(err, TenantryError::InvalidCredentials));
    assert_eq!(counters.directory_lookups.load(Ordering::SeqCst), 1);
    assert_eq!(counters.store_connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_password_is_indistinguishable_from_unknown_email() {
    let fx = setup().await;
    let (resolver, _) = fx.resolver();

    let wrong = resolver.resolve("ada@example.com", "nope").await.unwrap_err();
    let unknown = resolver.resolve("nobody@example.com", "nope").await.unwrap_err();

    assert!(matches!(wrong, TenantryError::InvalidCredentials));
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn inactive_directory_entry_is_rejected_before_store_access() {
    let fx = setup().await;
    fx.registry
        .directory()
        .set_active("ada@example.com", false)
        .await
        .unwrap();
    let (resolver, counters) = fx.resolver();

    let err = resolver.resolve("ada@example.com", PASSWORD).await.unwrap_err();

    assert!(matches!(err, TenantryError::InactiveAccount));
    assert_eq!(counters.store_connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn inactive_store_user_is_rejected() {
    let fx = setup().await;
    fx.store(1)
        .set_user_status(fx.admin_user_id, UserStatus::Inactive)
        .await
        .unwrap();
    let (resolver, _) = fx.resolver();

    let err = resolver.resolve("ada@example.com", PASSWORD).await.unwrap_err();
    assert!(matches!(err, TenantryError::InactiveAccount));

    // A wrong password on an inactive account still reads as bad credentials.
    let err = resolver.resolve("ada@example.com", "nope").await.unwrap_err();
    assert!(matches!(err, TenantryError::InvalidCredentials));
}

#[tokio::test]
async fn unreachable_store_is_distinct_from_bad_credentials() {
    let fx = setup().await;
    let counters = Counters::default();
    let registry = CountingRegistry {
        inner: fx.registry.clone(),
        directory: CountingDirectory {
            inner: fx.registry.directory().clone(),
            counters: counters.clone(),
        },
    };
    // A connector that knows no stores at all.
    let connector = CountingConnector {
        inner: HandleStoreConnector::new(),
        counters: counters.clone(),
    };
    let resolver = LoginResolver::new(registry, connector, &AuthConfig::default());

    let err = resolver.resolve("ada@example.com", PASSWORD).await.unwrap_err();
    assert!(matches!(err, TenantryError::StoreUnreachable { .. }));
}

#[tokio::test]
async fn member_principal_has_no_customer() {
    let fx = setup().await;
    let store = fx.store(1);
    let password_hash = tenantry_db::hash_password("member-password", None).unwrap();
    let employee = ROLE_CATALOG.iter().find(|r| r.key == "employee").unwrap();
    let member = store
        .seed(
            Vec::new(),
            NewTenantUser {
                id: Uuid::new_v4(),
                username: "ghopper".into(),
                email: "grace@example.com".into(),
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                password_hash,
                role_id: employee.id(),
            },
        )
        .await
        .unwrap();
    let entry = fx.registry.directory().get_by_email("ada@example.com").await.unwrap();
    fx.registry
        .directory()
        .register(RegisterDirectoryEntry {
            email: "grace@example.com".into(),
            store_id: entry.store_id,
            user_type: UserType::Member,
            user_id: member.id,
        })
        .await
        .unwrap();
    let (resolver, _) = fx.resolver();

    let principal = resolver.resolve("grace@example.com", "member-password").await.unwrap();
    assert_eq!(principal.role_name, "employee");
    assert_eq!(principal.user_type, UserType::Member);
    assert!(principal.customer.is_none());
}
