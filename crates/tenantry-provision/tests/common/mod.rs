//! Shared fixtures: an in-memory registry, a pool of in-memory tenant
//! stores, and a connector that can inject store faults.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::customer::{CreateCustomer, Customer};
use tenantry_core::models::payment::{CreatePayment, PaymentEntry, PaymentSettlement};
use tenantry_core::models::pool::{CreatePoolEntry, PoolEntry, StoreAddress};
use tenantry_core::models::tenant::{NewTenantRole, NewTenantUser, TenantRole, TenantUser, UserStatus};
use tenantry_core::repository::{
    CustomerRepository, PaymentRepository, PoolRepository, Registry, TenantStore,
    TenantStoreConnector,
};
use tenantry_db::HandleStoreConnector;
use tenantry_db::repository::{SurrealRegistry, SurrealTenantStore};
use tenantry_provision::{ProvisionConfig, ProvisioningService};
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery staple";

pub type Service = ProvisioningService<SurrealRegistry<Db>, HandleStoreConnector<Db>>;
pub type FaultyService = ProvisioningService<SurrealRegistry<Db>, FaultyConnector>;

pub struct Harness {
    pub registry: SurrealRegistry<Db>,
    pub stores: HandleStoreConnector<Db>,
    pub addresses: Vec<StoreAddress>,
    pub entry_ids: Vec<Uuid>,
}

pub async fn harness(pool_size: u32) -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("registry").await.unwrap();
    tenantry_db::run_migrations(&db).await.unwrap();

    let mut harness = Harness {
        registry: SurrealRegistry::new(db),
        stores: HandleStoreConnector::new(),
        addresses: Vec::new(),
        entry_ids: Vec::new(),
    };
    for _ in 0..pool_size {
        harness.add_entry().await;
    }
    harness
}

impl Harness {
    /// Prepare one more in-memory store and add it to the pool with the
    /// next slot number.
    pub async fn add_entry(&mut self) -> PoolEntry {
        let slot = self.addresses.len() as u32 + 1;
        let database = format!("tenant_{slot:03}");
        let address = StoreAddress::new("pool", database.clone());

        let store = Surreal::new::<Mem>(()).await.unwrap();
        store.use_ns("pool").use_db(database).await.unwrap();
        tenantry_db::run_store_migrations(&store).await.unwrap();
        self.stores.insert(address.clone(), store);

        let entry = self
            .registry
            .pool()
            .create(CreatePoolEntry {
                slot,
                address: address.clone(),
            })
            .await
            .unwrap();
        self.addresses.push(address);
        self.entry_ids.push(entry.id);
        entry
    }

    pub fn service(&self) -> Service {
        ProvisioningService::new(
            self.registry.clone(),
            self.stores.clone(),
            &ProvisionConfig::default(),
        )
    }

    pub fn faulty_service(&self, faults: &Faults) -> FaultyService {
        self.faulty_service_with_timeout(faults, Duration::from_millis(200))
    }

    pub fn faulty_service_with_timeout(&self, faults: &Faults, timeout: Duration) -> FaultyService {
        let connector = FaultyConnector {
            inner: self.stores.clone(),
            faults: faults.clone(),
        };
        ProvisioningService::new(self.registry.clone(), connector, &ProvisionConfig::default())
            .with_init_timeout(timeout)
    }

    pub fn store(&self, index: usize) -> SurrealTenantStore<Db> {
        let handle = self.stores.handle(&self.addresses[index]).unwrap();
        SurrealTenantStore::new(handle.clone())
    }

    /// A registered customer with one pending ledger entry.
    pub async fn customer(&self, first: &str, last: &str) -> (Customer, PaymentEntry) {
        let customer = self
            .registry
            .customers()
            .create(CreateCustomer {
                company_name: format!("{last} Holdings"),
                admin_first_name: first.into(),
                admin_last_name: last.into(),
                admin_email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
                admin_password: PASSWORD.into(),
            })
            .await
            .unwrap();
        let payment = self
            .registry
            .payments()
            .create(CreatePayment {
                customer_id: customer.id,
                order_ref: format!("ORDER-{}", customer.id.simple()),
                amount_minor: 4900,
                currency: "EUR".into(),
            })
            .await
            .unwrap();
        (customer, payment)
    }
}

pub fn settlement(order_ref: &str) -> PaymentSettlement {
    PaymentSettlement {
        order_ref: order_ref.to_string(),
        payer_id: "PAYER-1".into(),
        payer_email: "payer@example.com".into(),
        transaction_ref: format!("TXN-{order_ref}"),
    }
}

// -----------------------------------------------------------------------
// Fault injection
// -----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Connection attempts fail.
    Unreachable,
    /// Seeding fails without touching the store.
    FailSeed,
    /// Seeding never finishes.
    Hang,
    /// Seeding succeeds after [`STALL`].
    Stall,
}

pub const STALL: Duration = Duration::from_millis(300);

/// Per-address faults, shared between a test and its connector.
#[derive(Clone, Default)]
pub struct Faults(Arc<Mutex<HashMap<StoreAddress, Fault>>>);

impl Faults {
    pub fn set(&self, address: &StoreAddress, fault: Fault) {
        self.0.lock().unwrap().insert(address.clone(), fault);
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn get(&self, address: &StoreAddress) -> Option<Fault> {
        self.0.lock().unwrap().get(address).copied()
    }
}

pub struct FaultyConnector {
    inner: HandleStoreConnector<Db>,
    faults: Faults,
}

impl TenantStoreConnector for FaultyConnector {
    type Store = FaultyStore;

    async fn connect(&self, address: &StoreAddress) -> TenantryResult<Self::Store> {
        let fault = self.faults.get(address);
        if fault == Some(Fault::Unreachable) {
            return Err(TenantryError::StoreUnreachable {
                store: address.to_string(),
            });
        }
        Ok(FaultyStore {
            inner: self.inner.connect(address).await?,
            fault,
        })
    }
}

pub struct FaultyStore {
    inner: SurrealTenantStore<Db>,
    fault: Option<Fault>,
}

impl TenantStore for FaultyStore {
    async fn find_user_by_email(&self, email: &str) -> TenantryResult<Option<TenantUser>> {
        self.inner.find_user_by_email(email).await
    }
    async fn get_user(&self, id: Uuid) -> TenantryResult<TenantUser> {
        self.inner.get_user(id).await
    }
    async fn list_roles(&self) -> TenantryResult<Vec<TenantRole>> {
        self.inner.list_roles().await
    }
    async fn seed(&self, roles: Vec<NewTenantRole>, user: NewTenantUser) -> TenantryResult<TenantUser> {
        match self.fault {
            Some(Fault::FailSeed) => Err(TenantryError::Database("injected seed failure".into())),
            Some(Fault::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                self.inner.seed(roles, user).await
            }
            Some(Fault::Stall) => {
                tokio::time::sleep(STALL).await;
                self.inner.seed(roles, user).await
            }
            _ => self.inner.seed(roles, user).await,
        }
    }
    async fn record_login(&self, user_id: Uuid) -> TenantryResult<()> {
        self.inner.record_login(user_id).await
    }
    async fn set_user_status(&self, user_id: Uuid, status: UserStatus) -> TenantryResult<TenantUser> {
        self.inner.set_user_status(user_id, status).await
    }
}
