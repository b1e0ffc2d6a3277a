//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Registry repositories work on
//! the central store; [`TenantStore`] works on exactly one allocated
//! store and knows nothing about the registry.

use uuid::Uuid;

use crate::error::TenantryResult;
use crate::models::{
    customer::{CreateCustomer, Customer},
    directory::{DirectoryEntry, RegisterDirectoryEntry},
    payment::{CreatePayment, PaymentEntry, PaymentSettlement},
    pool::{CreatePoolEntry, PoolEntry, StoreAddress},
    reconciliation::{CreateReconciliationItem, ReconciliationItem},
    tenant::{NewTenantRole, NewTenantUser, TenantRole, TenantUser, UserStatus},
};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub trait CustomerRepository: Send + Sync {
    fn create(&self, input: CreateCustomer) -> impl Future<Output = TenantryResult<Customer>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TenantryResult<Customer>> + Send;
    /// `Pending -> Failed`; a no-op on any other payment status.
    fn mark_payment_failed(&self, id: Uuid) -> impl Future<Output = TenantryResult<Customer>> + Send;
}

pub trait PaymentRepository: Send + Sync {
    fn create(&self, input: CreatePayment) -> impl Future<Output = TenantryResult<PaymentEntry>> + Send;
    fn get_by_order_ref(
        &self,
        order_ref: &str,
    ) -> impl Future<Output = TenantryResult<PaymentEntry>> + Send;
    fn list_by_customer(
        &self,
        customer_id: Uuid,
    ) -> impl Future<Output = TenantryResult<Vec<PaymentEntry>>> + Send;
    /// `Pending -> Failed`; terminal entries are returned unchanged.
    fn mark_failed(&self, order_ref: &str) -> impl Future<Output = TenantryResult<PaymentEntry>> + Send;
}

pub trait PoolRepository: Send + Sync {
    fn create(&self, input: CreatePoolEntry) -> impl Future<Output = TenantryResult<PoolEntry>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TenantryResult<PoolEntry>> + Send;
    /// All entries in slot order.
    fn list(&self) -> impl Future<Output = TenantryResult<Vec<PoolEntry>>> + Send;
    /// Claim the lowest-slot available entry for `customer_id`.
    ///
    /// Returns `None` when the pool is exhausted.
    fn claim(
        &self,
        customer_id: Uuid,
    ) -> impl Future<Output = TenantryResult<Option<PoolEntry>>> + Send;
    /// Compensating action for [`claim`](Self::claim). Idempotent.
    fn release(&self, id: Uuid) -> impl Future<Output = TenantryResult<()>> + Send;
    fn count_available(&self) -> impl Future<Output = TenantryResult<u64>> + Send;
}

pub trait DirectoryRepository: Send + Sync {
    /// Insert a routing row. A duplicate email surfaces as
    /// [`TenantryError::DirectoryConflict`](crate::error::TenantryError::DirectoryConflict).
    fn register(
        &self,
        input: RegisterDirectoryEntry,
    ) -> impl Future<Output = TenantryResult<DirectoryEntry>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = TenantryResult<DirectoryEntry>> + Send;
    fn set_active(
        &self,
        email: &str,
        active: bool,
    ) -> impl Future<Output = TenantryResult<DirectoryEntry>> + Send;
}

pub trait ReconciliationRepository: Send + Sync {
    fn enqueue(
        &self,
        input: CreateReconciliationItem,
    ) -> impl Future<Output = TenantryResult<ReconciliationItem>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TenantryResult<ReconciliationItem>> + Send;
    fn list_open(&self) -> impl Future<Output = TenantryResult<Vec<ReconciliationItem>>> + Send;
    fn resolve(&self, id: Uuid) -> impl Future<Output = TenantryResult<ReconciliationItem>> + Send;
}

pub trait ProvisioningRepository: Send + Sync {
    /// Settle the ledger entry, mark the customer assigned and claim a
    /// pool entry inside one registry transaction.
    ///
    /// Returns the entry linked to the customer after commit, or `None`
    /// if the pool was exhausted (in which case nothing was written).
    /// A customer that is already linked keeps its entry.
    fn settle_and_claim(
        &self,
        customer_id: Uuid,
        settlement: PaymentSettlement,
    ) -> impl Future<Output = TenantryResult<Option<PoolEntry>>> + Send;
    /// Compensation for a failed store initialization: release the entry
    /// and flip the customer to `AssignedUninitialized` in one registry
    /// transaction.
    ///
    /// Writes nothing unless the customer is still `Assigned` to
    /// `entry_id`, so a concurrent call that already activated the
    /// customer is never undone. Returns the customer as committed.
    fn compensate_failed_initialization(
        &self,
        customer_id: Uuid,
        entry_id: Uuid,
    ) -> impl Future<Output = TenantryResult<Customer>> + Send;
    /// Register the administrator in the directory and flip the customer
    /// to `Active` in one registry transaction.
    ///
    /// Writes nothing unless the customer is still linked to
    /// `admin.store_id` (`Assigned`, or `Active` on a replay). An existing
    /// directory row for the email is kept.
    /// Returns the customer as committed.
    fn activate(
        &self,
        customer_id: Uuid,
        admin: RegisterDirectoryEntry,
        role_id: Uuid,
    ) -> impl Future<Output = TenantryResult<Customer>> + Send;
}

/// Bundle of registry repositories sharing one central store.
pub trait Registry: Send + Sync {
    type Customers: CustomerRepository;
    type Payments: PaymentRepository;
    type Pool: PoolRepository;
    type Directory: DirectoryRepository;
    type Reconciliations: ReconciliationRepository;
    type Provisioning: ProvisioningRepository;

    fn customers(&self) -> &Self::Customers;
    fn payments(&self) -> &Self::Payments;
    fn pool(&self) -> &Self::Pool;
    fn directory(&self) -> &Self::Directory;
    fn reconciliations(&self) -> &Self::Reconciliations;
    fn provisioning(&self) -> &Self::Provisioning;
}

// ---------------------------------------------------------------------------
// Tenant stores
// ---------------------------------------------------------------------------

pub trait TenantStore: Send + Sync {
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = TenantryResult<Option<TenantUser>>> + Send;
    fn get_user(&self, id: Uuid) -> impl Future<Output = TenantryResult<TenantUser>> + Send;
    fn list_roles(&self) -> impl Future<Output = TenantryResult<Vec<TenantRole>>> + Send;
    /// Write the role catalog and the first user in one store-local
    /// transaction. Nothing persists if any statement fails.
    fn seed(
        &self,
        roles: Vec<NewTenantRole>,
        user: NewTenantUser,
    ) -> impl Future<Output = TenantryResult<TenantUser>> + Send;
    fn record_login(&self, user_id: Uuid) -> impl Future<Output = TenantryResult<()>> + Send;
    fn set_user_status(
        &self,
        user_id: Uuid,
        status: UserStatus,
    ) -> impl Future<Output = TenantryResult<TenantUser>> + Send;
}

/// Opens a handle to one tenant store by its explicit address.
pub trait TenantStoreConnector: Send + Sync {
    type Store: TenantStore;

    fn connect(
        &self,
        address: &StoreAddress,
    ) -> impl Future<Output = TenantryResult<Self::Store>> + Send;
}
