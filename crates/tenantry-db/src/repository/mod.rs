//! SurrealDB repository implementations.

mod customer;
mod directory;
mod payment;
mod pool;
mod provisioning;
mod reconciliation;
mod registry;
mod tenant_store;

pub use customer::SurrealCustomerRepository;
pub use directory::SurrealDirectoryRepository;
pub use payment::SurrealPaymentRepository;
pub use pool::{DEFAULT_CLAIM_ATTEMPTS, SurrealPoolRepository};
pub use provisioning::SurrealProvisioningRepository;
pub use reconciliation::SurrealReconciliationRepository;
pub use registry::SurrealRegistry;
pub use tenant_store::SurrealTenantStore;
