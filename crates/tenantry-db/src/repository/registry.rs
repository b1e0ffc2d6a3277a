//! The central registry: every registry repository over one client.

use surrealdb::{Connection, Surreal};
use tenantry_core::repository::Registry;

use super::{
    SurrealCustomerRepository, SurrealDirectoryRepository, SurrealPaymentRepository,
    SurrealPoolRepository, SurrealProvisioningRepository, SurrealReconciliationRepository,
};
use super::pool::DEFAULT_CLAIM_ATTEMPTS;

#[derive(Clone)]
pub struct SurrealRegistry<C: Connection> {
    customers: SurrealCustomerRepository<C>,
    payments: SurrealPaymentRepository<C>,
    pool: SurrealPoolRepository<C>,
    directory: SurrealDirectoryRepository<C>,
    reconciliations: SurrealReconciliationRepository<C>,
    provisioning: SurrealProvisioningRepository<C>,
}

impl<C: Connection> SurrealRegistry<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self::build(db, None, DEFAULT_CLAIM_ATTEMPTS)
    }

    /// Registry whose customer repository hashes admin passwords with
    /// the given server-side pepper.
    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self::build(db, Some(pepper), DEFAULT_CLAIM_ATTEMPTS)
    }

    /// Full constructor: optional pepper and the number of attempts a
    /// conflicting claim transaction gets.
    pub fn build(db: Surreal<C>, pepper: Option<String>, claim_attempts: u32) -> Self {
        let customers = match pepper {
            Some(p) => SurrealCustomerRepository::with_pepper(db.clone(), p),
            None => SurrealCustomerRepository::new(db.clone()),
        };
        Self {
            customers,
            payments: SurrealPaymentRepository::new(db.clone()),
            pool: SurrealPoolRepository::with_claim_attempts(db.clone(), claim_attempts),
            directory: SurrealDirectoryRepository::new(db.clone()),
            reconciliations: SurrealReconciliationRepository::new(db.clone()),
            provisioning: SurrealProvisioningRepository::with_claim_attempts(db, claim_attempts),
        }
    }
}

impl<C: Connection> Registry for SurrealRegistry<C> {
    type Customers = SurrealCustomerRepository<C>;
    type Payments = SurrealPaymentRepository<C>;
    type Pool = SurrealPoolRepository<C>;
    type Directory = SurrealDirectoryRepository<C>;
    type Reconciliations = SurrealReconciliationRepository<C>;
    type Provisioning = SurrealProvisioningRepository<C>;

    fn customers(&self) -> &Self::Customers {
        &self.customers
    }

    fn payments(&self) -> &Self::Payments {
        &self.payments
    }

    fn pool(&self) -> &Self::Pool {
        &self.pool
    }

    fn directory(&self) -> &Self::Directory {
        &self.directory
    }

    fn reconciliations(&self) -> &Self::Reconciliations {
        &self.reconciliations
    }

    fn provisioning(&self) -> &Self::Provisioning {
        &self.provisioning
    }
}
