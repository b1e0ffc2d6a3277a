//! The provisioning saga.
//!
//! Runs one customer from a settled payment to a routable administrator:
//!
//! 1. Short-circuit if the customer is already active.
//! 2. Settle the ledger, mark the customer assigned and claim a pool
//!    entry in one registry transaction.
//! 3. Initialize the claimed store (outside the registry transaction).
//! 4. Register the administrator in the directory and mark the customer
//!    active, again in one registry transaction.
//!
//! The registry and the tenant stores are separate transactional
//! domains, so a failed step 3 is undone by explicit compensation rather
//! than rollback. Compensation and activation both require the customer
//! to still be assigned to the claimed entry, so of two concurrent calls
//! for one customer only one of them takes effect. Every state that
//! straddles both domains is logged under [`RECONCILIATION_TARGET`] and
//! queued for an operator.

use std::fmt;
use std::time::Duration;

use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::customer::{Customer, PaymentStatus, ProvisioningStatus};
use tenantry_core::models::directory::{RegisterDirectoryEntry, UserType};
use tenantry_core::models::payment::PaymentSettlement;
use tenantry_core::models::pool::PoolEntry;
use tenantry_core::models::provisioning::{CustomerProfile, InitializedStore, ProvisionedStore};
use tenantry_core::models::reconciliation::{CreateReconciliationItem, ReconciliationReason};
use tenantry_core::repository::{
    CustomerRepository, DirectoryRepository, PaymentRepository, PoolRepository,
    ProvisioningRepository, ReconciliationRepository, Registry, TenantStoreConnector,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ProvisionConfig;
use crate::initializer::initialize_store;

/// Log target for states that need an operator.
pub const RECONCILIATION_TARGET: &str = "tenantry::reconciliation";

/// Forward steps of the saga, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStep {
    SettleAndClaim,
    InitializeStore,
    RegisterDirectory,
    Activate,
}

impl ProvisioningStep {
    /// The compensating action run when a later step fails, if any.
    ///
    /// Store initialization rolls itself back inside the store, and the
    /// last two steps are idempotent on retry.
    pub fn compensation(&self) -> Option<&'static str> {
        match self {
            ProvisioningStep::SettleAndClaim => Some("release pool entry"),
            ProvisioningStep::InitializeStore
            | ProvisioningStep::RegisterDirectory
            | ProvisioningStep::Activate => None,
        }
    }
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisioningStep::SettleAndClaim => "settle_and_claim",
            ProvisioningStep::InitializeStore => "initialize_store",
            ProvisioningStep::RegisterDirectory => "register_directory",
            ProvisioningStep::Activate => "activate",
        };
        f.write_str(name)
    }
}

/// Orchestrates the saga against a registry and a tenant-store connector.
///
/// Performs no automatic retries. Callers decide whether to replay the
/// whole call; every step is safe to replay.
pub struct ProvisioningService<R: Registry, K: TenantStoreConnector> {
    registry: R,
    connector: K,
    init_timeout: Duration,
}

impl<R: Registry, K: TenantStoreConnector> ProvisioningService<R, K> {
    pub fn new(registry: R, connector: K, config: &ProvisionConfig) -> Self {
        Self {
            registry,
            connector,
            init_timeout: config.init_timeout(),
        }
    }

    /// Override the store initialization deadline.
    pub fn with_init_timeout(mut self, init_timeout: Duration) -> Self {
        self.init_timeout = init_timeout;
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Provision a store for `customer_id` whose payment settled with
    /// `settlement`.
    ///
    /// Straddling failures are queued for reconciliation.
    pub async fn provision(
        &self,
        customer_id: Uuid,
        settlement: PaymentSettlement,
    ) -> TenantryResult<ProvisionedStore> {
        self.run(customer_id, settlement, true).await
    }

    /// Replay provisioning for a customer whose ledger already settled,
    /// typically one left `AssignedUninitialized`.
    pub async fn retry(&self, customer_id: Uuid) -> TenantryResult<ProvisionedStore> {
        let payments = self
            .registry
            .payments()
            .list_by_customer(customer_id)
            .await
            .map_err(|e| registry_failure(customer_id, e))?;

        let settlement = payments
            .iter()
            .find_map(|p| p.settlement())
            .ok_or_else(|| TenantryError::Validation {
                message: format!("customer {customer_id} has no settled payment"),
            })?;

        self.run(customer_id, settlement, false).await
    }

    /// Replay the saga for a queued reconciliation item and resolve the
    /// item once provisioning succeeds.
    pub async fn retry_reconciliation(&self, item_id: Uuid) -> TenantryResult<ProvisionedStore> {
        let item = self
            .registry
            .reconciliations()
            .get_by_id(item_id)
            .await
            .map_err(|e| registry_failure(item_id, e))?;
        if item.resolved {
            return Err(TenantryError::Validation {
                message: format!("reconciliation item {item_id} is already resolved"),
            });
        }

        info!(
            target: RECONCILIATION_TARGET,
            item_id = %item.id,
            customer_id = %item.customer_id,
            reason = ?item.reason,
            "Retrying reconciliation item"
        );

        let provisioned = self.run(item.customer_id, item.settlement(), false).await?;
        self.registry
            .reconciliations()
            .resolve(item.id)
            .await
            .map_err(|e| registry_failure(item.customer_id, e))?;

        info!(
            target: RECONCILIATION_TARGET,
            item_id = %item.id,
            customer_id = %item.customer_id,
            store = %provisioned.store_address,
            "Reconciliation item resolved"
        );
        Ok(provisioned)
    }

    async fn run(
        &self,
        customer_id: Uuid,
        settlement: PaymentSettlement,
        enqueue: bool,
    ) -> TenantryResult<ProvisionedStore> {
        let customer = self
            .registry
            .customers()
            .get_by_id(customer_id)
            .await
            .map_err(|e| registry_failure(customer_id, e))?;

        if let Some(existing) = self.existing_linkage(&customer).await? {
            info!(
                customer_id = %customer_id,
                store = %existing.store_address,
                "Customer already provisioned, returning existing linkage"
            );
            return Ok(existing);
        }

        self.guard_ledger(customer_id, &settlement).await?;

        let entry = self
            .settle_and_claim(&customer, &settlement, enqueue)
            .await?;

        let initialized = match self.initialize(&customer, &entry).await {
            Ok(initialized) => initialized,
            Err(e) => {
                return match self
                    .compensate(&customer, &entry, &settlement, enqueue, &e)
                    .await?
                {
                    Some(sibling) => Ok(sibling),
                    None => Err(e),
                };
            }
        };

        let activated = self.activate(&customer, &entry, &initialized).await?;
        if activated.provisioning_status != ProvisioningStatus::Active
            || activated.store_id != Some(entry.id)
        {
            warn!(
                target: RECONCILIATION_TARGET,
                customer_id = %customer_id,
                store = %entry.address,
                status = ?activated.provisioning_status,
                "Claim released by a concurrent attempt before activation"
            );
            return Err(TenantryError::ProvisioningSuperseded {
                store: entry.address.to_string(),
            });
        }

        info!(
            customer_id = %customer_id,
            store = %entry.address,
            user_id = %initialized.user_id,
            created = initialized.created,
            "Customer provisioned"
        );

        Ok(ProvisionedStore {
            customer_id,
            store_id: entry.id,
            store_address: entry.address,
            user_id: initialized.user_id,
            role_id: initialized.role_id,
        })
    }

    async fn existing_linkage(
        &self,
        customer: &Customer,
    ) -> TenantryResult<Option<ProvisionedStore>> {
        if customer.provisioning_status != ProvisioningStatus::Active {
            return Ok(None);
        }
        let (Some(store_id), Some(user_id), Some(role_id)) = (
            customer.store_id,
            customer.admin_user_id,
            customer.admin_role_id,
        ) else {
            warn!(customer_id = %customer.id, "Active customer is missing its store linkage");
            return Ok(None);
        };

        let entry = self
            .registry
            .pool()
            .get_by_id(store_id)
            .await
            .map_err(|e| registry_failure(customer.id, e))?;

        Ok(Some(ProvisionedStore {
            customer_id: customer.id,
            store_id,
            store_address: entry.address,
            user_id,
            role_id,
        }))
    }

    async fn guard_ledger(
        &self,
        customer_id: Uuid,
        settlement: &PaymentSettlement,
    ) -> TenantryResult<()> {
        let payment = self
            .registry
            .payments()
            .get_by_order_ref(&settlement.order_ref)
            .await
            .map_err(|e| registry_failure(customer_id, e))?;

        if payment.customer_id != customer_id {
            warn!(
                customer_id = %customer_id,
                order_ref = %settlement.order_ref,
                "Payment belongs to a different customer"
            );
            return Err(TenantryError::Validation {
                message: format!(
                    "payment {} does not belong to customer {customer_id}",
                    settlement.order_ref
                ),
            });
        }
        if payment.status == PaymentStatus::Failed {
            return Err(TenantryError::PaymentFailed {
                order_ref: settlement.order_ref.clone(),
            });
        }
        Ok(())
    }

    async fn settle_and_claim(
        &self,
        customer: &Customer,
        settlement: &PaymentSettlement,
        enqueue: bool,
    ) -> TenantryResult<PoolEntry> {
        debug!(customer_id = %customer.id, step = %ProvisioningStep::SettleAndClaim, "Saga step");
        let claimed = self
            .registry
            .provisioning()
            .settle_and_claim(customer.id, settlement.clone())
            .await
            .map_err(|e| registry_failure(customer.id, e))?;

        if let Some(entry) = claimed {
            if customer.store_id == Some(entry.id) {
                info!(
                    customer_id = %customer.id,
                    store = %entry.address,
                    "Resuming provisioning on already linked store"
                );
            }
            return Ok(entry);
        }

        // The transaction also declines a ledger entry that failed
        // concurrently; that is not a capacity problem.
        let payment = self
            .registry
            .payments()
            .get_by_order_ref(&settlement.order_ref)
            .await
            .map_err(|e| registry_failure(customer.id, e))?;
        if payment.status == PaymentStatus::Failed {
            return Err(TenantryError::PaymentFailed {
                order_ref: settlement.order_ref.clone(),
            });
        }

        error!(
            target: RECONCILIATION_TARGET,
            customer_id = %customer.id,
            order_ref = %settlement.order_ref,
            transaction_ref = %settlement.transaction_ref,
            "Payment captured externally but the tenant pool is exhausted"
        );
        if enqueue {
            self.enqueue(
                customer.id,
                ReconciliationReason::PoolExhausted,
                settlement,
                "no pool entry available".to_string(),
            )
            .await;
        }
        Err(TenantryError::PoolExhausted)
    }

    async fn initialize(
        &self,
        customer: &Customer,
        entry: &PoolEntry,
    ) -> TenantryResult<InitializedStore> {
        debug!(
            customer_id = %customer.id,
            store = %entry.address,
            step = %ProvisioningStep::InitializeStore,
            "Saga step"
        );
        let profile = CustomerProfile::from(customer);
        let attempt = async {
            let store = self.connector.connect(&entry.address).await?;
            initialize_store(&store, &profile).await
        };

        match tokio::time::timeout(self.init_timeout, attempt).await {
            Ok(Ok(initialized)) => Ok(initialized),
            Ok(Err(e @ TenantryError::StoreUnreachable { .. })) => Err(e),
            Ok(Err(e)) => {
                warn!(
                    customer_id = %customer.id,
                    store = %entry.address,
                    error = %e,
                    "Store initialization failed"
                );
                Err(TenantryError::InitializationFailure {
                    store: entry.address.to_string(),
                })
            }
            Err(_) => {
                warn!(
                    customer_id = %customer.id,
                    store = %entry.address,
                    timeout_ms = self.init_timeout.as_millis() as u64,
                    "Store initialization timed out"
                );
                Err(TenantryError::StoreUnreachable {
                    store: entry.address.to_string(),
                })
            }
        }
    }

    /// Undo the claim after a failed initialization.
    ///
    /// Returns the linkage a concurrent call activated in the meantime,
    /// in which case nothing was released and the failure is moot.
    async fn compensate(
        &self,
        customer: &Customer,
        entry: &PoolEntry,
        settlement: &PaymentSettlement,
        enqueue: bool,
        cause: &TenantryError,
    ) -> TenantryResult<Option<ProvisionedStore>> {
        let compensation = ProvisioningStep::SettleAndClaim.compensation();
        let released = match self
            .registry
            .provisioning()
            .compensate_failed_initialization(customer.id, entry.id)
            .await
        {
            Ok(current) => {
                if let Some(sibling) = self.existing_linkage(&current).await? {
                    info!(
                        customer_id = %customer.id,
                        store = %sibling.store_address,
                        cause = %cause,
                        "Concurrent attempt already activated the customer, claim kept"
                    );
                    return Ok(Some(sibling));
                }
                current.provisioning_status == ProvisioningStatus::AssignedUninitialized
            }
            Err(e) => {
                error!(
                    target: RECONCILIATION_TARGET,
                    customer_id = %customer.id,
                    entry_id = %entry.id,
                    compensation,
                    error = %e,
                    "Compensation failed, pool entry still claimed"
                );
                false
            }
        };

        error!(
            target: RECONCILIATION_TARGET,
            customer_id = %customer.id,
            entry_id = %entry.id,
            store = %entry.address,
            order_ref = %settlement.order_ref,
            compensation,
            released,
            cause = %cause,
            "Store initialization failed after claim"
        );

        if enqueue {
            self.enqueue(
                customer.id,
                ReconciliationReason::InitializationFailed,
                settlement,
                compensation_detail(cause, entry.id, released),
            )
            .await;
        }
        Ok(None)
    }

    /// Register the administrator and mark the customer active.
    ///
    /// An existing directory row for the email counts as registered.
    async fn activate(
        &self,
        customer: &Customer,
        entry: &PoolEntry,
        initialized: &InitializedStore,
    ) -> TenantryResult<Customer> {
        debug!(
            customer_id = %customer.id,
            step = %ProvisioningStep::RegisterDirectory,
            "Saga step"
        );
        let admin = RegisterDirectoryEntry {
            email: customer.admin_email.clone(),
            store_id: entry.id,
            user_type: UserType::Administrator,
            user_id: initialized.user_id,
        };

        debug!(customer_id = %customer.id, step = %ProvisioningStep::Activate, "Saga step");
        let activated = self
            .registry
            .provisioning()
            .activate(customer.id, admin, initialized.role_id)
            .await
            .map_err(|e| {
                warn!(
                    customer_id = %customer.id,
                    error = %e,
                    "Activation failed; store stays linked for retry"
                );
                registry_failure(customer.id, e)
            })?;

        if activated.provisioning_status == ProvisioningStatus::Active {
            let row = self
                .registry
                .directory()
                .get_by_email(&customer.admin_email)
                .await
                .map_err(|e| registry_failure(customer.id, e))?;
            if row.store_id != entry.id || row.user_id != initialized.user_id {
                warn!(
                    email = %row.email,
                    existing_store = %row.store_id,
                    claimed_store = %entry.id,
                    "Directory entry already points elsewhere"
                );
            }
        }
        Ok(activated)
    }

    async fn enqueue(
        &self,
        customer_id: Uuid,
        reason: ReconciliationReason,
        settlement: &PaymentSettlement,
        detail: String,
    ) {
        let item = CreateReconciliationItem {
            customer_id,
            reason,
            order_ref: settlement.order_ref.clone(),
            payer_id: settlement.payer_id.clone(),
            payer_email: settlement.payer_email.clone(),
            transaction_ref: settlement.transaction_ref.clone(),
            detail,
        };
        match self.registry.reconciliations().enqueue(item).await {
            Ok(item) => info!(
                target: RECONCILIATION_TARGET,
                item_id = %item.id,
                customer_id = %customer_id,
                reason = ?reason,
                "Reconciliation item queued"
            ),
            Err(e) => error!(
                target: RECONCILIATION_TARGET,
                customer_id = %customer_id,
                reason = ?reason,
                error = %e,
                "Failed to queue reconciliation item"
            ),
        }
    }
}

fn compensation_detail(cause: &TenantryError, entry_id: Uuid, released: bool) -> String {
    if released {
        format!("{cause} (entry {entry_id} released)")
    } else {
        format!("{cause} (entry {entry_id} still claimed, release it by hand)")
    }
}

/// Storage detail stays in the log; callers see `RegistryUnavailable`.
///
/// The saga never writes a registry row whose uniqueness a caller can
/// violate, so an index violation here is a storage fault too.
pub(crate) fn registry_failure(subject: Uuid, err: TenantryError) -> TenantryError {
    match err {
        TenantryError::Database(detail) | TenantryError::Internal(detail) => {
            error!(subject = %subject, error = %detail, "Registry operation failed");
            TenantryError::RegistryUnavailable
        }
        TenantryError::AlreadyExists { entity } => {
            error!(subject = %subject, index = %entity, "Unexpected registry index violation");
            TenantryError::RegistryUnavailable
        }
        other => other,
    }
}
