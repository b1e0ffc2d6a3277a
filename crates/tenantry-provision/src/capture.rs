//! Payment capture callback handling.
//!
//! Turns an approved external order into a provisioned store and a
//! scoped credential. A ledger entry that already settled is replayed
//! without calling the payment provider again.

use sha2::{Digest, Sha256};
use tenantry_core::collaborator::{
    CaptureResult, CaptureStatus, CredentialIssuer, CredentialRequest, IssuedCredential,
    PaymentCaptureVerifier,
};
use tenantry_core::error::{TenantryError, TenantryResult};
use tenantry_core::models::customer::PaymentStatus;
use tenantry_core::models::payment::PaymentSettlement;
use tenantry_core::models::provisioning::ProvisionedStore;
use tenantry_core::models::tenant::{ROLE_CATALOG, top_role};
use tenantry_core::repository::{
    CustomerRepository, PaymentRepository, Registry, TenantStoreConnector,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::saga::{ProvisioningService, registry_failure};

/// What a successful capture callback hands back to its caller.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub provisioned: ProvisionedStore,
    pub credential: IssuedCredential,
    /// True when the ledger had already settled and the provider was not
    /// contacted.
    pub replayed: bool,
}

pub struct PaymentCaptureHandler<R, K, V, I>
where
    R: Registry,
    K: TenantStoreConnector,
    V: PaymentCaptureVerifier,
    I: CredentialIssuer,
{
    service: ProvisioningService<R, K>,
    verifier: V,
    issuer: I,
}

impl<R, K, V, I> PaymentCaptureHandler<R, K, V, I>
where
    R: Registry,
    K: TenantStoreConnector,
    V: PaymentCaptureVerifier,
    I: CredentialIssuer,
{
    pub fn new(service: ProvisioningService<R, K>, verifier: V, issuer: I) -> Self {
        Self {
            service,
            verifier,
            issuer,
        }
    }

    pub fn service(&self) -> &ProvisioningService<R, K> {
        &self.service
    }

    pub async fn handle_capture(&self, order_ref: &str) -> TenantryResult<CaptureOutcome> {
        let registry = self.service.registry();
        let payment = registry
            .payments()
            .get_by_order_ref(order_ref)
            .await
            .map_err(|e| registry_failure(Uuid::nil(), e))?;

        let (settlement, replayed) = match payment.status {
            PaymentStatus::Failed => {
                return Err(TenantryError::PaymentFailed {
                    order_ref: order_ref.to_string(),
                });
            }
            PaymentStatus::Completed => match payment.settlement() {
                Some(settlement) => {
                    info!(order_ref = %order_ref, "Ledger already settled, replaying provisioning");
                    (settlement, true)
                }
                None => {
                    return Err(TenantryError::Internal(format!(
                        "completed payment {order_ref} has no settlement"
                    )));
                }
            },
            PaymentStatus::Pending => {
                let capture = self.verifier.capture(order_ref).await?;
                if capture.status != CaptureStatus::Completed {
                    warn!(
                        order_ref = %order_ref,
                        status = capture.status.as_str(),
                        "Payment capture not completed"
                    );
                    registry
                        .payments()
                        .mark_failed(order_ref)
                        .await
                        .map_err(|e| registry_failure(payment.customer_id, e))?;
                    registry
                        .customers()
                        .mark_payment_failed(payment.customer_id)
                        .await
                        .map_err(|e| registry_failure(payment.customer_id, e))?;
                    return Err(TenantryError::PaymentNotCaptured {
                        status: capture.status.as_str().to_string(),
                    });
                }
                (settlement_from(order_ref, capture), false)
            }
        };

        let provisioned = self
            .service
            .provision(payment.customer_id, settlement)
            .await?;

        let role = ROLE_CATALOG
            .iter()
            .find(|r| r.id() == provisioned.role_id)
            .unwrap_or_else(top_role);
        let credential = self.issuer.issue(&CredentialRequest {
            store_id: provisioned.store_id,
            user_id: provisioned.user_id,
            role: role.key.to_string(),
            customer_id: Some(provisioned.customer_id),
        })?;

        Ok(CaptureOutcome {
            provisioned,
            credential,
            replayed,
        })
    }
}

fn settlement_from(order_ref: &str, capture: CaptureResult) -> PaymentSettlement {
    PaymentSettlement {
        order_ref: order_ref.to_string(),
        payer_id: capture.payer_id,
        payer_email: capture.payer_email,
        transaction_ref: capture.external_transaction_id,
    }
}

/// Completes every order with synthetic references.
///
/// References are derived from the order reference, so replaying the
/// same order yields the same settlement.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCaptureVerifier;

impl SimulatedCaptureVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl PaymentCaptureVerifier for SimulatedCaptureVerifier {
    async fn capture(&self, order_ref: &str) -> TenantryResult<CaptureResult> {
        let digest = hex::encode(Sha256::digest(order_ref.as_bytes()));
        info!(order_ref = %order_ref, "Simulated payment capture");
        Ok(CaptureResult {
            status: CaptureStatus::Completed,
            payer_id: format!("SIM-PAYER-{}", &digest[..12].to_uppercase()),
            payer_email: format!("sim-{}@payments.invalid", &digest[..8]),
            external_transaction_id: format!("SIM-TXN-{}", &digest[12..28].to_uppercase()),
        })
    }
}
