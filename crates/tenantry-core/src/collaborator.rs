//! External collaborators consumed by the core flows.
//!
//! Neither is implemented by the saga itself: the credential issuer is
//! provided by `tenantry-auth`, and the capture verifier wraps whatever
//! payment provider is in use.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TenantryResult;

/// What a credential is scoped to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRequest {
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub customer_id: Option<Uuid>,
}

/// An opaque bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub access_token: String,
    pub expires_in: u64,
}

pub trait CredentialIssuer: Send + Sync {
    fn issue(&self, request: &CredentialRequest) -> TenantryResult<IssuedCredential>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CaptureStatus {
    Completed,
    Pending,
    Declined,
    Voided,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStatus::Completed => "COMPLETED",
            CaptureStatus::Pending => "PENDING",
            CaptureStatus::Declined => "DECLINED",
            CaptureStatus::Voided => "VOIDED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    pub status: CaptureStatus,
    pub payer_id: String,
    pub payer_email: String,
    pub external_transaction_id: String,
}

/// Captures an approved order with the payment provider.
pub trait PaymentCaptureVerifier: Send + Sync {
    fn capture(&self, order_ref: &str) -> impl Future<Output = TenantryResult<CaptureResult>> + Send;
}
