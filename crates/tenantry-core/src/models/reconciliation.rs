//! Manual reconciliation queue.
//!
//! Items are enqueued whenever the saga ends in a state that straddles
//! two stores and cannot be undone automatically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::PaymentSettlement;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReconciliationReason {
    /// Payment captured externally, but no pool entry was free.
    PoolExhausted,
    /// A claim was released after the store failed to initialize.
    InitializationFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub reason: ReconciliationReason,
    pub order_ref: String,
    pub payer_id: String,
    pub payer_email: String,
    pub transaction_ref: String,
    pub detail: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ReconciliationItem {
    /// The settlement to replay when retrying this item.
    pub fn settlement(&self) -> PaymentSettlement {
        PaymentSettlement {
            order_ref: self.order_ref.clone(),
            payer_id: self.payer_id.clone(),
            payer_email: self.payer_email.clone(),
            transaction_ref: self.transaction_ref.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReconciliationItem {
    pub customer_id: Uuid,
    pub reason: ReconciliationReason,
    pub order_ref: String,
    pub payer_id: String,
    pub payer_email: String,
    pub transaction_ref: String,
    pub detail: String,
}
