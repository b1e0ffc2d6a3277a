//! Payment ledger domain model.
//!
//! One entry per external payment attempt. Status only moves forward:
//! `Pending -> Completed` or `Pending -> Failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::customer::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// External order reference issued by the payment provider.
    pub order_ref: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payer_id: Option<String>,
    pub payer_email: Option<String>,
    pub transaction_ref: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentEntry {
    pub fn is_terminal(&self) -> bool {
        self.status != PaymentStatus::Pending
    }

    /// Settlement recorded on a completed entry, if any.
    pub fn settlement(&self) -> Option<PaymentSettlement> {
        if self.status != PaymentStatus::Completed {
            return None;
        }
        Some(PaymentSettlement {
            order_ref: self.order_ref.clone(),
            payer_id: self.payer_id.clone().unwrap_or_default(),
            payer_email: self.payer_email.clone().unwrap_or_default(),
            transaction_ref: self.transaction_ref.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub customer_id: Uuid,
    pub order_ref: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// External references recorded when a ledger entry settles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSettlement {
    pub order_ref: String,
    pub payer_id: String,
    pub payer_email: String,
    pub transaction_ref: String,
}
