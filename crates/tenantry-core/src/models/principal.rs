//! Authenticated session principal returned by the login resolver.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::customer::CustomerSummary;
use super::directory::UserType;
use super::pool::StoreAddress;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPrincipal {
    pub store_id: Uuid,
    pub store_address: StoreAddress,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub user_type: UserType,
    /// Present only for administrators.
    pub customer: Option<CustomerSummary>,
}
