//! Error types for the Tenantry system.
//!
//! The variants below form the taxonomy callers see. Lower layers map
//! their own errors into it; store-specific detail is logged at the
//! boundary and never carried in a user-facing variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenantryError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Tenant pool exhausted: no store available")]
    PoolExhausted,

    #[error("Store initialization failed for {store}")]
    InitializationFailure { store: String },

    #[error("Claim on {store} was released by a concurrent provisioning attempt")]
    ProvisioningSuperseded { store: String },

    #[error("Directory already contains {email}")]
    DirectoryConflict { email: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    InactiveAccount,

    #[error("Store unreachable: {store}")]
    StoreUnreachable { store: String },

    #[error("Payment not captured: {status}")]
    PaymentNotCaptured { status: String },

    #[error("Payment {order_ref} is in terminal failed state")]
    PaymentFailed { order_ref: String },

    #[error("Registry unavailable")]
    RegistryUnavailable,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TenantryError {
    /// True for the "record does not exist" case, regardless of entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TenantryError::NotFound { .. })
    }
}

pub type TenantryResult<T> = Result<T, TenantryError>;
