//! Tenantry Provision — turns a confirmed payment into a ready tenant
//! store.
//!
//! - [`initializer`]: seeds a freshly claimed store (roles and the first
//!   administrator), idempotently
//! - [`saga`]: the provisioning orchestrator spanning the registry and
//!   one tenant store, with compensation on failure
//! - [`capture`]: the payment-capture entry point, live or simulated

pub mod capture;
pub mod config;
pub mod initializer;
pub mod saga;

pub use capture::{CaptureOutcome, PaymentCaptureHandler, SimulatedCaptureVerifier};
pub use config::{PaymentMode, ProvisionConfig};
pub use initializer::{derive_username, initialize_store};
pub use saga::{ProvisioningService, ProvisioningStep, RECONCILIATION_TARGET};
