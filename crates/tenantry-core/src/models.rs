//! Domain models for Tenantry.
//!
//! Registry-side records (customer, payment, pool entry, directory,
//! reconciliation) and tenant-store records (roles, users) are kept in
//! separate modules because they live in different databases.

pub mod customer;
pub mod directory;
pub mod payment;
pub mod pool;
pub mod principal;
pub mod provisioning;
pub mod reconciliation;
pub mod tenant;
