//! Tenantry Database — SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`]) and tenant-store
//!   connectors ([`RemoteStoreConnector`], [`HandleStoreConnector`])
//! - Registry and tenant-store schemas with a migration runner
//! - Error types ([`DbError`])
//! - Repository implementations for every `tenantry-core` trait

mod connection;
mod error;
mod password;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager, HandleStoreConnector, RemoteStoreConnector};
pub use error::DbError;
pub use password::hash_password;
pub use schema::{registry_schema, run_migrations, run_store_migrations, store_schema};
