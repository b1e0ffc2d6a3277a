//! Tenantry Core — domain models, error taxonomy, and the repository
//! and collaborator traits shared by every crate.
//!
//! This crate has no storage dependency. The registry and tenant-store
//! implementations live in `tenantry-db`; the saga and login flows are
//! generic over the traits defined here.

pub mod collaborator;
pub mod error;
pub mod models;
pub mod repository;
