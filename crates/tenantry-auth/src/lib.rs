//! Tenantry Auth — login resolution across the directory and tenant
//! stores, password verification and JWT credential issuance.

pub mod config;
pub mod error;
pub mod password;
pub mod resolver;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use resolver::LoginResolver;
pub use token::{AccessTokenClaims, JwtCredentialIssuer};
