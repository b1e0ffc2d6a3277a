//! Operator configuration.
//!
//! Read from an optional TOML file, then overridden by environment
//! variables prefixed `TENANTRY__` with `__` between sections, e.g.
//! `TENANTRY__DB__URL` or `TENANTRY__PROVISION__PAYMENT_MODE=simulated`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tenantry_auth::AuthConfig;
use tenantry_db::DbConfig;
use tenantry_provision::ProvisionConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/tenantry";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub provision: ProvisionConfig,
}

impl AppConfig {
    /// Load from `path` (extension optional, file optional) plus the
    /// environment.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TENANTRY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use tenantry_provision::PaymentMode;

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load("config/does-not-exist").unwrap();
        assert_eq!(config.db.namespace, "tenantry");
        assert_eq!(config.auth.access_token_lifetime_secs, 900);
        assert_eq!(config.provision.payment_mode, PaymentMode::Live);
    }

    #[test]
    fn toml_sections_are_read() {
        let toml = r#"
            [db]
            url = "db.internal:8000"

            [provision]
            init_timeout_secs = 5
            payment_mode = "simulated"
        "#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.db.url, "db.internal:8000");
        assert_eq!(config.db.database, "registry");
        assert_eq!(config.provision.init_timeout_secs, 5);
        assert_eq!(config.provision.payment_mode, PaymentMode::Simulated);
        assert_eq!(config.provision.claim_attempts, 8);
    }
}
