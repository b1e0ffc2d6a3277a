//! Provisioning configuration.

use std::time::Duration;

use serde::Deserialize;

/// Where payment captures come from.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Captures go to the external payment provider.
    #[default]
    Live,
    /// Captures always succeed with synthetic references.
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Upper bound on connecting to and seeding a claimed store.
    pub init_timeout_secs: u64,
    /// Attempts a conflicting registry claim transaction gets.
    pub claim_attempts: u32,
    pub payment_mode: PaymentMode,
}

impl ProvisionConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            init_timeout_secs: 30,
            claim_attempts: 8,
            payment_mode: PaymentMode::Live,
        }
    }
}
