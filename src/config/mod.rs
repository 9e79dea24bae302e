use std::env;

use serde::{Deserialize, Serialize};

/// Site-wide settings an administrator may tune from the back office.
///
/// `payment_timeout_hours` drives the payment deadline window applied when
/// an application is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSettings {
    pub site_name: String,
    pub support_email: String,
    pub default_currency: String,
    pub payment_timeout_hours: i64,
    pub maintenance_mode: bool,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            site_name: "E-Visa Portal".to_string(),
            support_email: "support@evisa.example.com".to_string(),
            default_currency: "USD".to_string(),
            payment_timeout_hours: 3,
            maintenance_mode: false,
        }
    }
}

impl PortalSettings {
    /// Load settings from the environment, falling back to the demo
    /// defaults for anything unset.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let payment_timeout_hours = match env::var("EVISA_PAYMENT_TIMEOUT_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::InvalidPaymentTimeout { value: raw })?,
            Err(_) => defaults.payment_timeout_hours,
        };

        let maintenance_mode = env::var("EVISA_MAINTENANCE_MODE")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on"))
            .unwrap_or(defaults.maintenance_mode);

        Ok(Self {
            site_name: env::var("EVISA_SITE_NAME").unwrap_or(defaults.site_name),
            support_email: env::var("EVISA_SUPPORT_EMAIL").unwrap_or(defaults.support_email),
            default_currency: env::var("EVISA_DEFAULT_CURRENCY").unwrap_or(defaults.default_currency),
            payment_timeout_hours,
            maintenance_mode,
        })
    }

    /// Log filter used when the process does not provide `RUST_LOG`.
    pub fn log_level() -> String {
        env::var("EVISA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
    }
}

/// Errors raised while reading settings from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid EVISA_PAYMENT_TIMEOUT_HOURS '{value}': expected a positive hour count")]
    InvalidPaymentTimeout { value: String },
}
