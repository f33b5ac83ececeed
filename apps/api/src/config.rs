//! API server configuration.
//!
//! Loaded from `RXDESK_*` environment variables with fallback to defaults.

use std::env;
use std::net::SocketAddr;

use rxdesk_core::alerts::AlertThresholds;
use rxdesk_core::{BusinessClock, DEFAULT_EXPIRING_WITHIN_DAYS, DEFAULT_LOW_STOCK_THRESHOLD};

/// Used when `RXDESK_JWT_SECRET` is unset. Never acceptable in production.
pub const DEV_JWT_SECRET: &str = "rxdesk-dev-secret-change-in-production";

/// First account created on an empty database.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,

    pub database_path: String,

    pub db_max_connections: u32,

    /// HS256 signing secret.
    pub jwt_secret: String,

    /// Token lifetime in seconds (default: 12 hours)
    pub jwt_lifetime_secs: i64,

    /// Fixed offset of the pharmacy's business day.
    pub business_clock: BusinessClock,

    pub low_stock_threshold: i64,

    pub bootstrap_admin: Option<BootstrapAdmin>,

    /// Printed on PDF reports.
    pub pharmacy_name: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let offset = var("RXDESK_BUSINESS_UTC_OFFSET", "+00:00");
        let business_clock = BusinessClock::from_offset_str(&offset)
            .map_err(|_| ConfigError::InvalidValue("RXDESK_BUSINESS_UTC_OFFSET".to_string()))?;

        let bootstrap_admin = match (
            lookup("RXDESK_BOOTSTRAP_ADMIN_EMAIL"),
            lookup("RXDESK_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: var("RXDESK_BOOTSTRAP_ADMIN_NAME", "Administrator"),
                email,
                password,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingRequired(
                    "RXDESK_BOOTSTRAP_ADMIN_PASSWORD".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingRequired(
                    "RXDESK_BOOTSTRAP_ADMIN_EMAIL".to_string(),
                ))
            }
        };

        let config = ApiConfig {
            bind_addr: var("RXDESK_BIND_ADDR", "0.0.0.0:8080")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RXDESK_BIND_ADDR".to_string()))?,

            database_path: var("RXDESK_DB_PATH", "./rxdesk.db"),

            db_max_connections: var("RXDESK_DB_MAX_CONNECTIONS", "5")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RXDESK_DB_MAX_CONNECTIONS".to_string()))?,

            jwt_secret: var("RXDESK_JWT_SECRET", DEV_JWT_SECRET),

            jwt_lifetime_secs: var("RXDESK_JWT_LIFETIME_SECS", "43200")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RXDESK_JWT_LIFETIME_SECS".to_string()))?,

            business_clock,

            low_stock_threshold: var(
                "RXDESK_LOW_STOCK_THRESHOLD",
                &DEFAULT_LOW_STOCK_THRESHOLD.to_string(),
            )
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RXDESK_LOW_STOCK_THRESHOLD".to_string()))?,

            bootstrap_admin,

            pharmacy_name: var("RXDESK_PHARMACY_NAME", "Pharmacy"),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("RXDESK_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("RXDESK_JWT_LIFETIME_SECS".to_string()));
        }
        if config.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue("RXDESK_LOW_STOCK_THRESHOLD".to_string()));
        }

        Ok(config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Default alert thresholds before query overrides.
    pub fn alert_thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            low_stock: self.low_stock_threshold,
            expiring_within_days: DEFAULT_EXPIRING_WITHIN_DAYS,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.database_path, "./rxdesk.db");
        assert_eq!(config.jwt_lifetime_secs, 43_200);
        assert_eq!(config.low_stock_threshold, 10);
        assert!(config.uses_dev_secret());
        assert!(config.bootstrap_admin.is_none());
        assert_eq!(config.business_clock.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("RXDESK_BUSINESS_UTC_OFFSET", "+05:00"),
            ("RXDESK_JWT_SECRET", "s3cret"),
            ("RXDESK_BOOTSTRAP_ADMIN_EMAIL", "admin@pharmacy.test"),
            ("RXDESK_BOOTSTRAP_ADMIN_PASSWORD", "correct horse"),
        ])
        .unwrap();
        assert_eq!(config.business_clock.offset().local_minus_utc(), 5 * 3600);
        assert!(!config.uses_dev_secret());
        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.name, "Administrator");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("RXDESK_BIND_ADDR", "nowhere")]),
            Err(ConfigError::InvalidValue(v)) if v == "RXDESK_BIND_ADDR"
        ));
        assert!(matches!(
            load(&[("RXDESK_BUSINESS_UTC_OFFSET", "+25:00")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("RXDESK_BOOTSTRAP_ADMIN_EMAIL", "a@b.c")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
