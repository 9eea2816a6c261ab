//! Issuer configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! ## Environment Variables
//! - `FACEVALUE_DB_PATH`: SQLite file (default `./facevalue_dev.db`)
//! - `FACEVALUE_ID_LENGTH`: required code length, unset for no rule
//! - `FACEVALUE_EXPIRY_DAYS`: default validity in days, unset for no expiry

use chrono::Duration;
use facevalue_core::IssuerPolicy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::pool::DbConfig;

const DEFAULT_DB_PATH: &str = "./facevalue_dev.db";

/// Issuer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// SQLite database file
    pub database_path: String,

    /// Exact code length every issued voucher must have
    pub id_length: Option<usize>,

    /// Days between a voucher's start and its default expiry
    pub expiry_days: Option<i64>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        IssuerConfig {
            database_path: DEFAULT_DB_PATH.to_string(),
            id_length: None,
            expiry_days: None,
        }
    }
}

impl IssuerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup (the environment in `load`).
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let id_length = match var("FACEVALUE_ID_LENGTH") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidValue("FACEVALUE_ID_LENGTH".to_string()))
                }
                Ok(length) => Some(length),
            },
            None => None,
        };

        let expiry_days = match var("FACEVALUE_EXPIRY_DAYS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(days) if days >= 0 => Some(days),
                _ => return Err(ConfigError::InvalidValue("FACEVALUE_EXPIRY_DAYS".to_string())),
            },
            None => None,
        };

        Ok(IssuerConfig {
            database_path: var("FACEVALUE_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            id_length,
            expiry_days,
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
    }

    /// The issuance policy this configuration describes.
    pub fn policy(&self) -> IssuerPolicy {
        IssuerPolicy::default()
            .with_id_length(self.id_length)
            .with_expiry_interval(self.expiry_days.map(Duration::days))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
