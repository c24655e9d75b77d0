//! Configuration management for ecorent.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::form::DurationMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "ecorent";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "ecorent.db";

/// Spreadsheet script the business pushes contracts to unless told otherwise.
pub const DEFAULT_SYNC_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbxZyzj2hH6sTlkxWbXe2TLepR8fH0rI1wNxAhgPprzTMGMkxT-EYtL2FH3aGOge3FOw/exec";

/// Time format used for configured times of day.
pub const TIME_FORMAT: &str = "%H:%M";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ECORENT_`, sections split by `__`)
/// 2. TOML config file at `~/.config/ecorent/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Sync configuration.
    pub sync: SyncConfig,
    /// Contract form behaviour.
    pub contracts: ContractsConfig,
    /// Company block printed on invoices.
    pub company: CompanyConfig,
    /// Invoice presentation.
    pub invoice: InvoiceConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/ecorent/ecorent.db`
    pub database_path: Option<PathBuf>,
}

/// Sync-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Endpoint restored when the stored setting is reset to blank.
    pub default_endpoint: String,
    /// Timeout for a single push in seconds.
    pub timeout_secs: u64,
}

/// Contract form configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Whether duration is typed in or derived from the return schedule.
    pub duration_mode: DurationMode,
    /// Return time assumed when the form has no return schedule (`HH:MM`).
    pub default_return_time: String,
}

/// Company details shown on invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyConfig {
    /// Trading name.
    pub name: String,
    /// Owner or manager.
    pub owner: String,
    /// Postal address.
    pub address: String,
    /// Contact email.
    pub email: String,
    /// Website.
    pub web: String,
}

/// Invoice presentation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceConfig {
    /// Currency symbol prefixed to amounts.
    pub currency_symbol: String,
    /// Base URL of the messaging share target.
    pub share_base_url: String,
    /// Phone of the technical support line, digits only.
    pub support_phone: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_endpoint: DEFAULT_SYNC_ENDPOINT.to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            duration_mode: DurationMode::Manual,
            default_return_time: "20:00".to_string(),
        }
    }
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: "EcoRent Mobility Solutions".to_string(),
            owner: "Sasha Kalko".to_string(),
            address: "Calle Costa Brava 1, 07610 Palma".to_string(),
            email: "info@ecorentmobility.com".to_string(),
            web: "www.ecorentmobility.com".to_string(),
        }
    }
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "€".to_string(),
            share_base_url: "https://wa.me".to_string(),
            support_phone: "34698971708".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("ECORENT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.sync.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "sync.timeout_secs must be greater than 0".to_string(),
            });
        }

        if NaiveTime::parse_from_str(&self.contracts.default_return_time, TIME_FORMAT).is_err() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "contracts.default_return_time must be HH:MM, got '{}'",
                    self.contracts.default_return_time
                ),
            });
        }

        if self.invoice.currency_symbol.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "invoice.currency_symbol cannot be empty".to_string(),
            });
        }

        if !self.invoice.share_base_url.starts_with("http") {
            return Err(Error::ConfigValidation {
                message: format!(
                    "invoice.share_base_url must be an http(s) URL, got '{}'",
                    self.invoice.share_base_url
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the push timeout as a Duration.
    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs)
    }

    /// Get the default return time, falling back to 20:00 if unparsable.
    #[must_use]
    pub fn default_return_time(&self) -> NaiveTime {
        NaiveTime::parse_from_str(&self.contracts.default_return_time, TIME_FORMAT)
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default())
    }
}
