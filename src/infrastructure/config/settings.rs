//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. Every
//! section is optional; an empty file yields the defaults.
//!
//! # Example
//!
//! ```no_run
//! use tiltledger::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::ledger::{ClaimsConfig, LedgerConfig};
use super::logging::LoggingConfig;
use crate::error::{ConfigError, Result};
use crate::ledger::LedgerSettings;

/// Largest accepted block size; a rescan walks a whole block.
pub const MAX_BLOCK_SIZE: u32 = 1024;

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Exposure store tuning.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Claim and resolution budgets.
    #[serde(default)]
    pub claims: ClaimsConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.ledger.block_size == 0 || self.ledger.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "block_size",
                reason: format!("must be between 1 and {MAX_BLOCK_SIZE}"),
            }
            .into());
        }
        for (field, value) in [
            ("scan_budget", self.claims.scan_budget),
            ("claim_budget", self.claims.claim_budget),
            ("hard_passes", self.claims.hard_passes),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                }
                .into());
            }
        }
        if !self.logging.is_known_format() {
            return Err(ConfigError::InvalidValue {
                field: "format",
                reason: format!("unknown log format '{}'", self.logging.format),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Ledger settings derived from the `[ledger]` and `[claims]` sections.
    #[must_use]
    pub fn ledger_settings(&self) -> LedgerSettings {
        self.ledger.settings(self.claims)
    }

    /// Oracle lookups allowed per touch.
    #[must_use]
    pub const fn resolve_budget(&self) -> usize {
        self.claims.resolve_budget
    }
}
