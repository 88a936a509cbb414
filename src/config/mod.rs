//! Configuration management for keepwarm
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use keepwarm::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Keeping warm: {}", config.backend.base_url);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `KEEPWARM__<section>__<key>`
//!
//! Examples:
//! - `KEEPWARM__BACKEND__BASE_URL=https://api.example.com`
//! - `KEEPWARM__PINGER__INTERVAL_MS=600000`
//! - `KEEPWARM__DIAGNOSTICS__ENABLED=true`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/keepwarm.toml`.
//! This can be overridden using the `KEEPWARM_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    BackendConfig, Config, DiagnosticsConfig, PingerConfig, ServerConfig, StartupConfig,
    WarmerConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`KEEPWARM__*`)
    /// 2. TOML file (default: `config/keepwarm.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
