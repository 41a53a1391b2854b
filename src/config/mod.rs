//! Configuration management for DecryptBox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use decryptbox::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `DECRYPTBOX__<section>__<key>`
//!
//! Examples:
//! - `DECRYPTBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `DECRYPTBOX__CACHE__MAX_AGE_SECS=3600`
//! - `DECRYPTBOX__ORIGIN__MAX_BODY_BYTES=64MB`
//!
//! The AES key is a secret and is only read from `DECRYPTBOX_AES_KEY`
//! (or `AES_KEY`), never from the file.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/decryptbox.toml`.
//! This can be overridden using the `DECRYPTBOX_CONFIG` environment variable
//! or the `--config` CLI flag.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use crate::humanize::ByteSize;
pub use models::{CacheConfig, Config, CryptoConfig, OriginConfig, ServerConfig, TelemetryConfig};
pub use validation::{MAX_CACHE_AGE_SECS, ValidationError};

use std::path::PathBuf;
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
    /// `path` overrides `DECRYPTBOX_CONFIG` and the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (cache window, timeouts, key length)
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, without secrets
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
