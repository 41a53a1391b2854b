use super::models::Config;
use crate::crypto::SecretKey;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "DECRYPTBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/decryptbox.toml";
const ENV_PREFIX: &str = "DECRYPTBOX";
const ENV_SEPARATOR: &str = "__";

/// Checked in order; the first non-empty one wins
const KEY_ENV_VARS: &[&str] = &["DECRYPTBOX_AES_KEY", "AES_KEY"];

/// Path of the TOML file: `DECRYPTBOX_CONFIG` if set, else the default location
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let mut config = load_from_sources(config_path.unwrap_or_else(default_path))?;
    config.crypto.key = secret_from_env(|name| env::var(name).ok());

    Ok(config)
}

/// The AES key lives only in the environment, never in TOML
fn secret_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<SecretKey> {
    KEY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
        .map(SecretKey::from)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // DECRYPTBOX__CACHE__MAX_AGE_SECS -> cache.max_age_secs
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
