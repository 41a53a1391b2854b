use super::models::Config;
use thiserror::Error;

/// One year; anything longer is not a bounded freshness window
pub const MAX_CACHE_AGE_SECS: u32 = 31_536_000;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cache.max_age_secs must be between 1 and {MAX_CACHE_AGE_SECS}, got {0}")]
    InvalidCacheMaxAge(u32),

    #[error("origin timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("origin.max_body_bytes must be positive")]
    ZeroBodyLimit,

    #[error("AES key must be 16, 24 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_cache(config)?;
    validate_origin(config)?;
    validate_key(config)?;
    Ok(())
}

fn validate_cache(config: &Config) -> Result<(), ValidationError> {
    let max_age = config.cache.max_age_secs;
    if max_age == 0 || max_age > MAX_CACHE_AGE_SECS {
        return Err(ValidationError::InvalidCacheMaxAge(max_age));
    }
    Ok(())
}

fn validate_origin(config: &Config) -> Result<(), ValidationError> {
    if config.origin.connect_timeout_ms == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout_ms",
        });
    }
    if config.origin.request_timeout_ms == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout_ms",
        });
    }
    if config.origin.max_body_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroBodyLimit);
    }
    Ok(())
}

/// A malformed key is caught here; an absent one only fails at request time
fn validate_key(config: &Config) -> Result<(), ValidationError> {
    match &config.crypto.key {
        Some(key) if !matches!(key.len(), 16 | 24 | 32) => {
            Err(ValidationError::InvalidKeyLength(key.len()))
        }
        _ => Ok(()),
    }
}
