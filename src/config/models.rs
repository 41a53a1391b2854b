use crate::crypto::SecretKey;
use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Outbound requests to the origin store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Largest encrypted body we are willing to buffer
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_redirects: default_max_redirects(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize::mib(32)
}

/// Cache-Control policy for served images
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
        }
    }
}

fn default_max_age_secs() -> u32 {
    600
}

/// Decryption settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CryptoConfig {
    /// Sniff decrypted bytes for the expected image signature (log-only)
    #[serde(default = "default_validate_signatures")]
    pub validate_signatures: bool,
    /// AES key (loaded from environment, never from the config file)
    #[serde(skip)]
    pub key: Option<SecretKey>,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            validate_signatures: default_validate_signatures(),
            key: None,
        }
    }
}

fn default_validate_signatures() -> bool {
    true
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Default tracing filter; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}
