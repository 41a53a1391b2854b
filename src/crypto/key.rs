use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::KeyInit;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{error, info};
use zeroize::Zeroizing;

/// Length of the CBC initialization vector (one AES block).
pub const IV_LEN: usize = 16;

/// Key import failures. Cached by [`KeyManager`]: once import fails, every
/// later call reports the same error without retrying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("no AES key configured")]
    Missing,

    #[error("invalid AES key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidLength(usize),
}

/// Raw secret bytes as provisioned. Wiped on drop, never printed.
#[derive(Clone)]
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.0.len())
    }
}

#[derive(Clone)]
pub(crate) enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

/// An imported AES-CBC key: the expanded key schedule plus the fixed IV.
///
/// The IV is the first [`IV_LEN`] bytes of the key material and is identical
/// for every message. Existing ciphertext at the origin was produced that way,
/// so the derivation cannot change without re-encrypting the whole store.
pub struct KeyHandle {
    cipher: BlockCipher,
    iv: Zeroizing<[u8; IV_LEN]>,
}

impl KeyHandle {
    /// Imports raw key material. The AES variant follows the key length.
    pub fn import(material: &[u8]) -> Result<Self, KeyError> {
        let len = material.len();
        let invalid = move |_| KeyError::InvalidLength(len);

        let cipher = match len {
            16 => BlockCipher::Aes128(Aes128::new_from_slice(material).map_err(invalid)?),
            24 => BlockCipher::Aes192(Aes192::new_from_slice(material).map_err(invalid)?),
            32 => BlockCipher::Aes256(Aes256::new_from_slice(material).map_err(invalid)?),
            _ => return Err(KeyError::InvalidLength(len)),
        };

        let mut iv = Zeroizing::new([0u8; IV_LEN]);
        iv.copy_from_slice(&material[..IV_LEN]);

        Ok(Self { cipher, iv })
    }

    pub fn algorithm(&self) -> &'static str {
        match self.cipher {
            BlockCipher::Aes128(_) => "AES-128-CBC",
            BlockCipher::Aes192(_) => "AES-192-CBC",
            BlockCipher::Aes256(_) => "AES-256-CBC",
        }
    }

    pub(crate) fn cipher(&self) -> &BlockCipher {
        &self.cipher
    }

    pub(crate) fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Owns the process-wide secret and hands out the imported [`KeyHandle`].
///
/// Import happens on the first [`get_key`](Self::get_key) call. Concurrent
/// first callers block on the same slot, so exactly one import runs and all
/// callers observe the same handle (or the same error).
pub struct KeyManager {
    secret: Option<SecretKey>,
    slot: OnceLock<Result<Arc<KeyHandle>, KeyError>>,
}

impl KeyManager {
    pub fn new(secret: Option<SecretKey>) -> Self {
        Self {
            secret,
            slot: OnceLock::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn get_key(&self) -> Result<Arc<KeyHandle>, KeyError> {
        self.slot.get_or_init(|| self.import()).clone()
    }

    fn import(&self) -> Result<Arc<KeyHandle>, KeyError> {
        let result = self
            .secret
            .as_ref()
            .ok_or(KeyError::Missing)
            .and_then(|secret| KeyHandle::import(secret.expose()))
            .map(Arc::new);

        match &result {
            Ok(handle) => info!(algorithm = handle.algorithm(), "AES key imported"),
            Err(e) => error!(error = %e, "AES key import failed; all requests will fail"),
        }

        result
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("configured", &self.is_configured())
            .field("imported", &self.slot.get().is_some())
            .finish()
    }
}
