//! AES-CBC decryption of origin payloads
//!
//! - [`KeyManager`] owns the process-wide secret and imports it once
//! - [`decrypt`] turns ciphertext into plaintext with the imported key
//! - [`check_signature`] sniffs the plaintext for known image containers

mod decrypt;
mod key;
mod signature;

pub use decrypt::{BLOCK_SIZE, DecryptError, decrypt};
pub use key::{IV_LEN, KeyError, KeyHandle, KeyManager, SecretKey};
pub use signature::{FormatMismatch, ImageFormat, check_signature};

#[cfg(test)]
pub(crate) mod testing {
    use aes::{Aes128, Aes192, Aes256};
    use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

    pub const KEY: &[u8] = b"my2ecret782ecret";

    /// Encrypts the way the upstream writer does: key bytes as the AES key,
    /// the first 16 of them as the IV, PKCS#7 padding.
    pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Vec<u8> {
        let iv = &key[..16];
        match key.len() {
            16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
                .unwrap()
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
                .unwrap()
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
                .unwrap()
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            n => panic!("unsupported test key length {n}"),
        }
    }
}
