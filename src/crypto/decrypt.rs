use cbc::cipher::{
    BlockCipher as CipherCore, BlockDecryptMut, BlockSizeUser, InnerIvInit, block_padding::Pkcs7,
    consts::U16,
};
use thiserror::Error;

use super::key::{BlockCipher, KeyHandle};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("ciphertext length {len} is not a positive multiple of {BLOCK_SIZE}")]
    Misaligned { len: usize },

    #[error("bad padding after decryption (wrong key or corrupt ciphertext)")]
    Padding,
}

/// Decrypts an AES-CBC, PKCS#7 padded buffer with the handle's key and fixed IV.
///
/// Misaligned input is rejected before the cipher runs. Nothing is returned
/// unless the whole buffer decrypts and unpads cleanly.
pub fn decrypt(ciphertext: &[u8], key: &KeyHandle) -> Result<Vec<u8>, DecryptError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(DecryptError::Misaligned {
            len: ciphertext.len(),
        });
    }

    let iv = aes::Block::from(*key.iv());
    match key.cipher() {
        BlockCipher::Aes128(c) => cbc_decrypt(c.clone(), &iv, ciphertext),
        BlockCipher::Aes192(c) => cbc_decrypt(c.clone(), &iv, ciphertext),
        BlockCipher::Aes256(c) => cbc_decrypt(c.clone(), &iv, ciphertext),
    }
}

fn cbc_decrypt<C>(cipher: C, iv: &aes::Block, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError>
where
    C: CipherCore + BlockDecryptMut + BlockSizeUser<BlockSize = U16>,
{
    cbc::Decryptor::<C>::inner_iv_init(cipher, iv)
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| DecryptError::Padding)
}
