//! AES-256-CBC with a constant all-zero IV, for searchable columns.
//!
//! Identical plaintext under the same key always yields identical ciphertext,
//! so an encrypted column can be queried by equality. The price is semantic
//! security: equal values and their padded lengths are visible to anyone who
//! can read the column. There is no authentication tag; a wrong key usually
//! shows up as a padding failure, but not always.

use std::fmt;

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use common::DecryptionError;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::BLOCK_LEN;
use crate::keys::KEY_LEN;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const ZERO_IV: [u8; BLOCK_LEN] = [0u8; BLOCK_LEN];

/// Deterministic cipher keyed by the 32-byte deterministic key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DeterministicCipher {
    key: [u8; KEY_LEN],
}

impl DeterministicCipher {
    /// Create a cipher over a normalized deterministic key.
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self { key: *key }
    }

    /// PKCS#7-pad `plaintext` and encrypt it under the fixed IV.
    pub fn encrypt(&self, plaintext: &str) -> Vec<u8> {
        Aes256CbcEnc::new(&self.key.into(), &ZERO_IV.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes())
    }

    /// Reverse [`DeterministicCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// - [`DecryptionError::InvalidBlockLength`] if `ciphertext` is empty or not block aligned.
    /// - [`DecryptionError::InvalidPadding`] if PKCS#7 padding does not validate.
    /// - [`DecryptionError::InvalidUtf8`] if the plaintext is not UTF-8.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<String, DecryptionError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(DecryptionError::InvalidBlockLength);
        }
        let plaintext = Aes256CbcDec::new(&self.key.into(), &ZERO_IV.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| DecryptionError::InvalidPadding)?;
        String::from_utf8(plaintext).map_err(|_| DecryptionError::InvalidUtf8)
    }
}

impl fmt::Debug for DeterministicCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeterministicCipher([REDACTED])")
    }
}
