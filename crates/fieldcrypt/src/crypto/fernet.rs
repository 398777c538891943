//! Fernet tokens: AES-128-CBC + HMAC-SHA256 with an embedded timestamp.
//!
//! A fresh random IV is drawn for every token, so identical plaintext never
//! produces identical output. Tokens are byte-compatible with other Fernet
//! implementations sharing the same key.
//!
//! # Token format
//!
//! ```text
//! base64url( 0x80 | timestamp:u64be | iv:16 | ciphertext | hmac-sha256:32 )
//! ```
//!
//! The HMAC covers everything before it and is checked before any decryption.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use aes::Aes128;
use base64::{
    alphabet,
    engine::{general_purpose::URL_SAFE, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use common::{ConfigurationError, DecryptionError};
use hmac::{digest::Key, Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::BLOCK_LEN;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Version byte at the start of every token.
pub const VERSION: u8 = 0x80;

/// Decoded length of a Fernet key.
pub const FERNET_KEY_LEN: usize = 32;

const HALF_KEY_LEN: usize = FERNET_KEY_LEN / 2;
const TIMESTAMP_LEN: usize = 8;
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + BLOCK_LEN;
const TAG_LEN: usize = 32;
const MIN_TOKEN_LEN: usize = HEADER_LEN + BLOCK_LEN + TAG_LEN;

/// Url-safe alphabet that accepts tokens and keys with or without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Authenticated, non-deterministic cipher keyed by a Fernet key.
///
/// Both key halves are held as plain arrays and wiped on drop. MAC state is
/// derived per call and never stored.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FernetCipher {
    signing_key: [u8; HALF_KEY_LEN],
    encryption_key: [u8; HALF_KEY_LEN],
}

impl FernetCipher {
    /// Build a cipher from a Fernet key: url-safe base64 of 32 bytes.
    ///
    /// The first half of the decoded key signs, the second half encrypts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidPrimaryKey`] if `key` does not
    /// decode to exactly [`FERNET_KEY_LEN`] bytes.
    pub fn new(key: &[u8]) -> Result<Self, ConfigurationError> {
        let mut raw = URL_SAFE_LENIENT
            .decode(key)
            .map_err(|_| ConfigurationError::InvalidPrimaryKey)?;
        if raw.len() != FERNET_KEY_LEN {
            raw.zeroize();
            return Err(ConfigurationError::InvalidPrimaryKey);
        }
        let mut signing_key = [0u8; HALF_KEY_LEN];
        let mut encryption_key = [0u8; HALF_KEY_LEN];
        signing_key.copy_from_slice(&raw[..HALF_KEY_LEN]);
        encryption_key.copy_from_slice(&raw[HALF_KEY_LEN..]);
        raw.zeroize();
        Ok(Self {
            signing_key,
            encryption_key,
        })
    }

    /// Fresh HMAC state keyed by the signing half.
    ///
    /// HMAC zero-pads short keys to the hash block size, so the padded key
    /// below authenticates identically to the 16-byte signing key.
    fn mac(&self) -> HmacSha256 {
        let mut key = Key::<HmacSha256>::default();
        key[..HALF_KEY_LEN].copy_from_slice(&self.signing_key);
        let mac = <HmacSha256 as Mac>::new(&key);
        key.as_mut_slice().zeroize();
        mac
    }

    /// Generate a fresh random key in the textual form [`FernetCipher::new`] accepts.
    pub fn generate_key() -> String {
        let mut key = [0u8; FERNET_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        let encoded = URL_SAFE.encode(key);
        key.zeroize();
        encoded
    }

    /// Encrypt `plaintext` into an ASCII token.
    ///
    /// A random IV is generated per call via the OS CSPRNG and the current
    /// UNIX time is embedded.
    pub fn encrypt(&self, plaintext: &str) -> Vec<u8> {
        let mut iv = [0u8; BLOCK_LEN];
        OsRng.fill_bytes(&mut iv);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.encrypt_with_parts(plaintext.as_bytes(), now, iv)
    }

    pub(crate) fn encrypt_with_parts(
        &self,
        plaintext: &[u8],
        timestamp: u64,
        iv: [u8; BLOCK_LEN],
    ) -> Vec<u8> {
        let ciphertext = Aes128CbcEnc::new(&self.encryption_key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut data = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
        data.push(VERSION);
        data.extend_from_slice(&timestamp.to_be_bytes());
        data.extend_from_slice(&iv);
        data.extend_from_slice(&ciphertext);

        let mut mac = self.mac();
        mac.update(&data);
        data.extend_from_slice(&mac.finalize().into_bytes());

        URL_SAFE.encode(data).into_bytes()
    }

    /// Decrypt a token produced by [`FernetCipher::encrypt`].
    ///
    /// No TTL is applied: tokens of any age are accepted.
    ///
    /// # Errors
    ///
    /// - [`DecryptionError::MalformedToken`] for bad base64, short tokens or a wrong version byte.
    /// - [`DecryptionError::AuthenticationFailed`] for a wrong key or tampered data.
    /// - [`DecryptionError::InvalidBlockLength`] / [`DecryptionError::InvalidPadding`] for a bad body.
    /// - [`DecryptionError::InvalidUtf8`] if the plaintext is not UTF-8.
    pub fn decrypt(&self, token: &[u8]) -> Result<String, DecryptionError> {
        let data = self.verify(token)?;
        let iv = &data[1 + TIMESTAMP_LEN..HEADER_LEN];
        let ciphertext = &data[HEADER_LEN..data.len() - TAG_LEN];
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(DecryptionError::InvalidBlockLength);
        }

        let plaintext = Aes128CbcDec::new_from_slices(&self.encryption_key, iv)
            .map_err(|_| DecryptionError::MalformedToken)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| DecryptionError::InvalidPadding)?;

        String::from_utf8(plaintext).map_err(|_| DecryptionError::InvalidUtf8)
    }

    /// Return the UNIX timestamp a token was created at.
    ///
    /// The token is authenticated first; an unauthenticated timestamp is never returned.
    ///
    /// # Errors
    ///
    /// Same framing and authentication errors as [`FernetCipher::decrypt`].
    pub fn extract_timestamp(&self, token: &[u8]) -> Result<u64, DecryptionError> {
        let data = self.verify(token)?;
        let mut ts = [0u8; TIMESTAMP_LEN];
        ts.copy_from_slice(&data[1..1 + TIMESTAMP_LEN]);
        Ok(u64::from_be_bytes(ts))
    }

    /// Decode the token, check framing and verify the HMAC in constant time.
    fn verify(&self, token: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let data = URL_SAFE_LENIENT
            .decode(token)
            .map_err(|_| DecryptionError::MalformedToken)?;
        if data.len() < MIN_TOKEN_LEN || data[0] != VERSION {
            return Err(DecryptionError::MalformedToken);
        }
        let (signed, tag) = data.split_at(data.len() - TAG_LEN);
        let mut mac = self.mac();
        mac.update(signed);
        mac.verify_slice(tag)
            .map_err(|_| DecryptionError::AuthenticationFailed)?;
        Ok(data)
    }
}

impl fmt::Debug for FernetCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FernetCipher([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published Fernet test vector.
    const SPEC_KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
    const SPEC_TOKEN: &str = "gAAAAAAdwJ6wAAECAwQFBgcICQoLDA0ODy021cpGVWKZ_eEwCGM4BLLF_5CV9dOPmrhuVUPgJobwOz7JcbmrR64jVmpU4IwqDA==";
    const SPEC_TIMESTAMP: u64 = 499_162_800;

    fn spec_cipher() -> FernetCipher {
        FernetCipher::new(SPEC_KEY.as_bytes()).unwrap()
    }

    fn spec_iv() -> [u8; BLOCK_LEN] {
        let mut iv = [0u8; BLOCK_LEN];
        for (i, b) in iv.iter_mut().enumerate() {
            *b = i as u8;
        }
        iv
    }

    #[test]
    fn matches_published_vector() {
        let token = spec_cipher().encrypt_with_parts(b"hello", SPEC_TIMESTAMP, spec_iv());
        assert_eq!(token, SPEC_TOKEN.as_bytes());
    }

    #[test]
    fn decrypts_published_vector() {
        let cipher = spec_cipher();
        assert_eq!(cipher.decrypt(SPEC_TOKEN.as_bytes()).unwrap(), "hello");
        assert_eq!(
            cipher.extract_timestamp(SPEC_TOKEN.as_bytes()).unwrap(),
            SPEC_TIMESTAMP
        );
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let cipher = spec_cipher();
        let token = cipher.encrypt("123-45-6789");
        assert_eq!(cipher.decrypt(&token).unwrap(), "123-45-6789");
    }

    #[test]
    fn repeated_encryption_differs() {
        let cipher = spec_cipher();
        let a = cipher.encrypt("same input");
        let b = cipher.encrypt("same input");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let cipher = spec_cipher();
        let token = cipher.encrypt("");
        assert_eq!(cipher.decrypt(&token).unwrap(), "");
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let other = FernetCipher::new(FernetCipher::generate_key().as_bytes()).unwrap();
        let token = spec_cipher().encrypt("secret");
        assert_eq!(
            other.decrypt(&token).unwrap_err(),
            DecryptionError::AuthenticationFailed
        );
    }

    #[test]
    fn tampered_token_fails_authentication() {
        let cipher = spec_cipher();
        let token = cipher.encrypt("tamper me");
        let mut raw = URL_SAFE.decode(&token).unwrap();
        // Flip a byte in the ciphertext body.
        raw[HEADER_LEN] ^= 0xFF;
        let tampered = URL_SAFE.encode(raw);
        assert_eq!(
            cipher.decrypt(tampered.as_bytes()).unwrap_err(),
            DecryptionError::AuthenticationFailed
        );
    }

    #[test]
    fn rejects_wrong_version_byte() {
        let cipher = spec_cipher();
        let mut raw = URL_SAFE.decode(SPEC_TOKEN).unwrap();
        raw[0] = 0x81;
        let token = URL_SAFE.encode(raw);
        assert_eq!(
            cipher.decrypt(token.as_bytes()).unwrap_err(),
            DecryptionError::MalformedToken
        );
    }

    #[test]
    fn rejects_short_and_non_base64_tokens() {
        let cipher = spec_cipher();
        assert_eq!(
            cipher.decrypt(b"gAAAAAA").unwrap_err(),
            DecryptionError::MalformedToken
        );
        assert_eq!(
            cipher.decrypt(b"not a token!!").unwrap_err(),
            DecryptionError::MalformedToken
        );
    }

    #[test]
    fn accepts_unpadded_token() {
        let cipher = spec_cipher();
        let unpadded = SPEC_TOKEN.trim_end_matches('=');
        assert_eq!(cipher.decrypt(unpadded.as_bytes()).unwrap(), "hello");
    }

    #[test]
    fn zeroize_wipes_signing_key() {
        let mut wiped = spec_cipher();
        wiped.zeroize();
        let token = wiped.encrypt("after wipe");
        assert_eq!(
            spec_cipher().decrypt(&token).unwrap_err(),
            DecryptionError::AuthenticationFailed
        );
        assert_eq!(
            FernetCipher::new(URL_SAFE.encode([0u8; FERNET_KEY_LEN]).as_bytes())
                .unwrap()
                .decrypt(&token)
                .unwrap(),
            "after wipe"
        );
    }

    #[test]
    fn invalid_key_rejected() {
        assert_eq!(
            FernetCipher::new(b"too-short").unwrap_err(),
            ConfigurationError::InvalidPrimaryKey
        );
        // 32 ASCII bytes, but not base64 of 32 bytes.
        assert!(FernetCipher::new(&[b'a'; 32]).is_err());
    }

    #[test]
    fn generated_key_is_usable() {
        let key = FernetCipher::generate_key();
        assert_eq!(key.len(), 44);
        let cipher = FernetCipher::new(key.as_bytes()).unwrap();
        let token = cipher.encrypt("x");
        assert_eq!(cipher.decrypt(&token).unwrap(), "x");
    }

    #[test]
    fn cipher_redacted_in_debug() {
        assert!(format!("{:?}", spec_cipher()).contains("REDACTED"));
    }
}
