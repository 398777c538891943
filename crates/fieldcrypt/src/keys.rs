//! [`KeyMaterial`]: the two process-wide keys used by the field codec.
//!
//! # Security invariants
//!
//! - Key bytes are zeroed when the last copy is dropped.
//! - Key bytes never appear in `Debug` output, logs or traces.

use std::fmt;

use common::ConfigurationError;
use zeroize::Zeroizing;

use crate::config::Config;

/// Byte length of the deterministic key (AES-256).
pub const KEY_LEN: usize = 32;

/// Immutable key material resolved once at startup.
///
/// - `primary` is kept exactly as configured; the authenticated cipher applies
///   its own decoding rules to it.
/// - `deterministic` is always [`KEY_LEN`] bytes, see [`normalize_key`].
#[derive(Clone)]
pub struct KeyMaterial {
    primary: Zeroizing<Vec<u8>>,
    deterministic: Zeroizing<[u8; KEY_LEN]>,
}

impl KeyMaterial {
    /// Build key material from a primary key given as text or bytes.
    ///
    /// The deterministic key defaults to the primary key until
    /// [`KeyMaterial::with_deterministic_key`] overrides it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingKey`] if `primary` is empty.
    pub fn new(primary: impl AsRef<[u8]>) -> Result<Self, ConfigurationError> {
        let primary = primary.as_ref();
        if primary.is_empty() {
            return Err(ConfigurationError::MissingKey("FERNET_KEY"));
        }
        Ok(Self {
            primary: Zeroizing::new(primary.to_vec()),
            deterministic: Zeroizing::new(normalize_key(primary)),
        })
    }

    /// Replace the deterministic key with separately configured material.
    #[must_use]
    pub fn with_deterministic_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.deterministic = Zeroizing::new(normalize_key(key.as_ref()));
        self
    }

    /// Resolve key material from validated configuration.
    ///
    /// An empty `DETERMINISTIC_ENCRYPTION_KEY` is treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingKey`] if the primary key is empty.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigurationError> {
        let keys = Self::new(cfg.fernet_key.trim())?;
        Ok(match cfg.deterministic_encryption_key.as_deref() {
            Some(det) if !det.is_empty() => keys.with_deterministic_key(det),
            _ => keys,
        })
    }

    /// Raw primary key bytes, without length normalization.
    pub fn primary_key(&self) -> &[u8] {
        &self.primary
    }

    /// Deterministic key, exactly [`KEY_LEN`] bytes.
    pub fn deterministic_key(&self) -> &[u8; KEY_LEN] {
        &self.deterministic
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Fit arbitrary key material to [`KEY_LEN`] bytes.
///
/// Shorter input is right-padded with zero bytes, longer input is truncated.
/// This is not a key-derivation function; it reproduces how existing
/// deterministic ciphertext and search hashes were keyed.
pub fn normalize_key(raw: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    let n = raw.len().min(KEY_LEN);
    key[..n].copy_from_slice(&raw[..n]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_key_is_zero_padded() {
        let key = normalize_key(b"short-key");
        assert_eq!(&key[..9], b"short-key");
        assert!(key[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn long_key_is_truncated() {
        let raw = b"cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
        assert_eq!(&normalize_key(raw), b"cw_0x689RpI-jtRR7oE8h_eQsKImvJap");
    }

    #[test]
    fn exact_length_key_is_unchanged() {
        let raw = [0x42u8; KEY_LEN];
        assert_eq!(normalize_key(&raw), raw);
    }

    #[test]
    fn deterministic_defaults_to_primary() {
        let keys = KeyMaterial::new("cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=").unwrap();
        assert_eq!(keys.deterministic_key(), b"cw_0x689RpI-jtRR7oE8h_eQsKImvJap");
        assert_eq!(keys.primary_key().len(), 44);
    }

    #[test]
    fn text_and_bytes_are_equivalent() {
        let a = KeyMaterial::new("abc").unwrap();
        let b = KeyMaterial::new(b"abc".to_vec()).unwrap();
        assert_eq!(a.primary_key(), b.primary_key());
    }

    #[test]
    fn separate_deterministic_key() {
        let keys = KeyMaterial::new("primary").unwrap().with_deterministic_key("det");
        assert_eq!(&keys.deterministic_key()[..3], b"det");
        assert_eq!(keys.primary_key(), b"primary");
    }

    #[test]
    fn empty_primary_rejected() {
        assert_eq!(
            KeyMaterial::new("").unwrap_err(),
            ConfigurationError::MissingKey("FERNET_KEY")
        );
    }

    #[test]
    fn from_config_ignores_empty_deterministic_key() {
        let cfg = Config {
            fernet_key: "primary".into(),
            deterministic_encryption_key: Some(String::new()),
            log_level: "info".into(),
        };
        let keys = KeyMaterial::from_config(&cfg).unwrap();
        assert_eq!(&keys.deterministic_key()[..7], b"primary");
    }

    #[test]
    fn key_material_redacted_in_debug() {
        let keys = KeyMaterial::new("super-secret").unwrap();
        let printed = format!("{keys:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("super-secret"));
    }
}
