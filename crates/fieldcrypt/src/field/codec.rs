//! [`FieldCodec`]: the storage/load contract for encrypted columns.
//!
//! # Fail-open reads
//!
//! Decryption is an explicit `Result` internally ([`FieldCodec::try_decrypt`]).
//! The two read entry points, [`FieldCodec::load_from_storage`] and
//! [`FieldCodec::coerce_to_value`], are the only places that collapse a
//! [`DecryptionError`] into "return what was stored". This lets legacy
//! plaintext rows coexist with encrypted ones, at the cost of not being able
//! to tell corrupted ciphertext from a value that was never encrypted.

use std::{borrow::Cow, fmt, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{ConfigurationError, DecryptionError};
use tracing::{error, warn};

use super::spec::FieldSpec;
use super::value::FieldValue;
use crate::crypto::{search_hash, DeterministicCipher, FernetCipher};
use crate::keys::{KeyMaterial, KEY_LEN};

struct Ciphers {
    fernet: FernetCipher,
    deterministic: DeterministicCipher,
    hash_key: zeroize::Zeroizing<[u8; KEY_LEN]>,
}

/// Encrypts values for storage and decrypts them on load.
///
/// Cheap to clone: all clones share the same immutable cipher state, so one
/// codec can serve every field and every thread of the process.
#[derive(Clone)]
pub struct FieldCodec {
    inner: Arc<Ciphers>,
}

impl fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldCodec([REDACTED])")
    }
}

impl FieldCodec {
    /// Build a codec from resolved key material.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidPrimaryKey`] if the primary key
    /// is not a valid Fernet key. Call this at startup so a bad key fails fast.
    pub fn new(keys: &KeyMaterial) -> Result<Self, ConfigurationError> {
        Ok(Self {
            inner: Arc::new(Ciphers {
                fernet: FernetCipher::new(keys.primary_key())?,
                deterministic: DeterministicCipher::new(keys.deterministic_key()),
                hash_key: zeroize::Zeroizing::new(*keys.deterministic_key()),
            }),
        })
    }

    /// Encrypt `value` into the string that is written to the column.
    ///
    /// - `Null` → `None`, empty text → `Some("")`: "no value" is never encrypted.
    /// - Other values are encrypted via their canonical text form.
    /// - Searchable fields use deterministic encryption, others Fernet.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EncryptedValueTooLong`] if the stored
    /// string would exceed the field's storage budget. This is a schema
    /// problem: retrying will not help, the column needs to grow.
    pub fn prepare_for_storage(
        &self,
        value: &FieldValue,
        spec: &FieldSpec,
    ) -> Result<Option<String>, ConfigurationError> {
        let plaintext = match value.canonical_text() {
            None => return Ok(None),
            Some(text) if text.is_empty() => return Ok(Some(String::new())),
            Some(text) => text,
        };

        let stored = self.seal(&plaintext, spec.is_searchable());

        if let Some(max_length) = spec.storage_max_length() {
            if stored.len() > max_length {
                let err = ConfigurationError::EncryptedValueTooLong {
                    field: spec.name().to_owned(),
                    actual: stored.len(),
                    max_length,
                };
                error!(field = %spec.name(), actual = stored.len(), max_length, "{err}");
                return Err(err);
            }
        }
        Ok(Some(stored))
    }

    /// Decrypt a stored column value.
    ///
    /// `None` → `Null` and `""` → empty text, unchanged. On any decryption
    /// failure the stored string is returned as text and a warning naming
    /// the column is logged.
    pub fn load_from_storage(&self, stored: Option<&str>, spec: &FieldSpec) -> FieldValue {
        let stored = match stored {
            None => return FieldValue::Null,
            Some(s) if s.is_empty() => return FieldValue::Text(String::new()),
            Some(s) => s,
        };
        match self.try_decrypt(stored, spec) {
            Ok(plaintext) => spec.convert(plaintext),
            Err(e) => {
                warn!(
                    column = %spec.column_name(),
                    error = %e,
                    "failed to decrypt stored value; returning it unchanged"
                );
                FieldValue::Text(stored.to_owned())
            }
        }
    }

    /// Normalise a value that may already be decrypted or may still be stored text.
    ///
    /// Values already of the field kind's runtime type pass through
    /// unchanged. Anything else is decrypted via its canonical text; on
    /// failure that text is converted as if it were plaintext.
    pub fn coerce_to_value(&self, raw: FieldValue, spec: &FieldSpec) -> FieldValue {
        if raw.is_empty() || spec.kind().accepts(&raw) {
            return raw;
        }
        let Some(text) = raw.canonical_text().map(|t| t.into_owned()) else {
            return raw;
        };
        match self.try_decrypt(&text, spec) {
            Ok(plaintext) => spec.convert(plaintext),
            Err(e) => {
                warn!(
                    column = %spec.column_name(),
                    error = %e,
                    "failed to decrypt value during conversion; treating it as plaintext"
                );
                spec.convert(text)
            }
        }
    }

    /// Decrypt a stored string with the mode `spec` selects, without fallback.
    ///
    /// # Errors
    ///
    /// [`DecryptionError::InvalidBase64`] if `stored` is not standard base64,
    /// otherwise whatever the selected cipher reports.
    ///
    /// ASCII whitespace is ignored, so line-wrapped rows still decrypt.
    pub fn try_decrypt(&self, stored: &str, spec: &FieldSpec) -> Result<String, DecryptionError> {
        let compact: Cow<'_, str> = if stored.bytes().any(|b| b.is_ascii_whitespace()) {
            Cow::Owned(stored.chars().filter(|c| !c.is_ascii_whitespace()).collect())
        } else {
            Cow::Borrowed(stored)
        };
        let raw = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| DecryptionError::InvalidBase64)?;
        if spec.is_searchable() {
            self.inner.deterministic.decrypt(&raw)
        } else {
            self.inner.fernet.decrypt(&raw)
        }
    }

    /// Keyed search digest of `value`'s canonical text; `None` for null or empty.
    pub fn search_hash(&self, value: &FieldValue) -> Option<String> {
        let text = value.canonical_text()?;
        search_hash(&self.inner.hash_key, Some(text.as_ref()))
    }

    fn seal(&self, plaintext: &str, searchable: bool) -> String {
        let ciphertext = if searchable {
            self.inner.deterministic.encrypt(plaintext)
        } else {
            self.inner.fernet.encrypt(plaintext)
        };
        STANDARD.encode(ciphertext)
    }
}
