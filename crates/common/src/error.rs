//! Common error types shared across crates.

use thiserror::Error;

/// A schema or key configuration problem.
///
/// These are never transient: an oversize ciphertext means the column is too
/// small and needs a migration, a missing key means the process cannot start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required key is absent or empty.
    #[error("{0} is required and must not be empty")]
    MissingKey(&'static str),

    /// The primary key is not url-safe base64 of exactly 32 bytes.
    #[error("primary key must be url-safe base64 encoding 32 bytes")]
    InvalidPrimaryKey,

    /// The encrypted representation does not fit the column.
    #[error(
        "Encrypted value for '{field}' is {actual} characters, but max_length is {max_length}. \
         The original value is too long for encryption. \
         Please increase max_length to at least {actual} characters."
    )]
    EncryptedValueTooLong {
        /// Field name as declared in the field spec.
        field: String,
        /// Length of the base64 stored string.
        actual: usize,
        /// Configured storage budget.
        max_length: usize,
    },
}

/// Why a stored value could not be turned back into plaintext.
///
/// Routine on read paths: legacy plaintext rows produce these too. The field
/// adapter recovers from every variant by returning the stored value.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionError {
    /// The stored string is not valid base64.
    #[error("stored value is not valid base64")]
    InvalidBase64,

    /// The token is truncated, has the wrong version byte, or bad framing.
    #[error("token is malformed")]
    MalformedToken,

    /// HMAC verification failed: wrong key or tampered data.
    #[error("token authentication failed")]
    AuthenticationFailed,

    /// Ciphertext is empty or not a multiple of the cipher block size.
    #[error("ciphertext length is not a positive multiple of the block size")]
    InvalidBlockLength,

    /// PKCS#7 padding did not validate after decryption.
    #[error("invalid PKCS#7 padding")]
    InvalidPadding,

    /// Decrypted bytes are not UTF-8.
    #[error("decrypted bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Top-level error type for callers that surface field errors.
///
/// Variants map to process exit codes (sysexits):
/// - [`FieldError::Configuration`] → 78 (`EX_CONFIG`)
/// - [`FieldError::Decryption`] → 65 (`EX_DATAERR`)
#[derive(Debug, Error)]
pub enum FieldError {
    /// See [`ConfigurationError`].
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// See [`DecryptionError`].
    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),
}

impl FieldError {
    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            FieldError::Configuration(_) => 78,
            FieldError::Decryption(_) => 65,
        }
    }
}
