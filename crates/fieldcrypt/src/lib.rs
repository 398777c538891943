//! `fieldcrypt`: transparent field-level encryption for PII columns.
//!
//! Layers, bottom-up:
//! 1. [`keys`]: process-wide key material, loaded once from [`config`].
//! 2. [`crypto`]: Fernet tokens, deterministic AES-CBC and search hashes.
//! 3. [`field`]: the per-column storage/load contract ([`FieldCodec`]).
//! 4. [`record`]: sealing and opening manifest-listed fields of JSON records.
//!
//! [`permissions`] decides what a presentation layer may show unmasked.
//!
//! # Security invariants
//!
//! - Plaintext and key bytes never appear in log fields or `Debug` output.
//! - Key buffers are zeroed when dropped.

pub mod config;
pub mod crypto;
pub mod field;
pub mod keys;
pub mod permissions;
pub mod record;

pub use common::{ConfigurationError, DecryptionError, FieldError};
pub use self::config::Config;
pub use field::{FieldCodec, FieldKind, FieldSpec, FieldValue};
pub use keys::KeyMaterial;
pub use record::{open_record, seal_record, RecordFields};
