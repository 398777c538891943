//! Cipher primitives behind the field codec.
//!
//! This module is intentionally free of field and storage concerns. It
//! provides the low-level operations the codec composes:
//!
//! - [`fernet`]: non-deterministic authenticated encryption (Fernet tokens).
//! - [`deterministic`]: AES-256-CBC with a fixed IV, for searchable columns.
//! - [`search_hash`]: keyed SHA-256 digests for exact-match indexes.

pub mod deterministic;
pub mod fernet;
pub mod search_hash;

pub use deterministic::DeterministicCipher;
pub use fernet::FernetCipher;
pub use search_hash::search_hash;

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;
