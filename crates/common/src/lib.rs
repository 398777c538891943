//! Error taxonomy and wire types shared across `fieldcrypt` crates.

pub mod error;
pub mod protocol;

pub use error::{ConfigurationError, DecryptionError, FieldError};
