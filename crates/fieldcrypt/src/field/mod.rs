//! Field adapter layer: turns runtime values into stored strings and back.
//!
//! A [`FieldSpec`] describes one column (mode, budgets, post-decrypt
//! conversion); a single [`FieldCodec`] applies any spec.
//!
//! # Module invariants
//!
//! - Null and empty values are never encrypted.
//! - Writes fail before reaching storage when the stored string exceeds
//!   the field's `max_length`.
//! - Reads never fail: undecryptable values come back as stored.

pub mod codec;
pub mod spec;
pub mod value;

pub use codec::FieldCodec;
pub use spec::{Converter, FieldKind, FieldSpec};
pub use value::FieldValue;
