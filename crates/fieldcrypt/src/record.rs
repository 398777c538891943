//! Sealing and opening the encrypted fields of a JSON record.
//!
//! A [`SealManifest`] lists the encrypted fields of one record type by
//! dot-notation path. Array fields use the `[]` suffix before the dot
//! separator, e.g. `"contacts[].email"`.

use std::convert::Infallible;

use common::protocol::SealManifest;
use common::ConfigurationError;
use serde_json::Value;

use crate::field::{FieldCodec, FieldSpec, FieldValue};

/// Segments of a dot-notation field path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// Parse a dot-notation path into a list of [`PathSegment`]s.
///
/// `"contacts[].email"` → `[Key("contacts"), ArrayItem, Key("email")]`.
fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            segments.push(PathSegment::Key(key.to_owned()));
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part.to_owned()));
        }
    }
    segments
}

/// A compiled manifest: parsed paths paired with their field specs.
#[derive(Debug, Clone)]
pub struct RecordFields {
    fields: Vec<(Vec<PathSegment>, FieldSpec)>,
}

impl RecordFields {
    /// Compile every manifest entry; specs are named after their paths.
    pub fn from_manifest(manifest: &SealManifest) -> Self {
        let fields = manifest
            .fields
            .iter()
            .map(|d| (parse_path(&d.path), FieldSpec::from_descriptor(d)))
            .collect();
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Encrypt every manifest field present in `record`, in place.
///
/// Missing paths are skipped; objects and arrays at a leaf are left as they
/// are. Returns the number of leaves sealed.
///
/// # Errors
///
/// Returns the first [`ConfigurationError`] raised by the codec. The record
/// may be partially sealed in that case and must not be written.
pub fn seal_record(
    codec: &FieldCodec,
    record: &mut Value,
    fields: &RecordFields,
) -> Result<usize, ConfigurationError> {
    let mut count = 0;
    for (segments, spec) in &fields.fields {
        visit_leaves(record, segments, &mut |leaf| {
            let Some(value) = json_to_field(leaf) else {
                return Ok(());
            };
            *leaf = match codec.prepare_for_storage(&value, spec)? {
                Some(stored) => Value::String(stored),
                None => Value::Null,
            };
            count += 1;
            Ok(())
        })?;
    }
    Ok(count)
}

/// Decrypt every manifest field present in `record`, in place.
///
/// Only string leaves are touched. Values that do not decrypt are left as
/// stored. Returns the number of leaves visited.
pub fn open_record(codec: &FieldCodec, record: &mut Value, fields: &RecordFields) -> usize {
    let mut count = 0;
    for (segments, spec) in &fields.fields {
        visit_leaves(record, segments, &mut |leaf| {
            if let Value::String(stored) = leaf {
                let loaded = codec.load_from_storage(Some(stored.as_str()), spec);
                *leaf = field_to_json(loaded);
                count += 1;
            }
            Ok::<(), Infallible>(())
        })
        .unwrap_or_else(|never| match never {});
    }
    count
}

/// Walk `value` along `segments`, calling `f` on every leaf reached.
fn visit_leaves<E, F>(value: &mut Value, segments: &[PathSegment], f: &mut F) -> Result<(), E>
where
    F: FnMut(&mut Value) -> Result<(), E>,
{
    let Some((first, rest)) = segments.split_first() else {
        return f(value);
    };

    match first {
        PathSegment::Key(key) => {
            if let Value::Object(map) = value {
                if let Some(child) = map.get_mut(key) {
                    visit_leaves(child, rest, f)?;
                }
            }
        }
        PathSegment::ArrayItem => {
            if let Value::Array(arr) = value {
                for item in arr.iter_mut() {
                    visit_leaves(item, rest, f)?;
                }
            }
        }
    }
    Ok(())
}

fn json_to_field(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => Some(FieldValue::Null),
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(FieldValue::Integer(i))
            } else if let Some(u) = n.as_u64() {
                // Above i64::MAX; decimal text keeps every digit.
                Some(FieldValue::Text(u.to_string()))
            } else {
                n.as_f64().map(FieldValue::Float)
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::String(s),
        other => other
            .canonical_text()
            .map_or(Value::Null, |t| Value::String(t.into_owned())),
    }
}
