//! Wire types exchanged between the library and its callers.
//!
//! These types are serialised as JSON: field manifests are read from disk by
//! the batch tool, and batch summaries are emitted as structured log lines.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field manifests
// ---------------------------------------------------------------------------

/// Storage flavour of an encrypted field.
///
/// Each flavour carries its own default storage budget; see
/// [`FieldType::default_max_length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Short text stored in a VARCHAR column.
    Char,
    /// Unbounded text.
    Text,
    /// E-mail address stored in a VARCHAR column.
    Email,
    /// Calendar date (`YYYY-MM-DD`) stored in a VARCHAR column.
    Date,
}

impl FieldType {
    /// Default `max_length` of the encrypted column, if the flavour has one.
    pub fn default_max_length(self) -> Option<usize> {
        match self {
            FieldType::Char | FieldType::Email => Some(255),
            FieldType::Date => Some(180),
            FieldType::Text => None,
        }
    }
}

/// One encrypted field of a record, addressed by a dot-notation path.
///
/// Array elements are expanded with a `[]` suffix, e.g. `"contacts[].email"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Dot-notation path of the field inside the record.
    pub path: String,
    /// Storage flavour.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Use deterministic encryption so the column supports equality lookups.
    #[serde(default)]
    pub searchable: bool,
    /// Budget of the encrypted representation. Defaults per [`FieldType`].
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Budget of the plaintext, for form validation only.
    #[serde(default)]
    pub original_max_length: Option<usize>,
}

/// The set of encrypted fields of one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealManifest {
    /// Fields to seal or open, applied in order.
    pub fields: Vec<FieldDescriptor>,
}

// ---------------------------------------------------------------------------
// Batch summary
// ---------------------------------------------------------------------------

/// Counters reported at the end of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records read from the input stream.
    pub records: usize,
    /// Field values transformed across all records.
    pub fields: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_from_json_applies_defaults() {
        let json = r#"{
            "fields": [
                {"path": "email", "type": "email", "searchable": true},
                {"path": "contacts[].phone", "type": "char", "max_length": 300}
            ]
        }"#;
        let m: SealManifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.fields.len(), 2);
        assert_eq!(m.fields[0].field_type, FieldType::Email);
        assert!(m.fields[0].searchable);
        assert_eq!(m.fields[0].max_length, None);
        assert!(!m.fields[1].searchable);
        assert_eq!(m.fields[1].max_length, Some(300));
    }

    #[test]
    fn unknown_field_type_rejected() {
        let json = r#"{"fields": [{"path": "x", "type": "blob"}]}"#;
        assert!(serde_json::from_str::<SealManifest>(json).is_err());
    }

    #[test]
    fn default_budgets() {
        assert_eq!(FieldType::Char.default_max_length(), Some(255));
        assert_eq!(FieldType::Email.default_max_length(), Some(255));
        assert_eq!(FieldType::Date.default_max_length(), Some(180));
        assert_eq!(FieldType::Text.default_max_length(), None);
    }

    #[test]
    fn batch_summary_json_shape() {
        let s = BatchSummary { records: 3, fields: 7 };
        assert_eq!(
            serde_json::to_value(&s).unwrap(),
            serde_json::json!({"records": 3, "fields": 7})
        );
    }
}
