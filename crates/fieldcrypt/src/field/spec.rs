//! [`FieldSpec`]: per-field configuration for the codec.

use chrono::NaiveDate;
use common::protocol::{FieldDescriptor, FieldType};

use super::value::{FieldValue, DATE_FORMAT};

/// Post-decrypt conversion from plaintext to a runtime value.
pub type Converter = fn(String) -> FieldValue;

/// Runtime flavour of an encrypted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Date,
}

impl FieldKind {
    /// The default post-decrypt conversion for this kind.
    ///
    /// Text and e-mail are identity conversions. Dates parse `YYYY-MM-DD`
    /// and keep anything else as text.
    pub fn converter(self) -> Converter {
        match self {
            FieldKind::Text | FieldKind::Email => FieldValue::Text,
            FieldKind::Date => parse_date,
        }
    }

    /// Whether `value` already has this kind's runtime type.
    pub fn accepts(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldKind::Text | FieldKind::Email, FieldValue::Text(_))
                | (FieldKind::Date, FieldValue::Date(_))
        )
    }
}

fn parse_date(s: String) -> FieldValue {
    match NaiveDate::parse_from_str(&s, DATE_FORMAT) {
        Ok(d) => FieldValue::Date(d),
        Err(_) => FieldValue::Text(s),
    }
}

/// Configuration of one encrypted field.
///
/// Two independent length budgets apply:
/// - `max_length` bounds the *stored* base64 string and is enforced on write;
/// - `original_max_length` bounds the plaintext and is only advertised to
///   form validation through [`FieldSpec::form_max_length`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    column: Option<String>,
    kind: FieldKind,
    searchable: bool,
    max_length: Option<usize>,
    original_max_length: Option<usize>,
    converter: Converter,
}

impl FieldSpec {
    fn with_kind(name: impl Into<String>, kind: FieldKind, max_length: Option<usize>) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind,
            searchable: false,
            max_length,
            original_max_length: None,
            converter: kind.converter(),
        }
    }

    /// Short text in a VARCHAR column; `max_length` defaults to 255.
    pub fn char(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Text, FieldType::Char.default_max_length())
    }

    /// Unbounded text; no storage budget unless one is set.
    pub fn text(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Text, FieldType::Text.default_max_length())
    }

    /// E-mail address; `max_length` defaults to 255.
    pub fn email(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Email, FieldType::Email.default_max_length())
    }

    /// Calendar date stored as text; `max_length` defaults to 180.
    pub fn date(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Date, FieldType::Date.default_max_length())
    }

    /// Build a spec from a manifest entry, named after its path.
    pub fn from_descriptor(d: &FieldDescriptor) -> Self {
        let base = match d.field_type {
            FieldType::Char => Self::char(d.path.as_str()),
            FieldType::Text => Self::text(d.path.as_str()),
            FieldType::Email => Self::email(d.path.as_str()),
            FieldType::Date => Self::date(d.path.as_str()),
        };
        let base = base.searchable(d.searchable);
        let base = match d.max_length {
            Some(n) => base.max_length(n),
            None => base,
        };
        match d.original_max_length {
            Some(n) => base.original_max_length(n),
            None => base,
        }
    }

    /// Use deterministic encryption so the column supports equality lookups.
    #[must_use]
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Set the storage budget of the encrypted representation.
    #[must_use]
    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    /// Remove the storage budget.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max_length = None;
        self
    }

    /// Set the plaintext budget used by form validation.
    #[must_use]
    pub fn original_max_length(mut self, n: usize) -> Self {
        self.original_max_length = Some(n);
        self
    }

    /// Name of the database column, for diagnostics. Defaults to the field name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Replace the post-decrypt conversion.
    #[must_use]
    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn storage_max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Plaintext limit a form should enforce, if any. Never checked on write.
    pub fn form_max_length(&self) -> Option<usize> {
        self.original_max_length
    }

    pub(crate) fn convert(&self, plaintext: String) -> FieldValue {
        (self.converter)(plaintext)
    }
}
