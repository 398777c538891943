//! [`FieldValue`]: the runtime value of an encrypted field.

use std::borrow::Cow;

use chrono::NaiveDate;

/// Date layout used for canonical text and for parsing decrypted dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value as application code sees it, before sealing or after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No value; stored as SQL `NULL`.
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl FieldValue {
    /// `true` for [`FieldValue::Null`] and empty text: values that are never encrypted.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// The text that gets encrypted for this value, `None` for [`FieldValue::Null`].
    ///
    /// Stable across releases: integers in decimal, booleans as `True`/`False`,
    /// floats per [`float_text`], dates as `YYYY-MM-DD`.
    /// Searchable columns compare these bytes, so they must match what
    /// existing rows were sealed from.
    pub fn canonical_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            FieldValue::Integer(i) => Some(Cow::Owned(i.to_string())),
            FieldValue::Float(f) => Some(Cow::Owned(float_text(*f))),
            FieldValue::Bool(true) => Some(Cow::Borrowed("True")),
            FieldValue::Bool(false) => Some(Cow::Borrowed("False")),
            FieldValue::Date(d) => Some(Cow::Owned(d.format(DATE_FORMAT).to_string())),
        }
    }

    /// Borrow the text of a [`FieldValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Shortest round-trip text of `f`.
///
/// Positional between `1e-4` and `1e16` with at least one fractional digit
/// (`1.0`, `0.0001`, `1000000000000000.0`); scientific outside that range with
/// a signed, two-digit minimum exponent (`1e+16`, `1e-05`, `1.5e+300`).
/// Non-finite values are `inf`, `-inf` and `nan`.
pub fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. `-1.25e-7`.
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let sign = if f.is_sign_negative() { "-" } else { "" };

    if !(-4..16).contains(&exp) {
        let (lead, rest) = digits.split_at(1);
        let frac = if rest.is_empty() { String::new() } else { format!(".{rest}") };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{lead}{frac}e{exp_sign}{:02}", exp.abs());
    }

    let body = if exp < 0 {
        format!("0.{}{digits}", "0".repeat((-exp - 1) as usize))
    } else {
        let int_len = exp as usize + 1;
        if digits.len() <= int_len {
            format!("{digits}{}.0", "0".repeat(int_len - digits.len()))
        } else {
            let (int_part, frac) = digits.split_at(int_len);
            format!("{int_part}.{frac}")
        }
    };
    format!("{sign}{body}")
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i.into())
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}
