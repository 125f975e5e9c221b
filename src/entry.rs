//! Parsed log entries and the numeric field policy.
//!
//! An `Entry` is produced upstream (by whatever parses the log lines) and
//! handed to reducers through a channel. Reducers only read it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EntryError;

/// Field name to raw string value.
pub type Fields = HashMap<String, String>;

/// One parsed record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry {
    fields: Fields,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: Fields) -> Self {
        Self { fields }
    }

    /// Raw value of a field.
    pub fn field(&self, name: &str) -> Result<&str, EntryError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| EntryError::MissingField(name.to_string()))
    }

    /// Value of a field read as a 64-bit float.
    ///
    /// A missing field and an unparsable value are both errors; callers that
    /// aggregate treat either one as a zero contribution.
    pub fn float_field(&self, name: &str) -> Result<f64, EntryError> {
        parse_float(self.field(name)?)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Fields> for Entry {
    fn from(fields: Fields) -> Self {
        Self::with_fields(fields)
    }
}

impl<K, V> FromIterator<(K, V)> for Entry
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parse a field value as a decimal or scientific 64-bit float.
///
/// Accepts an optional sign and the `inf`/`infinity`/`nan` literals. A finite
/// literal that overflows to infinity is rejected. Whitespace is not trimmed.
pub fn parse_float(value: &str) -> Result<f64, EntryError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| EntryError::InvalidFloat(value.to_string()))?;

    if parsed.is_infinite() && !is_infinity_literal(value) {
        return Err(EntryError::OutOfRange(value.to_string()));
    }
    Ok(parsed)
}

fn is_infinity_literal(value: &str) -> bool {
    value
        .trim_start_matches(['+', '-'])
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case("inf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let entry: Entry = [("status", "200")].into_iter().collect();
        assert_eq!(entry.field("status"), Ok("200"));
        assert_eq!(
            entry.field("bytes"),
            Err(EntryError::MissingField("bytes".to_string()))
        );
    }

    #[test]
    fn test_set_field_overwrites() {
        let mut entry = Entry::new();
        assert!(entry.is_empty());
        entry.set_field("host", "a");
        entry.set_field("host", "b");
        assert_eq!(entry.len(), 1);
        assert_eq!(entry.field("host"), Ok("b"));
    }

    #[test]
    fn test_float_field() {
        let entry: Entry = [("time", "0.25"), ("path", "/index")]
            .into_iter()
            .collect();
        assert_eq!(entry.float_field("time"), Ok(0.25));
        assert_eq!(
            entry.float_field("path"),
            Err(EntryError::InvalidFloat("/index".to_string()))
        );
        assert!(matches!(
            entry.float_field("missing"),
            Err(EntryError::MissingField(_))
        ));
    }

    #[test]
    fn test_from_hash_map() {
        let mut fields = Fields::new();
        fields.insert("a".to_string(), "1".to_string());
        let entry = Entry::from(fields.clone());
        assert_eq!(entry.fields(), &fields);
    }

    #[test]
    fn test_parse_float_decimal_and_scientific() {
        assert_eq!(parse_float("42"), Ok(42.0));
        assert_eq!(parse_float("-1.5"), Ok(-1.5));
        assert_eq!(parse_float("+2"), Ok(2.0));
        assert_eq!(parse_float("1e3"), Ok(1000.0));
        assert_eq!(parse_float("2.5E-1"), Ok(0.25));
        assert_eq!(parse_float(".5"), Ok(0.5));
    }

    #[test]
    fn test_parse_float_rejects_garbage() {
        for value in ["", "x", "1.2.3", " 1", "1 ", "0x10", "1,5", "-"] {
            assert!(
                matches!(parse_float(value), Err(EntryError::InvalidFloat(_))),
                "{value:?} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_float_special_literals() {
        assert_eq!(parse_float("inf"), Ok(f64::INFINITY));
        assert_eq!(parse_float("-Infinity"), Ok(f64::NEG_INFINITY));
        assert!(parse_float("NaN").is_ok_and(f64::is_nan));
    }

    #[test]
    fn test_parse_float_overflow() {
        assert_eq!(
            parse_float("1e400"),
            Err(EntryError::OutOfRange("1e400".to_string()))
        );
        assert!(matches!(
            parse_float("-1e400"),
            Err(EntryError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_entry_serializes_as_flat_map() {
        let entry: Entry = [("a", "1")].into_iter().collect();
        let text = toml::to_string(&entry).unwrap();
        assert_eq!(text.trim(), "a = \"1\"");
        let back: Entry = toml::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }
}
