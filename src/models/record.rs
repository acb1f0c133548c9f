//! Normalized result rows.
//!
//! Every driver-specific cell is turned into a [`ColumnValue`] before it
//! leaves the executor, so tool handlers only ever see this closed set.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// A transport-safe cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Raw bytes kept on request of the caller.
    Binary(Vec<u8>),
    /// Opaque bytes that could not be rendered as text.
    Raw(Vec<u8>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text rendering used by the table formatter.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Binary(bytes) | Self::Raw(bytes) => STANDARD.encode(bytes),
        }
    }
}

impl Serialize for ColumnValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Integer(i) => serializer.serialize_i64(*i),
            // JSON has no NaN/inf
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(f) => serializer.serialize_str(&f.to_string()),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Binary(bytes) | Self::Raw(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

/// One result row: column name to value, in result-set column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, ColumnValue>);

impl Record {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Append a field. A name already present gets a `_2`, `_3`, ... suffix
    /// so that no value is dropped. Returns the name actually used.
    pub fn push(&mut self, name: &str, value: ColumnValue) -> String {
        let key = if self.0.contains_key(name) {
            (2..)
                .map(|n| format!("{name}_{n}"))
                .find(|candidate| !self.0.contains_key(candidate))
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        };
        self.0.insert(key.clone(), value);
        key
    }

    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &ColumnValue> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Records returned by a query, plus the column list so that an empty result
/// still has a header.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExecuteOutcome {
    pub rows_affected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let mut record = Record::default();
        assert_eq!(record.push("id", ColumnValue::Integer(1)), "id");
        assert_eq!(record.push("id", ColumnValue::Integer(2)), "id_2");
        assert_eq!(record.push("id", ColumnValue::Integer(3)), "id_3");
        assert_eq!(record.len(), 3);
        assert_eq!(record.get("id_2"), Some(&ColumnValue::Integer(2)));
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let mut record = Record::default();
        record.push("a", ColumnValue::Null);
        record.push("a_2", ColumnValue::Null);
        assert_eq!(record.push("a", ColumnValue::Null), "a_3");
    }

    #[test]
    fn test_record_keeps_insertion_order() {
        let mut record = Record::default();
        record.push("z", ColumnValue::Null);
        record.push("a", ColumnValue::Null);
        record.push("m", ColumnValue::Null);
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_serialize_values() {
        let mut record = Record::default();
        record.push("n", ColumnValue::Null);
        record.push("t", ColumnValue::Text("hi".into()));
        record.push("i", ColumnValue::Integer(-4));
        record.push("f", ColumnValue::Float(1.5));
        record.push("b", ColumnValue::Boolean(true));
        record.push("bin", ColumnValue::Binary(vec![0x41, 0x42]));
        record.push("nan", ColumnValue::Float(f64::NAN));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"n":null,"t":"hi","i":-4,"f":1.5,"b":true,"bin":"QUI=","nan":"NaN"}"#
        );
    }

    #[test]
    fn test_display_string() {
        assert_eq!(ColumnValue::Null.to_display_string(), "NULL");
        assert_eq!(ColumnValue::Raw(vec![0xff]).to_display_string(), "/w==");
        assert_eq!(ColumnValue::Boolean(false).to_display_string(), "false");
    }
}
