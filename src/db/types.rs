//! Database-agnostic type mappings.
//!
//! Cells are decoded in two phases:
//! 1. A database-specific decoder copies each cell out of the driver row into
//!    a [`RawValue`], guided by [`TypeCategory`].
//! 2. [`coerce`] turns the `RawValue` into a transport-safe [`ColumnValue`].
//!
//! Only phase 1 can fail. Phase 2 is total.

use crate::error::{BridgeError, BridgeResult};
use crate::models::{ColumnValue, DatabaseType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgValueFormat};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Raw Values
// =============================================================================

/// A driver-native cell after copy-out from the row.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bytes(Vec<u8>),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Exact decimal text as reported by the engine.
    Decimal(String),
    /// ISO-8601 rendering.
    Temporal(String),
    /// Serialized JSON document.
    Json(String),
    Unsupported { type_name: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionOptions {
    /// Return byte cells as [`ColumnValue::Binary`] instead of text.
    pub keep_binary: bool,
}

/// Convert one raw cell into a [`ColumnValue`]. Never fails.
pub fn coerce(raw: RawValue, options: CoercionOptions) -> ColumnValue {
    match raw {
        RawValue::Null => ColumnValue::Null,
        RawValue::Bytes(bytes) if options.keep_binary => ColumnValue::Binary(bytes),
        RawValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => ColumnValue::Text(text),
            Err(e) => ColumnValue::Raw(e.into_bytes()),
        },
        RawValue::Int(v) => ColumnValue::Integer(v),
        RawValue::UInt(v) => match i64::try_from(v) {
            Ok(v) => ColumnValue::Integer(v),
            Err(_) => ColumnValue::Text(v.to_string()),
        },
        RawValue::Float(v) => ColumnValue::Float(v),
        RawValue::Bool(v) => ColumnValue::Boolean(v),
        RawValue::Text(s) | RawValue::Decimal(s) | RawValue::Temporal(s) | RawValue::Json(s) => {
            ColumnValue::Text(s)
        }
        RawValue::Unsupported { bytes, .. } => ColumnValue::Raw(bytes),
    }
}

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Date,
    Time,
    /// Timestamp without zone.
    DateTime,
    /// Timestamp stored or reported in UTC.
    Timestamp,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Arrays are passed through as opaque values
    if lower.ends_with("[]") {
        return TypeCategory::Unknown;
    }

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // Binary before integer/text: "tinyblob", "varbinary"
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("text")
        || lower.contains("char")
        || lower == "name"
        || lower == "enum"
        || lower == "set"
    {
        return TypeCategory::Text;
    }

    match lower.as_str() {
        "timestamptz" => return TypeCategory::Timestamp,
        // MySQL TIMESTAMP is stored as UTC
        "timestamp" if db == DatabaseType::MySQL => return TypeCategory::Timestamp,
        "timestamp" | "datetime" => return TypeCategory::DateTime,
        "date" => return TypeCategory::Date,
        "time" => return TypeCategory::Time,
        "interval" | "point" | "timetz" => return TypeCategory::Unknown,
        _ => {}
    }

    // Integer types
    if lower.contains("int") || lower.contains("serial") || lower == "year" {
        return TypeCategory::Integer;
    }

    // Boolean
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Float types
    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    // JSON types
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    // UUID (PostgreSQL)
    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL values as strings (MySQL sends them as text
/// in both protocols). This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Render a PostgreSQL binary NUMERIC as exact decimal text.
///
/// Layout: ndigits i16, weight i16, sign u16, dscale u16, then ndigits
/// base-10000 digits as i16, most significant first.
pub fn pg_numeric_to_string(bytes: &[u8]) -> Result<String, sqlx::error::BoxDynError> {
    let read_u16 = |at: usize| -> Result<u16, sqlx::error::BoxDynError> {
        bytes
            .get(at..at + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "truncated NUMERIC value".into())
    };

    let ndigits = read_u16(0)? as usize;
    let weight = read_u16(2)? as i16 as i32;
    let sign = read_u16(4)?;
    let dscale = read_u16(6)? as usize;

    match sign {
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| read_u16(8 + i * 2))
        .collect::<Result<Vec<_>, _>>()?;
    // Digit i carries exponent (weight - i) in base 10000.
    let digit_at = |index: i32| -> u16 {
        if index < 0 {
            0
        } else {
            digits.get(index as usize).copied().unwrap_or(0)
        }
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=weight {
            if i == 0 {
                out.push_str(&digit_at(i).to_string());
            } else {
                out.push_str(&format!("{:04}", digit_at(i)));
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut index = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit_at(index)));
            index += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

// =============================================================================
// Temporal Rendering
// =============================================================================

fn render_date(value: NaiveDate) -> RawValue {
    RawValue::Temporal(value.format("%Y-%m-%d").to_string())
}

fn render_time(value: NaiveTime) -> RawValue {
    RawValue::Temporal(value.format("%H:%M:%S%.f").to_string())
}

fn render_datetime(value: NaiveDateTime) -> RawValue {
    RawValue::Temporal(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn render_timestamp(value: DateTime<Utc>) -> RawValue {
    RawValue::Temporal(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Text when the bytes are UTF-8, otherwise opaque.
fn text_or_unsupported(type_name: &str, bytes: Vec<u8>) -> RawValue {
    match String::from_utf8(bytes) {
        Ok(text) => RawValue::Text(text),
        Err(e) => unsupported(type_name, e.into_bytes()),
    }
}

fn unsupported(type_name: &str, bytes: Vec<u8>) -> RawValue {
    RawValue::Unsupported {
        type_name: type_name.to_string(),
        bytes,
    }
}

/// MySQL sends BIT and GEOMETRY as raw bytes in both protocols, so unknown
/// types are opaque. A MariaDB UUID is kept only in its canonical text form.
fn opaque_unless_uuid(type_name: &str, bytes: Vec<u8>) -> RawValue {
    let canonical = bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        });
    if canonical {
        text_or_unsupported(type_name, bytes)
    } else {
        unsupported(type_name, bytes)
    }
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Copy the cells of a driver row out into owned [`RawValue`]s.
pub trait DecodeRow {
    fn column_names(&self) -> Vec<String>;

    /// One value per column, in column order. The first failing cell aborts.
    fn decode_values(&self) -> BridgeResult<Vec<RawValue>>;
}

impl DecodeRow for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn decode_values(&self) -> BridgeResult<Vec<RawValue>> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                mysql::decode_column(self, idx, type_name, category).map_err(BridgeError::from)
            })
            .collect()
    }
}

impl DecodeRow for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn decode_values(&self) -> BridgeResult<Vec<RawValue>> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

impl DecodeRow for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn decode_values(&self) -> BridgeResult<Vec<RawValue>> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let declared = categorize_type(col.type_info().name(), DatabaseType::SQLite);
                sqlite::decode_column(self, idx, declared).map_err(BridgeError::from)
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> Result<RawValue, sqlx::Error> {
        if row.try_get_raw(idx)?.is_null() {
            return Ok(RawValue::Null);
        }

        let value = match category {
            TypeCategory::Decimal => RawValue::Decimal(row.try_get::<RawDecimal, _>(idx)?.0),
            TypeCategory::Integer if type_name.to_uppercase().contains("UNSIGNED") => {
                RawValue::UInt(row.try_get_unchecked::<u64, _>(idx)?)
            }
            TypeCategory::Integer if type_name.eq_ignore_ascii_case("year") => {
                RawValue::Int(row.try_get_unchecked::<u16, _>(idx)? as i64)
            }
            TypeCategory::Integer => RawValue::Int(row.try_get_unchecked::<i64, _>(idx)?),
            TypeCategory::Boolean => RawValue::Bool(row.try_get::<bool, _>(idx)?),
            TypeCategory::Float if type_name.eq_ignore_ascii_case("float") => {
                RawValue::Float(row.try_get_unchecked::<f32, _>(idx)? as f64)
            }
            TypeCategory::Float => RawValue::Float(row.try_get_unchecked::<f64, _>(idx)?),
            TypeCategory::Binary => RawValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
            TypeCategory::Json => {
                RawValue::Json(row.try_get::<serde_json::Value, _>(idx)?.to_string())
            }
            TypeCategory::Date => render_date(row.try_get::<NaiveDate, _>(idx)?),
            TypeCategory::Time => render_time(row.try_get::<NaiveTime, _>(idx)?),
            TypeCategory::DateTime => render_datetime(row.try_get::<NaiveDateTime, _>(idx)?),
            TypeCategory::Timestamp => render_timestamp(row.try_get::<DateTime<Utc>, _>(idx)?),
            TypeCategory::Text => {
                text_or_unsupported(type_name, row.try_get_unchecked::<Vec<u8>, _>(idx)?)
            }
            TypeCategory::Uuid | TypeCategory::Unknown => {
                opaque_unless_uuid(type_name, row.try_get_unchecked::<Vec<u8>, _>(idx)?)
            }
        };
        Ok(value)
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> BridgeResult<RawValue> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(RawValue::Null);
        }

        let value = match category {
            TypeCategory::Decimal => {
                let text = match raw.format() {
                    PgValueFormat::Text => raw.as_str().map(str::to_string),
                    PgValueFormat::Binary => raw.as_bytes().and_then(pg_numeric_to_string),
                }
                .map_err(|e| BridgeError::decode(format!("NUMERIC column {idx}: {e}")))?;
                RawValue::Decimal(text)
            }
            TypeCategory::Integer => match type_name.to_uppercase().as_str() {
                "INT2" | "SMALLINT" | "SMALLSERIAL" => RawValue::Int(row.try_get::<i16, _>(idx)? as i64),
                "INT4" | "INT" | "INTEGER" | "SERIAL" => RawValue::Int(row.try_get::<i32, _>(idx)? as i64),
                _ => RawValue::Int(row.try_get::<i64, _>(idx)?),
            },
            TypeCategory::Boolean => RawValue::Bool(row.try_get::<bool, _>(idx)?),
            TypeCategory::Float if type_name.eq_ignore_ascii_case("float4") => {
                RawValue::Float(row.try_get::<f32, _>(idx)? as f64)
            }
            TypeCategory::Float => RawValue::Float(row.try_get::<f64, _>(idx)?),
            TypeCategory::Binary => RawValue::Bytes(row.try_get::<Vec<u8>, _>(idx)?),
            TypeCategory::Json => {
                RawValue::Json(row.try_get::<serde_json::Value, _>(idx)?.to_string())
            }
            TypeCategory::Uuid => match raw.format() {
                PgValueFormat::Text => RawValue::Text(row.try_get_unchecked::<String, _>(idx)?),
                PgValueFormat::Binary => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
                    RawValue::Text(format_uuid(&bytes))
                }
            },
            TypeCategory::Date => render_date(row.try_get::<NaiveDate, _>(idx)?),
            TypeCategory::Time => render_time(row.try_get::<NaiveTime, _>(idx)?),
            TypeCategory::DateTime => render_datetime(row.try_get::<NaiveDateTime, _>(idx)?),
            TypeCategory::Timestamp => render_timestamp(row.try_get::<DateTime<Utc>, _>(idx)?),
            // Text types and enums are UTF-8 in both wire formats
            TypeCategory::Text => RawValue::Text(row.try_get_unchecked::<String, _>(idx)?),
            TypeCategory::Unknown => {
                let bytes = raw
                    .as_bytes()
                    .map_err(|e| BridgeError::decode(format!("column {idx}: {e}")))?
                    .to_vec();
                unknown_value(raw.format(), type_name, bytes)
            }
        };
        Ok(value)
    }

    /// Only the text format is readable without knowing the type; binary
    /// payloads (interval, money, inet, ...) stay opaque.
    pub(super) fn unknown_value(format: PgValueFormat, type_name: &str, bytes: Vec<u8>) -> RawValue {
        match format {
            PgValueFormat::Text => text_or_unsupported(type_name, bytes),
            PgValueFormat::Binary => unsupported(type_name, bytes),
        }
    }

    fn format_uuid(bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        if hex.len() != 32 {
            return hex;
        }
        format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }

}

mod sqlite {
    use super::*;

    /// SQLite is dynamically typed, so the storage class of the value drives
    /// decoding. The declared column type only distinguishes booleans.
    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        declared: TypeCategory,
    ) -> Result<RawValue, sqlx::Error> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(RawValue::Null);
        }
        let storage = raw.type_info().name().to_uppercase();

        let value = match storage.as_str() {
            "INTEGER" if declared == TypeCategory::Boolean => {
                RawValue::Bool(row.try_get_unchecked::<i64, _>(idx)? != 0)
            }
            "INTEGER" => RawValue::Int(row.try_get_unchecked::<i64, _>(idx)?),
            "REAL" => RawValue::Float(row.try_get_unchecked::<f64, _>(idx)?),
            "TEXT" => text_or_unsupported("TEXT", row.try_get_unchecked::<Vec<u8>, _>(idx)?),
            "BLOB" => RawValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
            other => RawValue::Unsupported {
                type_name: other.to_string(),
                bytes: row.try_get_unchecked::<Vec<u8>, _>(idx)?,
            },
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTS: CoercionOptions = CoercionOptions { keep_binary: false };

    #[test]
    fn test_mysql_unknown_bytes_are_opaque() {
        // BIT(8) holding b'00110001' reads as "1" if taken for text
        assert!(matches!(
            opaque_unless_uuid("BIT", vec![0x31]),
            RawValue::Unsupported { .. }
        ));
        assert_eq!(
            opaque_unless_uuid("UUID", b"123e4567-e89b-12d3-a456-426614174000".to_vec()),
            RawValue::Text("123e4567-e89b-12d3-a456-426614174000".into())
        );
        assert!(matches!(
            opaque_unless_uuid("UUID", vec![0x12; 16]),
            RawValue::Unsupported { .. }
        ));
    }

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT", DatabaseType::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("TINYINT UNSIGNED", DatabaseType::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("SERIAL", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_does_not_confuse_lookalikes() {
        assert_eq!(
            categorize_type("TINYTEXT", DatabaseType::MySQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("TINYBLOB", DatabaseType::MySQL),
            TypeCategory::Binary
        );
        assert_eq!(
            categorize_type("INTERVAL", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
        assert_eq!(
            categorize_type("POINT", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
        assert_eq!(
            categorize_type("INT4[]", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(
            categorize_type("DECIMAL", DatabaseType::MySQL),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("NUMERIC", DatabaseType::PostgreSQL),
            TypeCategory::Decimal
        );
        // SQLite NUMERIC is a float
        assert_eq!(
            categorize_type("numeric", DatabaseType::SQLite),
            TypeCategory::Float
        );
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(
            categorize_type("TIMESTAMPTZ", DatabaseType::PostgreSQL),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("TIMESTAMP", DatabaseType::PostgreSQL),
            TypeCategory::DateTime
        );
        assert_eq!(
            categorize_type("TIMESTAMP", DatabaseType::MySQL),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("DATETIME", DatabaseType::MySQL),
            TypeCategory::DateTime
        );
        assert_eq!(
            categorize_type("DATE", DatabaseType::PostgreSQL),
            TypeCategory::Date
        );
    }

    #[test]
    fn test_categorize_type_json() {
        assert_eq!(
            categorize_type("json", DatabaseType::PostgreSQL),
            TypeCategory::Json
        );
        assert_eq!(
            categorize_type("jsonb", DatabaseType::PostgreSQL),
            TypeCategory::Json
        );
    }

    #[test]
    fn test_coerce_bytes() {
        assert_eq!(
            coerce(RawValue::Bytes(vec![0x41, 0x42]), OPTS),
            ColumnValue::Text("AB".to_string())
        );
        assert_eq!(
            coerce(RawValue::Bytes(vec![0xFF, 0xFE]), OPTS),
            ColumnValue::Raw(vec![0xFF, 0xFE])
        );
        assert_eq!(
            coerce(
                RawValue::Bytes(vec![0x41, 0x42]),
                CoercionOptions { keep_binary: true }
            ),
            ColumnValue::Binary(vec![0x41, 0x42])
        );
    }

    #[test]
    fn test_coerce_empty_bytes() {
        assert_eq!(
            coerce(RawValue::Bytes(Vec::new()), OPTS),
            ColumnValue::Text(String::new())
        );
    }

    #[test]
    fn test_coerce_unsigned_overflow() {
        assert_eq!(coerce(RawValue::UInt(7), OPTS), ColumnValue::Integer(7));
        assert_eq!(
            coerce(RawValue::UInt(u64::MAX), OPTS),
            ColumnValue::Text("18446744073709551615".to_string())
        );
    }

    #[test]
    fn test_coerce_textual_variants() {
        assert_eq!(
            coerce(RawValue::Decimal("10.50".into()), OPTS),
            ColumnValue::Text("10.50".into())
        );
        assert_eq!(
            coerce(RawValue::Temporal("2024-01-02".into()), OPTS),
            ColumnValue::Text("2024-01-02".into())
        );
        assert_eq!(
            coerce(RawValue::Json(r#"{"a":1}"#.into()), OPTS),
            ColumnValue::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn test_coerce_unsupported_is_raw() {
        let raw = RawValue::Unsupported {
            type_name: "POINT".into(),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(coerce(raw, OPTS), ColumnValue::Raw(vec![1, 2, 3]));
    }

    #[test]
    fn test_coerce_null_stays_null() {
        assert_eq!(coerce(RawValue::Null, OPTS), ColumnValue::Null);
        assert_eq!(
            coerce(RawValue::Null, CoercionOptions { keep_binary: true }),
            ColumnValue::Null
        );
    }

    fn numeric_bytes(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        out.extend_from_slice(&weight.to_be_bytes());
        out.extend_from_slice(&sign.to_be_bytes());
        out.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            out.extend_from_slice(&d.to_be_bytes());
        }
        out
    }

    #[test]
    fn test_pg_numeric_to_string() {
        assert_eq!(
            pg_numeric_to_string(&numeric_bytes(0, 0, 2, &[123, 4500])).unwrap(),
            "123.45"
        );
        assert_eq!(
            pg_numeric_to_string(&numeric_bytes(-1, 0, 3, &[10])).unwrap(),
            "0.001"
        );
        assert_eq!(
            pg_numeric_to_string(&numeric_bytes(1, 0x4000, 0, &[1])).unwrap(),
            "-10000"
        );
        assert_eq!(
            pg_numeric_to_string(&numeric_bytes(0, 0, 0, &[])).unwrap(),
            "0"
        );
        assert_eq!(
            pg_numeric_to_string(&numeric_bytes(0, 0xC000, 0, &[])).unwrap(),
            "NaN"
        );
    }

    #[test]
    fn test_pg_numeric_truncated_input() {
        assert!(pg_numeric_to_string(&[0, 1]).is_err());
        assert!(pg_numeric_to_string(&numeric_bytes(0, 0, 0, &[1])[..9]).is_err());
    }
}
