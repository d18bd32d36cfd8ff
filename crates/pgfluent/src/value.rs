//! Scalar values bound to statements and read back from rows.

use bytes::BytesMut;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};

pub(crate) type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
///
/// Everything the builder binds or materializes goes through this type, so
/// predicates, insert payloads and fetched rows share one representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Runtime kind of a bound value, as reported alongside executed statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Null,
    Boolean,
}

impl Value {
    /// Whether the value counts as "absent".
    ///
    /// Absent values are `NULL`, `false`, the empty string and a single space.
    /// Column lists drop absent entries.
    pub fn is_absent(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => true,
            Value::Text(s) => s.is_empty() || s == " ",
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind used for positional binding; anything that is not an integer,
    /// boolean or null binds as a string.
    pub fn kind(&self) -> ParamKind {
        match self {
            Value::Null => ParamKind::Null,
            Value::Bool(_) => ParamKind::Boolean,
            Value::Int(_) => ParamKind::Integer,
            Value::Float(_) | Value::Text(_) => ParamKind::String,
        }
    }

    /// Loose equality used when diffing rows.
    ///
    /// Integers and floats compare numerically, and text compares equal to a
    /// number when it parses to that number. `NULL` only equals `NULL`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Null => None,
        }
    }

    /// Render the value as an inline SQL literal.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) if v.is_finite() => v.to_string(),
            Value::Float(v) => format!("'{v}'"),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] into a Rust field type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {value:?}")
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Int(v) => Ok(*v),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("integer", value)),
            _ => Err(mismatch("integer", value)),
        }
    }
}

macro_rules! impl_from_value_narrow {
    ($($t:ty),*) => {
        $(impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, String> {
                let wide = i64::from_value(value)?;
                <$t>::try_from(wide).map_err(|e| e.to_string())
            }
        })*
    };
}

impl_from_value_narrow!(i16, i32, u32);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("float", value)),
            _ => Err(mismatch("float", value)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            _ => Err(mismatch("boolean", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Err(mismatch("text", value)),
            other => Ok(other.to_string()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Text form of a `timestamp` column, as produced when reading rows.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn parse_text<T>(s: &str, ty: &Type) -> Result<T, BoxError>
where
    T: std::str::FromStr,
    T::Err: Error + Sync + Send + 'static,
{
    s.trim()
        .parse::<T>()
        .map_err(|e| format!("cannot bind '{s}' as {ty}: {e}").into())
}

/// Parse a `timestamp` written with either a `T` or a space between date and time.
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    let trimmed = s.trim();
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| format!("cannot bind '{s}' as timestamp: {e}").into())
}

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("cannot bind '{s}' as boolean").into()),
    }
}

/// `bytea` accepts the `\x` hex form; anything else is bound as raw bytes.
fn parse_bytea(s: &str) -> Result<Vec<u8>, BoxError> {
    let Some(hex) = s.strip_prefix("\\x") else {
        return Ok(s.as_bytes().to_vec());
    };
    if hex.len() % 2 != 0 {
        return Err(format!("odd-length hex in bytea value '{s}'").into());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| -> BoxError { format!("invalid hex in bytea value '{s}'").into() })
        })
        .collect()
}

fn float_to_decimal(v: f64) -> Result<Decimal, BoxError> {
    if !v.is_finite() {
        return Err(format!("cannot bind {v} as numeric").into());
    }
    Ok(v.to_string().parse::<Decimal>()?)
}

/// Types bound from the value's text form.
pub(crate) fn is_textual(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty) || matches!(ty.kind(), Kind::Enum(_))
}

fn unsupported(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {:?} to a {ty} parameter", value.kind()).into()
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if let Value::Null = self {
            return Ok(IsNull::Yes);
        }
        if is_textual(ty) {
            out.extend_from_slice(self.to_string().as_bytes());
            return Ok(IsNull::No);
        }
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                Type::INT2 => i16::from(*v).to_sql(ty, out),
                Type::INT4 => i32::from(*v).to_sql(ty, out),
                Type::INT8 => i64::from(*v).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(i64::from(*v)).to_sql(ty, out),
                _ => Err(unsupported(self, ty)),
            },
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::INT8 => v.to_sql(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                Type::BOOL => (*v != 0).to_sql(ty, out),
                _ => Err(unsupported(self, ty)),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::NUMERIC => float_to_decimal(*v)?.to_sql(ty, out),
                _ => Err(unsupported(self, ty)),
            },
            Value::Text(s) => match *ty {
                Type::INT2 => parse_text::<i16>(s, ty)?.to_sql(ty, out),
                Type::INT4 => parse_text::<i32>(s, ty)?.to_sql(ty, out),
                Type::INT8 => parse_text::<i64>(s, ty)?.to_sql(ty, out),
                Type::OID => parse_text::<u32>(s, ty)?.to_sql(ty, out),
                Type::FLOAT4 => parse_text::<f32>(s, ty)?.to_sql(ty, out),
                Type::FLOAT8 => parse_text::<f64>(s, ty)?.to_sql(ty, out),
                Type::NUMERIC => parse_text::<Decimal>(s, ty)?.to_sql(ty, out),
                Type::BOOL => parse_bool(s)?.to_sql(ty, out),
                Type::UUID => parse_text::<uuid::Uuid>(s, ty)?.to_sql(ty, out),
                Type::DATE => parse_text::<chrono::NaiveDate>(s, ty)?.to_sql(ty, out),
                Type::TIME => parse_text::<chrono::NaiveTime>(s, ty)?.to_sql(ty, out),
                Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
                Type::TIMESTAMPTZ => {
                    parse_text::<chrono::DateTime<chrono::FixedOffset>>(s, ty)?.to_sql(ty, out)
                }
                Type::JSON | Type::JSONB => {
                    parse_text::<serde_json::Value>(s, ty)?.to_sql(ty, out)
                }
                Type::BYTEA => parse_bytea(s)?.to_sql(ty, out),
                _ => Err(unsupported(self, ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values() {
        assert!(Value::Null.is_absent());
        assert!(Value::Bool(false).is_absent());
        assert!(Value::from("").is_absent());
        assert!(Value::from(" ").is_absent());
        assert!(!Value::from("0").is_absent());
        assert!(!Value::Int(0).is_absent());
        assert!(!Value::from("  ").is_absent());
    }

    #[test]
    fn loose_equality_crosses_numeric_kinds() {
        assert!(Value::Int(5).loose_eq(&Value::Float(5.0)));
        assert!(Value::Int(5).loose_eq(&Value::from("5")));
        assert!(!Value::Int(5).loose_eq(&Value::from("five")));
        assert!(!Value::Null.loose_eq(&Value::Int(0)));
        assert!(Value::Null.loose_eq(&Value::Null));
        assert!(!Value::from("a").loose_eq(&Value::from("b")));
    }

    #[test]
    fn literals_escape_quotes() {
        assert_eq!(Value::Int(7).to_sql_literal(), "7");
        assert_eq!(Value::from("o'hara").to_sql_literal(), "'o''hara'");
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Bool(true).to_sql_literal(), "TRUE");
    }

    #[test]
    fn kinds_follow_runtime_type() {
        assert_eq!(Value::from("x").kind(), ParamKind::String);
        assert_eq!(Value::Int(1).kind(), ParamKind::Integer);
        assert_eq!(Value::Null.kind(), ParamKind::Null);
        assert_eq!(Value::Bool(true).kind(), ParamKind::Boolean);
        assert_eq!(Value::Float(1.5).kind(), ParamKind::String);
    }

    #[test]
    fn from_value_conversions() {
        assert_eq!(i32::from_value(&Value::Int(42)), Ok(42));
        assert_eq!(i64::from_value(&Value::from("17")), Ok(17));
        assert_eq!(Option::<String>::from_value(&Value::Null), Ok(None));
        assert_eq!(
            Option::<String>::from_value(&Value::from("a")),
            Ok(Some("a".to_string()))
        );
        assert!(i16::from_value(&Value::Int(i64::MAX)).is_err());
        assert!(bool::from_value(&Value::from("yes")).is_err());
    }

    fn encode(value: &Value, ty: &Type) -> Result<Option<Vec<u8>>, BoxError> {
        let mut buf = BytesMut::new();
        match value.to_sql_checked(ty, &mut buf)? {
            IsNull::Yes => Ok(None),
            IsNull::No => Ok(Some(buf.to_vec())),
        }
    }

    fn native<T: ToSql>(value: T, ty: &Type) -> Option<Vec<u8>> {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf).unwrap();
        Some(buf.to_vec())
    }

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn null_binds_as_null_for_any_type() {
        for ty in [Type::INT4, Type::NUMERIC, Type::TIMESTAMP, Type::TEXT, Type::INTERVAL] {
            assert_eq!(encode(&Value::Null, &ty).unwrap(), None);
        }
    }

    #[test]
    fn integers_follow_the_parameter_type() {
        let v = Value::Int(42);
        assert_eq!(encode(&v, &Type::INT2).unwrap(), native(42i16, &Type::INT2));
        assert_eq!(encode(&v, &Type::INT4).unwrap(), native(42i32, &Type::INT4));
        assert_eq!(encode(&v, &Type::INT8).unwrap(), native(42i64, &Type::INT8));
        assert_eq!(encode(&v, &Type::FLOAT8).unwrap(), native(42f64, &Type::FLOAT8));
        assert_eq!(encode(&v, &Type::NUMERIC).unwrap(), native(decimal("42"), &Type::NUMERIC));
        assert_eq!(encode(&v, &Type::TEXT).unwrap(), Some(b"42".to_vec()));
        assert!(encode(&Value::Int(i64::MAX), &Type::INT2).is_err());
        assert!(encode(&v, &Type::UUID).is_err());
    }

    #[test]
    fn numeric_parameters_accept_floats_and_text() {
        let expected = native(decimal("9.99"), &Type::NUMERIC);
        assert_eq!(encode(&Value::Float(9.99), &Type::NUMERIC).unwrap(), expected);
        assert_eq!(encode(&Value::from("9.99"), &Type::NUMERIC).unwrap(), expected);
        assert_eq!(
            encode(&Value::from("10"), &Type::NUMERIC).unwrap(),
            native(decimal("10"), &Type::NUMERIC)
        );
        assert!(encode(&Value::Float(f64::NAN), &Type::NUMERIC).is_err());
        assert!(encode(&Value::from("ten"), &Type::NUMERIC).is_err());
    }

    #[test]
    fn floats_and_booleans() {
        assert_eq!(
            encode(&Value::Float(1.5), &Type::FLOAT4).unwrap(),
            native(1.5f32, &Type::FLOAT4)
        );
        assert_eq!(
            encode(&Value::Bool(true), &Type::INT4).unwrap(),
            native(1i32, &Type::INT4)
        );
        assert_eq!(
            encode(&Value::from("t"), &Type::BOOL).unwrap(),
            native(true, &Type::BOOL)
        );
        assert!(encode(&Value::Float(1.5), &Type::DATE).is_err());
    }

    #[test]
    fn timestamps_accept_both_separators() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_milli_opt(10, 0, 0, 250))
            .unwrap();
        let expected = native(ts, &Type::TIMESTAMP);
        for text in ["2024-01-01T10:00:00.250", "2024-01-01 10:00:00.25"] {
            assert_eq!(encode(&Value::from(text), &Type::TIMESTAMP).unwrap(), expected);
        }
        let formatted = ts.format(TIMESTAMP_FORMAT).to_string();
        assert_eq!(parse_timestamp(&formatted).unwrap(), ts);
        assert!(encode(&Value::from("yesterday"), &Type::TIMESTAMP).is_err());
    }

    #[test]
    fn text_coerces_into_typed_columns() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(
            encode(&Value::from(id), &Type::UUID).unwrap(),
            native(id.parse::<uuid::Uuid>().unwrap(), &Type::UUID)
        );
        assert_eq!(
            encode(&Value::from("2024-02-29"), &Type::DATE).unwrap(),
            native(chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), &Type::DATE)
        );
        assert_eq!(
            encode(&Value::from("12:30:00"), &Type::TIME).unwrap(),
            native(chrono::NaiveTime::from_hms_opt(12, 30, 0).unwrap(), &Type::TIME)
        );
        assert_eq!(
            encode(&Value::from(r#"{"a":1}"#), &Type::JSONB).unwrap(),
            native(serde_json::json!({"a": 1}), &Type::JSONB)
        );
        assert_eq!(
            encode(&Value::from("\\x01ff"), &Type::BYTEA).unwrap(),
            Some(vec![0x01, 0xff])
        );
        assert!(encode(&Value::from("\\x0"), &Type::BYTEA).is_err());
    }

    #[test]
    fn enum_labels_bind_as_text_and_unknown_types_are_refused() {
        let mood = Type::new(
            "mood".to_string(),
            90_001,
            Kind::Enum(vec!["happy".to_string()]),
            "public".to_string(),
        );
        assert_eq!(encode(&Value::from("happy"), &mood).unwrap(), Some(b"happy".to_vec()));
        assert!(encode(&Value::from("1 day"), &Type::INTERVAL).is_err());
    }
}
