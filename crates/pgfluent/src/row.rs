//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use crate::value::{BoxError, FromValue, TIMESTAMP_FORMAT, Value, is_textual};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

/// A materialized row: column name to value, in result-set order.
pub type Record = IndexMap<String, Value>;

/// Build a [`Record`] from `column => value` pairs.
///
/// ```ignore
/// let data = record! { "name" => "alice", "age" => 30 };
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($col:expr => $val:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(record.insert(::std::string::String::from($col), $crate::Value::from($val));)+
        record
    }};
}

/// Trait for converting a materialized [`Record`] into a Rust struct.
///
/// This trait should typically be derived using `#[derive(Model)]`
/// from the `pgfluent-derive` crate.
pub trait FromRecord: Sized {
    /// Convert a record into Self
    fn from_record(record: &Record) -> OrmResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> OrmResult<Self> {
        Ok(record.clone())
    }
}

/// Extension trait for Record to provide typed access
pub trait RecordExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T: FromValue>(&self, column: &str) -> OrmResult<T>;
}

impl RecordExt for Record {
    fn try_get_column<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self.get(column).unwrap_or(&Value::Null);
        T::from_value(value).map_err(|e| OrmError::decode(column, e))
    }
}

/// Accepts any column type; `None` means the type has no [`Value`] mapping.
struct Column(Option<Value>);

impl<'a> FromSql<'a> for Column {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_column(ty, raw).map(Column)
    }

    fn from_sql_null(_: &Type) -> Result<Self, BoxError> {
        Ok(Column(Some(Value::Null)))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Map one non-NULL binary column to a [`Value`].
///
/// Temporal, uuid, numeric and json columns are carried as text in a form
/// that binds back into the same column type.
pub(crate) fn decode_column(ty: &Type, raw: &[u8]) -> Result<Option<Value>, BoxError> {
    let value = match *ty {
        Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
        Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
        Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
        Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
        Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
        Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
        Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
        // NaN and values beyond 28 digits have no Decimal form.
        Type::NUMERIC => match Decimal::from_sql(ty, raw) {
            Ok(d) => Value::Text(d.to_string()),
            Err(_) => return Ok(None),
        },
        Type::UUID => Value::Text(uuid::Uuid::from_sql(ty, raw)?.to_string()),
        Type::DATE => Value::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
        Type::TIME => Value::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
        Type::TIMESTAMP => Value::Text(
            NaiveDateTime::from_sql(ty, raw)?
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        ),
        Type::TIMESTAMPTZ => Value::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
        Type::JSON | Type::JSONB => {
            Value::Text(serde_json::Value::from_sql(ty, raw)?.to_string())
        }
        Type::BYTEA => {
            let mut hex = String::with_capacity(2 + raw.len() * 2);
            hex.push_str("\\x");
            for b in raw {
                hex.push_str(&format!("{b:02x}"));
            }
            Value::Text(hex)
        }
        _ if is_textual(ty) => Value::Text(<&str as FromSql>::from_sql(ty, raw)?.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Decode a driver row into a [`Record`].
///
/// Columns whose type has no mapping are read as NULL with a warning.
pub fn record_from_row(row: &Row) -> OrmResult<Record> {
    let mut record = Record::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let Column(value) = row.try_get::<_, Column>(idx).map_err(|e| {
            let message = e.source().map_or_else(|| e.to_string(), |s| s.to_string());
            OrmError::decode(name, message)
        })?;
        let value = value.unwrap_or_else(|| {
            tracing::warn!(
                target: "pgfluent",
                column = name,
                pg_type = %column.type_(),
                "column type has no value mapping, read as NULL"
            );
            Value::Null
        });
        record.insert(name.to_string(), value);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_postgres::types::ToSql;

    #[derive(Debug, PartialEq)]
    struct User {
        id: i64,
        name: String,
        nickname: Option<String>,
    }

    impl FromRecord for User {
        fn from_record(record: &Record) -> OrmResult<Self> {
            Ok(Self {
                id: record.try_get_column("id")?,
                name: record.try_get_column("name")?,
                nickname: record.try_get_column("nickname")?,
            })
        }
    }

    #[test]
    fn record_macro_keeps_insertion_order() {
        let r = record! { "b" => 1, "a" => "x" };
        let keys: Vec<_> = r.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(r["a"], Value::from("x"));
    }

    #[test]
    fn from_record_maps_missing_optional_to_none() {
        let r = record! { "id" => 3, "name" => "ann" };
        let user = User::from_record(&r).unwrap();
        assert_eq!(
            user,
            User {
                id: 3,
                name: "ann".into(),
                nickname: None
            }
        );
    }

    #[test]
    fn from_record_reports_decode_column() {
        let r = record! { "id" => "abc", "name" => "ann" };
        let err = User::from_record(&r).unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "id"));
    }

    fn raw<T: tokio_postgres::types::ToSql>(value: T, ty: &Type) -> Vec<u8> {
        let mut buf = bytes::BytesMut::new();
        value.to_sql(ty, &mut buf).unwrap();
        buf.to_vec()
    }

    fn decode(ty: &Type, bytes: &[u8]) -> Option<Value> {
        decode_column(ty, bytes).unwrap()
    }

    #[test]
    fn decodes_scalar_columns() {
        assert_eq!(decode(&Type::BOOL, &raw(true, &Type::BOOL)), Some(Value::Bool(true)));
        assert_eq!(decode(&Type::INT2, &raw(-7i16, &Type::INT2)), Some(Value::Int(-7)));
        assert_eq!(decode(&Type::INT4, &raw(7i32, &Type::INT4)), Some(Value::Int(7)));
        assert_eq!(decode(&Type::INT8, &raw(1i64 << 40, &Type::INT8)), Some(Value::Int(1 << 40)));
        assert_eq!(decode(&Type::OID, &raw(25u32, &Type::OID)), Some(Value::Int(25)));
        assert_eq!(decode(&Type::FLOAT4, &raw(0.5f32, &Type::FLOAT4)), Some(Value::Float(0.5)));
        assert_eq!(decode(&Type::FLOAT8, &raw(2.25f64, &Type::FLOAT8)), Some(Value::Float(2.25)));
        assert_eq!(decode(&Type::TEXT, &raw("ann", &Type::TEXT)), Some(Value::from("ann")));
        assert_eq!(decode(&Type::VARCHAR, &raw("bo", &Type::VARCHAR)), Some(Value::from("bo")));
    }

    #[test]
    fn numeric_decodes_to_text_that_binds_back() {
        let price: Decimal = "9.99".parse().unwrap();
        let bytes = raw(price, &Type::NUMERIC);
        let value = decode(&Type::NUMERIC, &bytes).unwrap();
        assert_eq!(value, Value::from("9.99"));

        let mut buf = bytes::BytesMut::new();
        value.to_sql_checked(&Type::NUMERIC, &mut buf).unwrap();
        assert_eq!(buf.to_vec(), bytes);
    }

    #[test]
    fn timestamp_decodes_with_t_separator_and_binds_back() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        let bytes = raw(ts, &Type::TIMESTAMP);
        let value = decode(&Type::TIMESTAMP, &bytes).unwrap();
        assert_eq!(value, Value::from("2024-01-01T10:00:00"));

        let mut buf = bytes::BytesMut::new();
        value.to_sql_checked(&Type::TIMESTAMP, &mut buf).unwrap();
        assert_eq!(buf.to_vec(), bytes);
    }

    #[test]
    fn typed_columns_decode_as_text() {
        let id: uuid::Uuid = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        assert_eq!(
            decode(&Type::UUID, &raw(id, &Type::UUID)),
            Some(Value::from("67e55044-10b1-426f-9247-bb680e5fe0c8"))
        );
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(decode(&Type::DATE, &raw(day, &Type::DATE)), Some(Value::from("2024-02-29")));
        let doc = serde_json::json!({"a": [1, 2]});
        assert_eq!(
            decode(&Type::JSONB, &raw(doc, &Type::JSONB)),
            Some(Value::from(r#"{"a":[1,2]}"#))
        );
        assert_eq!(
            decode(&Type::BYTEA, &[0x01, 0xff]),
            Some(Value::from("\\x01ff"))
        );
    }

    #[test]
    fn enum_labels_decode_as_text() {
        let mood = Type::new(
            "mood".to_string(),
            90_001,
            tokio_postgres::types::Kind::Enum(vec!["happy".to_string()]),
            "public".to_string(),
        );
        assert_eq!(decode(&mood, b"happy"), Some(Value::from("happy")));
    }

    #[test]
    fn unmapped_types_are_not_errors() {
        assert_eq!(decode(&Type::INTERVAL, &[0; 16]), None);
        assert_eq!(decode(&Type::POINT, &[0; 16]), None);
        assert!(Column::accepts(&Type::INTERVAL));
        assert!(matches!(
            Column::from_sql_null(&Type::INTERVAL),
            Ok(Column(Some(Value::Null)))
        ));
    }

    #[test]
    fn malformed_bytes_are_errors() {
        assert!(decode_column(&Type::INT4, &[0, 1]).is_err());
        assert!(decode_column(&Type::TEXT, &[0xff, 0xfe]).is_err());
    }
}
