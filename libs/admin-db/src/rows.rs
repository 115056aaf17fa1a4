//! `QueryResult` → typed values, driven by each field's value type.
//!
//! Drivers disagree on widths (Postgres `INT4` will not decode as `i64`,
//! SQLite stores decimals as `REAL`), so each type tries its fallbacks in
//! order.

use admin_query::{FieldType, FieldValue, Record, SchemaDescriptor};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryResult, TryGetable};
use std::str::FromStr;

use crate::statements::COUNT_ALIAS;
use crate::{DbError, Result};

fn get<T: TryGetable>(row: &QueryResult, column: &str) -> std::result::Result<T, String> {
    row.try_get::<T>("", column).map_err(|e| e.to_string())
}

/// Decode one column as `value_type`. NULL decodes to `FieldValue::Null`.
pub fn decode_value(row: &QueryResult, column: &str, value_type: FieldType) -> Result<FieldValue> {
    let decoded = match value_type {
        FieldType::String | FieldType::Enum | FieldType::RelationToOne | FieldType::RelationToMany => {
            get::<Option<String>>(row, column).map(FieldValue::from)
        }
        FieldType::Integer => get::<Option<i64>>(row, column)
            .or_else(|_| get::<Option<i32>>(row, column).map(|v| v.map(i64::from)))
            .or_else(|_| get::<Option<i16>>(row, column).map(|v| v.map(i64::from)))
            .map(FieldValue::from),
        FieldType::Decimal => get::<Option<Decimal>>(row, column)
            .and_then(|v| v.map(|d| decimal_to_big(&d)).transpose())
            .or_else(|_| get::<Option<f64>>(row, column).and_then(|v| v.map(f64_to_big).transpose()))
            .or_else(|_| get::<Option<i64>>(row, column).map(|v| v.map(BigDecimal::from)))
            .map(FieldValue::from),
        FieldType::Boolean => get::<Option<bool>>(row, column)
            .or_else(|_| get::<Option<i64>>(row, column).map(|v| v.map(|i| i != 0)))
            .map(FieldValue::from),
        FieldType::Date => get::<Option<NaiveDate>>(row, column)
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Date)),
        FieldType::DateTime => get::<Option<NaiveDateTime>>(row, column)
            .or_else(|_| {
                get::<Option<DateTime<Utc>>>(row, column).map(|v| v.map(|dt| dt.naive_utc()))
            })
            .map(|v| v.map_or(FieldValue::Null, FieldValue::DateTime)),
        FieldType::Binary => get::<Option<Vec<u8>>>(row, column)
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Binary)),
    };

    decoded.map_err(|message| DbError::Decode {
        column: column.to_string(),
        expected: value_type,
        message,
    })
}

fn decimal_to_big(d: &Decimal) -> std::result::Result<BigDecimal, String> {
    BigDecimal::from_str(&d.to_string()).map_err(|e| e.to_string())
}

fn f64_to_big(f: f64) -> std::result::Result<BigDecimal, String> {
    BigDecimal::from_str(&f.to_string()).map_err(|e| e.to_string())
}

/// Decode the root columns of a row in schema order.
pub fn decode_record(row: &QueryResult, schema: &SchemaDescriptor) -> Result<Record> {
    let mut record = Record::new();
    for field in schema.columns() {
        record.set(
            field.name(),
            decode_value(row, field.column(), field.value_type())?,
        );
    }
    Ok(record)
}

/// Read the `COUNT` column produced by `statements::count`.
pub fn decode_count(row: &QueryResult) -> Result<u64> {
    let n = get::<i64>(row, COUNT_ALIAS)
        .or_else(|_| get::<i32>(row, COUNT_ALIAS).map(i64::from))
        .map_err(|message| DbError::Decode {
            column: COUNT_ALIAS.to_string(),
            expected: FieldType::Integer,
            message,
        })?;
    Ok(u64::try_from(n).unwrap_or(0))
}
