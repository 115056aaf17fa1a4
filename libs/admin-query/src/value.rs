use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::schema::FieldType;

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Naive formats tried in order before falling back to RFC 3339.
const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A typed scalar as read from, or written to, the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Null,
    String(String),
    Integer(i64),
    Decimal(BigDecimal),
    Boolean(bool),
    Date(NaiveDate),
    /// Always UTC.
    DateTime(NaiveDateTime),
    Binary(Vec<u8>),
}

impl FieldValue {
    /// Parse a literal with the given value type.
    ///
    /// `field` only names the field in the resulting `TypeMismatch`.
    pub fn parse(field: &str, value_type: FieldType, literal: &str) -> Result<Self> {
        let mismatch = || Error::TypeMismatch {
            field: field.to_string(),
            expected: value_type,
            value: literal.to_string(),
        };
        let trimmed = literal.trim();

        match value_type {
            FieldType::String | FieldType::Enum => Ok(FieldValue::String(literal.to_string())),
            FieldType::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| mismatch()),
            FieldType::Decimal => BigDecimal::from_str(trimmed)
                .map(FieldValue::Decimal)
                .map_err(|_| mismatch()),
            FieldType::Boolean => parse_bool(trimmed)
                .map(FieldValue::Boolean)
                .ok_or_else(mismatch),
            FieldType::Date => NaiveDate::parse_from_str(trimmed, DATE_FMT)
                .map(FieldValue::Date)
                .map_err(|_| mismatch()),
            FieldType::DateTime => parse_datetime(trimmed)
                .map(FieldValue::DateTime)
                .ok_or_else(mismatch),
            FieldType::Binary => B64
                .decode(trimmed)
                .map(FieldValue::Binary)
                .map_err(|_| mismatch()),
            // Relations are parsed through their key type.
            FieldType::RelationToOne | FieldType::RelationToMany => Err(mismatch()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Lower-cased text form compared by the text operators; `None` for NULL.
    pub fn text_key(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            other => Some(other.to_string().to_lowercase()),
        }
    }

    /// Typed ordering. `None` when either side is NULL or the types differ.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        use FieldValue::*;
        match (self, other) {
            (String(a), String(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Decimal(a), Decimal(b)) => Some(a.cmp(b)),
            (Integer(a), Decimal(b)) => Some(BigDecimal::from(*a).cmp(b)),
            (Decimal(a), Integer(b)) => Some(a.cmp(&BigDecimal::from(*b))),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Binary(a), Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_INPUTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Decimal(d) => write!(f, "{d}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FMT)),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FMT)),
            FieldValue::Binary(bytes) => f.write_str(&B64.encode(bytes)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            // Decimals keep full precision as strings.
            other => serializer.collect_str(other),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i64::from(i))
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<BigDecimal> for FieldValue {
    fn from(d: BigDecimal) -> Self {
        FieldValue::Decimal(d)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}
