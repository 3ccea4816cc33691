//! Type mapping definitions
//!
//! `SqlKind` names the PostgreSQL column families the engine knows how to
//! bind and decode, `SqlValue` carries one runtime value of such a column.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Column type family of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlKind {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Boolean,
    Text,
    Timestamp,
    Date,
    Uuid,
    Json,
    TextArray,
}

impl SqlKind {
    /// PostgreSQL type used in CREATE TABLE statements
    pub fn ddl(&self) -> &'static str {
        match self {
            SqlKind::SmallInt => "SMALLINT",
            SqlKind::Integer => "INTEGER",
            SqlKind::BigInt => "BIGINT",
            SqlKind::Real => "REAL",
            SqlKind::Double => "DOUBLE PRECISION",
            SqlKind::Boolean => "BOOLEAN",
            SqlKind::Text => "VARCHAR",
            SqlKind::Timestamp => "TIMESTAMP WITH TIME ZONE",
            SqlKind::Date => "DATE",
            SqlKind::Uuid => "UUID",
            SqlKind::Json => "JSONB",
            SqlKind::TextArray => "TEXT[]",
        }
    }
}

impl fmt::Display for SqlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ddl())
    }
}

/// A single SQL value, either bound as a statement parameter or decoded from a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Boolean(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(Uuid),
    Json(serde_json::Value),
    TextArray(Vec<String>),
    /// NULL still carries its column type; PostgreSQL needs it to plan the parameter
    Null(SqlKind),
}

impl SqlValue {
    /// Kind of the column this value belongs to
    pub fn kind(&self) -> SqlKind {
        match self {
            SqlValue::SmallInt(_) => SqlKind::SmallInt,
            SqlValue::Integer(_) => SqlKind::Integer,
            SqlValue::BigInt(_) => SqlKind::BigInt,
            SqlValue::Real(_) => SqlKind::Real,
            SqlValue::Double(_) => SqlKind::Double,
            SqlValue::Boolean(_) => SqlKind::Boolean,
            SqlValue::Text(_) => SqlKind::Text,
            SqlValue::Timestamp(_) => SqlKind::Timestamp,
            SqlValue::Date(_) => SqlKind::Date,
            SqlValue::Uuid(_) => SqlKind::Uuid,
            SqlValue::Json(_) => SqlKind::Json,
            SqlValue::TextArray(_) => SqlKind::TextArray,
            SqlValue::Null(kind) => *kind,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }
}

impl From<String> for SqlValue {
    fn from(val: String) -> Self {
        SqlValue::Text(val)
    }
}

impl From<&str> for SqlValue {
    fn from(val: &str) -> Self {
        SqlValue::Text(val.to_string())
    }
}

impl From<i16> for SqlValue {
    fn from(val: i16) -> Self {
        SqlValue::SmallInt(val)
    }
}

impl From<i32> for SqlValue {
    fn from(val: i32) -> Self {
        SqlValue::Integer(val)
    }
}

impl From<i64> for SqlValue {
    fn from(val: i64) -> Self {
        SqlValue::BigInt(val)
    }
}

impl From<f32> for SqlValue {
    fn from(val: f32) -> Self {
        SqlValue::Real(val)
    }
}

impl From<f64> for SqlValue {
    fn from(val: f64) -> Self {
        SqlValue::Double(val)
    }
}

impl From<bool> for SqlValue {
    fn from(val: bool) -> Self {
        SqlValue::Boolean(val)
    }
}

impl From<Uuid> for SqlValue {
    fn from(val: Uuid) -> Self {
        SqlValue::Uuid(val)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(val: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(val)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(val: NaiveDate) -> Self {
        SqlValue::Date(val)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(val: serde_json::Value) -> Self {
        SqlValue::Json(val)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(val: Vec<String>) -> Self {
        SqlValue::TextArray(val)
    }
}

impl From<HashMap<String, String>> for SqlValue {
    fn from(val: HashMap<String, String>) -> Self {
        SqlValue::Json(serde_json::Value::Object(
            val.into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect(),
        ))
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue> + crate::convert::ToSqlValue,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => SqlValue::Null(T::sql_kind()),
        }
    }
}
