//! Conversions between record field types and `SqlValue`
//!
//! Generated field bindings call `ToSqlValue` when a record is written and
//! `FromSqlValue` when a column is read back into a record.

use crate::types::{SqlKind, SqlValue};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("expected a {expected} value, got {actual}")]
    TypeMismatch { expected: SqlKind, actual: SqlKind },

    #[error("NULL is not allowed for a non-optional {0} field")]
    UnexpectedNull(SqlKind),

    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("malformed {kind} value: {message}")]
    Malformed { kind: SqlKind, message: String },
}

/// Field types that can be written to a column
pub trait ToSqlValue {
    fn to_sql_value(&self) -> SqlValue;

    /// Column kind used for NULL values of this type
    fn sql_kind() -> SqlKind
    where
        Self: Sized;
}

/// Field types that can be read back from a column
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError>;
}

fn mismatch(expected: SqlKind, value: &SqlValue) -> ConversionError {
    match value {
        SqlValue::Null(_) => ConversionError::UnexpectedNull(expected),
        other => ConversionError::TypeMismatch {
            expected,
            actual: other.kind(),
        },
    }
}

macro_rules! copy_value_impl {
    ($ty:ty, $variant:ident) => {
        impl ToSqlValue for $ty {
            fn to_sql_value(&self) -> SqlValue {
                SqlValue::$variant(*self)
            }

            fn sql_kind() -> SqlKind {
                SqlKind::$variant
            }
        }
    };
}

copy_value_impl!(i16, SmallInt);
copy_value_impl!(i32, Integer);
copy_value_impl!(i64, BigInt);
copy_value_impl!(f32, Real);
copy_value_impl!(f64, Double);
copy_value_impl!(bool, Boolean);
copy_value_impl!(Uuid, Uuid);
copy_value_impl!(DateTime<Utc>, Timestamp);
copy_value_impl!(NaiveDate, Date);

impl FromSqlValue for i16 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::SmallInt(v) => Ok(v),
            SqlValue::Integer(v) => i16::try_from(v).map_err(|_| ConversionError::OutOfRange {
                value: v.to_string(),
                target: "i16",
            }),
            SqlValue::BigInt(v) => i16::try_from(v).map_err(|_| ConversionError::OutOfRange {
                value: v.to_string(),
                target: "i16",
            }),
            other => Err(mismatch(SqlKind::SmallInt, &other)),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::SmallInt(v) => Ok(v.into()),
            SqlValue::Integer(v) => Ok(v),
            SqlValue::BigInt(v) => i32::try_from(v).map_err(|_| ConversionError::OutOfRange {
                value: v.to_string(),
                target: "i32",
            }),
            other => Err(mismatch(SqlKind::Integer, &other)),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::SmallInt(v) => Ok(v.into()),
            SqlValue::Integer(v) => Ok(v.into()),
            SqlValue::BigInt(v) => Ok(v),
            other => Err(mismatch(SqlKind::BigInt, &other)),
        }
    }
}

impl FromSqlValue for f32 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Real(v) => Ok(v),
            SqlValue::Double(v) => Ok(v as f32),
            other => Err(mismatch(SqlKind::Real, &other)),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Real(v) => Ok(v.into()),
            SqlValue::Double(v) => Ok(v),
            other => Err(mismatch(SqlKind::Double, &other)),
        }
    }
}

macro_rules! exact_from_impl {
    ($ty:ty, $variant:ident) => {
        impl FromSqlValue for $ty {
            fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
                match value {
                    SqlValue::$variant(v) => Ok(v),
                    other => Err(mismatch(SqlKind::$variant, &other)),
                }
            }
        }
    };
}

exact_from_impl!(bool, Boolean);
exact_from_impl!(String, Text);
exact_from_impl!(Uuid, Uuid);
exact_from_impl!(DateTime<Utc>, Timestamp);
exact_from_impl!(NaiveDate, Date);
exact_from_impl!(serde_json::Value, Json);
exact_from_impl!(Vec<String>, TextArray);

impl ToSqlValue for String {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn sql_kind() -> SqlKind {
        SqlKind::Text
    }
}

impl ToSqlValue for serde_json::Value {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Json(self.clone())
    }

    fn sql_kind() -> SqlKind {
        SqlKind::Json
    }
}

impl ToSqlValue for Vec<String> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::TextArray(self.clone())
    }

    fn sql_kind() -> SqlKind {
        SqlKind::TextArray
    }
}

// Property maps travel as a flat JSON object of strings
impl ToSqlValue for HashMap<String, String> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::from(self.clone())
    }

    fn sql_kind() -> SqlKind {
        SqlKind::Json
    }
}

impl FromSqlValue for HashMap<String, String> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Json(json) => {
                serde_json::from_value(json).map_err(|e| ConversionError::Malformed {
                    kind: SqlKind::Json,
                    message: e.to_string(),
                })
            }
            other => Err(mismatch(SqlKind::Json, &other)),
        }
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null(T::sql_kind()),
        }
    }

    fn sql_kind() -> SqlKind {
        T::sql_kind()
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Null(_) => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}
