//! Id Type module
//!
//! `RecordId` is the identity of a stored record. The value `-1` marks a
//! record that has no row, either because it was never stored or because
//! its row was deleted.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use type_mapping::{ConversionError, FromSqlValue, SqlKind, SqlValue, ToSqlValue};

/// Database-generated identity of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Identity of a record without a row
    pub const UNSET: RecordId = RecordId(-1);

    pub const fn new(value: i64) -> Self {
        RecordId(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// True when the identity refers to a stored row
    pub const fn is_persisted(self) -> bool {
        self.0 >= 0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::UNSET
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(id)
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId(id.into())
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl From<RecordId> for SqlValue {
    fn from(id: RecordId) -> Self {
        SqlValue::BigInt(id.0)
    }
}

impl ToSqlValue for RecordId {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::BigInt(self.0)
    }

    fn sql_kind() -> SqlKind {
        SqlKind::BigInt
    }
}

impl FromSqlValue for RecordId {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        i64::from_sql_value(value).map(RecordId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unset() {
        let id = RecordId::default();
        assert_eq!(id, RecordId::UNSET);
        assert_eq!(id.value(), -1);
        assert!(!id.is_persisted());
    }

    #[test]
    fn test_zero_is_a_valid_identity() {
        assert!(RecordId::new(0).is_persisted());
        assert_eq!(RecordId::from(42i64).to_string(), "42");
    }

    #[test]
    fn test_sql_value_conversion() {
        let id = RecordId::new(9);
        assert_eq!(id.to_sql_value(), SqlValue::BigInt(9));
        assert_eq!(RecordId::from_sql_value(SqlValue::Integer(9)), Ok(id));
        assert!(RecordId::from_sql_value(SqlValue::Null(SqlKind::BigInt)).is_err());
    }
}
