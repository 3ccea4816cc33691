//! Field handlers
//!
//! A `FieldHandler` knows one column type and converts between the value a
//! record field produces and what is stored in the column. `FieldMapping`
//! pairs a handler with the generated accessors of a single field.

use crate::errors::{DbError, DbResult};
use crate::traits::FieldBinding;
use crate::validation::quote_identifier;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt;
use std::sync::Arc;
use type_mapping::{is_optional_type, SqlKind, SqlValue};

/// Column strategy for a mapped field
pub trait FieldHandler: Send + Sync {
    /// Type of the column in the database
    fn column_type(&self) -> SqlKind;

    /// Read the column at `index` and return the value in the record's representation
    fn extract(&self, row: &PgRow, index: usize) -> DbResult<SqlValue>;

    /// Convert a record value into the value written to the column
    fn to_column(&self, value: SqlValue) -> DbResult<SqlValue>;
}

fn decode_error(row: &PgRow, index: usize, err: sqlx::Error) -> DbError {
    let column = row
        .try_column(index)
        .map(|c| sqlx::Column::name(c).to_string())
        .unwrap_or_else(|_| format!("#{}", index));
    DbError::mapping(&column, format!("cannot decode column: {}", err))
}

/// Decode one column as the given kind, NULL included
pub fn decode_column(row: &PgRow, index: usize, kind: SqlKind) -> DbResult<SqlValue> {
    fn get<'r, V>(row: &'r PgRow, index: usize) -> Result<Option<V>, sqlx::Error>
    where
        V: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<Option<V>, _>(index)
    }

    let value = match kind {
        SqlKind::SmallInt => get::<i16>(row, index).map(|v| v.map(SqlValue::SmallInt)),
        SqlKind::Integer => get::<i32>(row, index).map(|v| v.map(SqlValue::Integer)),
        SqlKind::BigInt => get::<i64>(row, index).map(|v| v.map(SqlValue::BigInt)),
        SqlKind::Real => get::<f32>(row, index).map(|v| v.map(SqlValue::Real)),
        SqlKind::Double => get::<f64>(row, index).map(|v| v.map(SqlValue::Double)),
        SqlKind::Boolean => get::<bool>(row, index).map(|v| v.map(SqlValue::Boolean)),
        SqlKind::Text => get::<String>(row, index).map(|v| v.map(SqlValue::Text)),
        SqlKind::Timestamp => get::<chrono::DateTime<chrono::Utc>>(row, index)
            .map(|v| v.map(SqlValue::Timestamp)),
        SqlKind::Date => get::<chrono::NaiveDate>(row, index).map(|v| v.map(SqlValue::Date)),
        SqlKind::Uuid => get::<uuid::Uuid>(row, index).map(|v| v.map(SqlValue::Uuid)),
        SqlKind::Json => get::<serde_json::Value>(row, index).map(|v| v.map(SqlValue::Json)),
        SqlKind::TextArray => {
            get::<Vec<String>>(row, index).map(|v| v.map(SqlValue::TextArray))
        }
    };

    value
        .map(|v| v.unwrap_or(SqlValue::Null(kind)))
        .map_err(|e| decode_error(row, index, e))
}

/// Handler for every type with a native column kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultFieldHandler {
    kind: SqlKind,
}

impl DefaultFieldHandler {
    pub fn new(kind: SqlKind) -> Self {
        Self { kind }
    }
}

impl FieldHandler for DefaultFieldHandler {
    fn column_type(&self) -> SqlKind {
        self.kind
    }

    fn extract(&self, row: &PgRow, index: usize) -> DbResult<SqlValue> {
        decode_column(row, index, self.kind)
    }

    fn to_column(&self, value: SqlValue) -> DbResult<SqlValue> {
        Ok(value)
    }
}

/// Stores a `Vec<String>` as one delimited text column
///
/// Lists that would not read back unchanged are rejected: items containing
/// the separator, and a list holding a single empty item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringListHandler {
    separator: String,
}

impl StringListHandler {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl Default for StringListHandler {
    fn default() -> Self {
        Self::new(",")
    }
}

impl FieldHandler for StringListHandler {
    fn column_type(&self) -> SqlKind {
        SqlKind::Text
    }

    fn extract(&self, row: &PgRow, index: usize) -> DbResult<SqlValue> {
        Ok(match decode_column(row, index, SqlKind::Text)? {
            SqlValue::Text(text) if text.is_empty() => SqlValue::TextArray(Vec::new()),
            SqlValue::Text(text) => SqlValue::TextArray(
                text.split(self.separator.as_str())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => SqlValue::Null(SqlKind::TextArray),
        })
    }

    fn to_column(&self, value: SqlValue) -> DbResult<SqlValue> {
        match value {
            SqlValue::TextArray(items) => {
                if let Some(item) = items.iter().find(|item| item.contains(self.separator.as_str())) {
                    return Err(DbError::mapping(
                        "StringListHandler",
                        format!("item {:?} contains the separator {:?}", item, self.separator),
                    ));
                }
                if items.len() == 1 && items[0].is_empty() {
                    return Err(DbError::mapping(
                        "StringListHandler",
                        "a list holding one empty item reads back as an empty list",
                    ));
                }
                Ok(SqlValue::Text(items.join(&self.separator)))
            }
            SqlValue::Null(_) => Ok(SqlValue::Null(SqlKind::Text)),
            other => Err(DbError::mapping(
                "StringListHandler",
                format!("expected a string list, got {}", other.kind()),
            )),
        }
    }
}

/// A persisted field: generated accessors plus the column handler
pub struct FieldMapping<T> {
    binding: FieldBinding<T>,
    handler: Arc<dyn FieldHandler>,
}

impl<T> FieldMapping<T> {
    pub fn new(binding: FieldBinding<T>, handler: Arc<dyn FieldHandler>) -> Self {
        Self { binding, handler }
    }

    /// Logical field name, also used as the column name
    pub fn field_name(&self) -> &'static str {
        self.binding.name
    }

    /// In-memory type as written in the struct
    pub fn rust_type(&self) -> &'static str {
        self.binding.rust_type
    }

    pub fn sql_type(&self) -> SqlKind {
        self.handler.column_type()
    }

    pub fn is_nullable(&self) -> bool {
        is_optional_type(self.binding.rust_type)
    }

    pub fn is_insert_timestamp(&self) -> bool {
        self.binding.insert_timestamp
    }

    /// `"name" TYPE [NOT NULL]` for CREATE TABLE
    pub fn column_definition(&self) -> String {
        let constraint = if self.is_nullable() { "" } else { " NOT NULL" };
        format!(
            "{} {}{}",
            quote_identifier(self.binding.name),
            self.sql_type().ddl(),
            constraint
        )
    }

    /// Decode column `index` of `row` into the field of `record`
    pub fn extract_from_row(&self, record: &mut T, row: &PgRow, index: usize) -> DbResult<()> {
        let value = self.handler.extract(row, index)?;
        (self.binding.set)(record, value)
            .map_err(|e| DbError::conversion(self.binding.name, e))
    }

    /// Value to bind for this field's column
    pub fn bind_value(&self, record: &T) -> DbResult<SqlValue> {
        self.handler.to_column((self.binding.get)(record))
    }

    /// Convert a value for this field's column without reading a record
    pub fn column_value(&self, value: SqlValue) -> DbResult<SqlValue> {
        self.handler.to_column(value)
    }

    /// Write a value straight into the field, bypassing the handler
    pub fn assign(&self, record: &mut T, value: SqlValue) -> DbResult<()> {
        (self.binding.set)(record, value)
            .map_err(|e| DbError::conversion(self.binding.name, e))
    }
}

impl<T> fmt::Debug for FieldMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("field", &self.binding.name)
            .field("rust_type", &self.binding.rust_type)
            .field("sql_type", &self.sql_type())
            .finish()
    }
}
