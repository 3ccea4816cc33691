//! Rendered statements and parameter binding
//!
//! Builders render `?` placeholders so fragments and sub-selects compose in
//! any order. `SqlStatement::numbered_sql` turns them into the `$n`
//! placeholders PostgreSQL expects right before execution.

use crate::errors::{DbError, DbResult};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use type_mapping::{SqlKind, SqlValue};

/// SQL text with `?` placeholders and the values bound to them, in order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Replace each `?` outside quoted text with `$1`, `$2`, ...
    ///
    /// `??` stands for a literal `?`, so the JSONB operators are written
    /// `??`, `??|` and `??&`. Fails when the number of placeholders differs
    /// from the number of parameters.
    pub fn numbered_sql(&self) -> DbResult<String> {
        let mut out = String::with_capacity(self.sql.len() + self.params.len() * 2);
        let mut quote: Option<char> = None;
        let mut count = 0usize;

        let mut chars = self.sql.chars().peekable();
        while let Some(c) = chars.next() {
            match quote {
                Some(open) => {
                    // A doubled quote closes and reopens, which keeps the state right
                    if c == open {
                        quote = None;
                    }
                    out.push(c);
                }
                None => match c {
                    '\'' | '"' => {
                        quote = Some(c);
                        out.push(c);
                    }
                    '?' if chars.peek() == Some(&'?') => {
                        chars.next();
                        out.push('?');
                    }
                    '?' => {
                        count += 1;
                        out.push('$');
                        out.push_str(&count.to_string());
                    }
                    _ => out.push(c),
                },
            }
        }

        if count != self.params.len() {
            return Err(DbError::Configuration(format!(
                "statement has {} placeholders but {} parameters: {}",
                count,
                self.params.len(),
                self.sql
            )));
        }
        Ok(out)
    }
}

/// Bind one value, NULLs typed by their column kind
pub fn bind_value(
    query: Query<'_, Postgres, PgArguments>,
    value: SqlValue,
) -> Query<'_, Postgres, PgArguments> {
    match value {
        SqlValue::SmallInt(v) => query.bind(v),
        SqlValue::Integer(v) => query.bind(v),
        SqlValue::BigInt(v) => query.bind(v),
        SqlValue::Real(v) => query.bind(v),
        SqlValue::Double(v) => query.bind(v),
        SqlValue::Boolean(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Timestamp(v) => query.bind(v),
        SqlValue::Date(v) => query.bind(v),
        SqlValue::Uuid(v) => query.bind(v),
        SqlValue::Json(v) => query.bind(v),
        SqlValue::TextArray(v) => query.bind(v),
        SqlValue::Null(kind) => match kind {
            SqlKind::SmallInt => query.bind(None::<i16>),
            SqlKind::Integer => query.bind(None::<i32>),
            SqlKind::BigInt => query.bind(None::<i64>),
            SqlKind::Real => query.bind(None::<f32>),
            SqlKind::Double => query.bind(None::<f64>),
            SqlKind::Boolean => query.bind(None::<bool>),
            SqlKind::Text => query.bind(None::<String>),
            SqlKind::Timestamp => query.bind(None::<chrono::DateTime<chrono::Utc>>),
            SqlKind::Date => query.bind(None::<chrono::NaiveDate>),
            SqlKind::Uuid => query.bind(None::<uuid::Uuid>),
            SqlKind::Json => query.bind(None::<serde_json::Value>),
            SqlKind::TextArray => query.bind(None::<Vec<String>>),
        },
    }
}

/// Build a query from numbered SQL and its parameters
pub fn build_query(sql: &str, params: Vec<SqlValue>) -> Query<'_, Postgres, PgArguments> {
    params.into_iter().fold(sqlx::query(sql), bind_value)
}
