//! Unified type mapping between Rust types and PostgreSQL
//! This crate provides the runtime value model shared by field handlers,
//! query parameters and the record derive macro.

pub mod convert;
pub mod sql;
pub mod types;

pub use convert::{ConversionError, FromSqlValue, ToSqlValue};
pub use sql::{is_optional_type, normalize_type, rust_type_to_sql_kind, strip_option};
pub use types::{SqlKind, SqlValue};
