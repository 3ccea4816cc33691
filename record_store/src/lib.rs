//! Record Store - mapping and persistence layer for RecordHaus
//!
//! This crate turns record types into table mappings (`ClassHandler`),
//! builds SELECT and DELETE queries and runs record operations on a
//! PostgreSQL connection.

// Generated code refers to this crate as `record_store`, also from inside it
extern crate self as record_store;

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod class_handler;
pub mod errors;
pub mod field;
pub mod id_type;
pub mod ops;
pub mod prelude;
pub mod query_builder;
pub mod registry;
pub mod traits;
pub mod validation;

pub use class_handler::ClassHandler;
pub use errors::{ConflictKind, DbError, DbResult, ErrorClass};
pub use field::{DefaultFieldHandler, FieldHandler, FieldMapping, StringListHandler};
pub use id_type::RecordId;
pub use query_builder::{
    DeleteQuery, JoinClause, JoinType, QueryFilter, QueryOperator, SelectQuery, SortOrder,
    SqlStatement,
};
pub use registry::HandlerRegistry;
pub use traits::{FieldBinding, Record};
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

pub use record_derive::{record, Record};
pub use type_mapping::{ConversionError, FromSqlValue, SqlKind, SqlValue, ToSqlValue};
