//! Convenience re-exports for common record-store usage

// Record contract and derive macros
pub use crate::traits::FieldBinding;
pub use crate::{record, Record};

// Mapping
pub use crate::class_handler::ClassHandler;
pub use crate::field::{DefaultFieldHandler, FieldHandler, StringListHandler};
pub use crate::id_type::RecordId;
pub use crate::registry::HandlerRegistry;

// Errors
pub use crate::errors::{DbError, DbResult, ErrorClass};

// Query building
pub use crate::query_builder::{
    DeleteQuery, JoinClause, JoinType, QueryFilter, SelectQuery, SortOrder,
};

// Values
pub use type_mapping::{SqlKind, SqlValue};

// Common external dependencies that are frequently used
pub use chrono::{DateTime, NaiveDate, Utc};
pub use uuid::Uuid;
