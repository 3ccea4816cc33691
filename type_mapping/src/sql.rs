//! SQL type conversion utilities
//!
//! This module maps Rust type names, as written in a struct definition,
//! to the column kinds the default field handler can bind and decode.

use crate::types::SqlKind;

/// Remove all whitespace so `Option < i64 >` and `Option<i64>` compare equal
pub fn normalize_type(rust_type: &str) -> String {
    rust_type.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Check if a Rust type is Optional (nullable in SQL)
pub fn is_optional_type(rust_type: &str) -> bool {
    let normalized = normalize_type(rust_type);
    normalized.starts_with("Option<") || normalized.starts_with("std::option::Option<")
}

/// Inner type of an `Option<..>`, or the type itself
pub fn strip_option(rust_type: &str) -> String {
    let normalized = normalize_type(rust_type);
    for prefix in ["std::option::Option<", "Option<"] {
        if let Some(inner) = normalized
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return inner.to_string();
        }
    }
    normalized
}

/// Map a Rust type name to the column kind of the default field handler.
///
/// Returns `None` for types that need a custom field handler.
pub fn rust_type_to_sql_kind(rust_type: &str) -> Option<SqlKind> {
    let inner = strip_option(rust_type);
    let kind = match inner.as_str() {
        "RecordId" | "record_store::RecordId" | "recordhaus::RecordId" => SqlKind::BigInt,
        "i16" => SqlKind::SmallInt,
        "i32" => SqlKind::Integer,
        "i64" => SqlKind::BigInt,
        "f32" => SqlKind::Real,
        "f64" => SqlKind::Double,
        "bool" => SqlKind::Boolean,
        "String" | "std::string::String" => SqlKind::Text,
        "Uuid" | "uuid::Uuid" => SqlKind::Uuid,
        "DateTime<Utc>" | "chrono::DateTime<chrono::Utc>" | "chrono::DateTime<Utc>" => {
            SqlKind::Timestamp
        }
        "NaiveDate" | "chrono::NaiveDate" => SqlKind::Date,
        "Value" | "serde_json::Value" => SqlKind::Json,
        "HashMap<String,String>" | "std::collections::HashMap<String,String>" => SqlKind::Json,
        "Vec<String>" => SqlKind::TextArray,
        _ => return None,
    };
    Some(kind)
}
