//! Error types for record operations
//!
//! Every failure is reported as a `DbError`. `DbError::class` groups the
//! variants so callers (and `transaction_with_retry`) can tell transient
//! conflicts apart from configuration, data and connectivity problems.

use config::ConfigError;
use thiserror::Error;
use type_mapping::ConversionError;

/// Coarse error classification used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Mapping or setup problem, fix the code or the schema
    Configuration,
    /// Serialization failure or deadlock, the unit of work may be retried
    Transient,
    /// The data does not allow the operation (missing row, constraint)
    Data,
    /// The database could not be reached
    Connectivity,
    /// The statement itself was rejected
    Statement,
}

/// Kind of concurrency conflict reported by PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// SQLSTATE 40001
    Serialization,
    /// SQLSTATE 40P01
    Deadlock,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("mapping error for {record}: {message}")]
    Mapping { record: String, message: String },

    #[error("table '{table}' does not exist")]
    MissingTable {
        table: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{conflict:?} conflict during {operation} on '{table}'")]
    Conflict {
        conflict: ConflictKind,
        table: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{table} record {id} not found")]
    NotFound { table: String, id: i64 },

    #[error("{table} record has not been stored yet")]
    NotPersisted { table: String },

    #[error("constraint violation during {operation} on '{table}'")]
    Constraint {
        table: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("conversion error on field '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: ConversionError,
    },

    #[error("connection error: {message}")]
    Connectivity {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("query failed during {operation} on '{table}': {sql}")]
    Query {
        table: String,
        operation: String,
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<DbError>,
    },
}

/// What a SQLSTATE code tells about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlStateClass {
    Conflict(ConflictKind),
    Constraint,
    Connectivity,
    MissingTable,
    Other,
}

/// Classify a PostgreSQL SQLSTATE code
pub fn classify_sqlstate(code: &str) -> SqlStateClass {
    match code {
        "40001" => SqlStateClass::Conflict(ConflictKind::Serialization),
        "40P01" => SqlStateClass::Conflict(ConflictKind::Deadlock),
        "42P01" => SqlStateClass::MissingTable,
        "57P01" | "57P02" | "57P03" => SqlStateClass::Connectivity,
        c if c.starts_with("23") => SqlStateClass::Constraint,
        c if c.starts_with("08") => SqlStateClass::Connectivity,
        _ => SqlStateClass::Other,
    }
}

impl DbError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DbError::Configuration(_)
            | DbError::Mapping { .. }
            | DbError::MissingTable { .. }
            | DbError::Config(_) => ErrorClass::Configuration,
            DbError::Conflict { .. } => ErrorClass::Transient,
            DbError::NotFound { .. }
            | DbError::NotPersisted { .. }
            | DbError::Constraint { .. }
            | DbError::Conversion { .. } => ErrorClass::Data,
            DbError::Connectivity { .. } => ErrorClass::Connectivity,
            DbError::Query { .. } => ErrorClass::Statement,
            DbError::RetriesExhausted { source, .. } => source.class(),
        }
    }

    /// True for serialization failures and deadlocks that were not yet retried
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Conflict { .. })
    }

    /// The SQLSTATE reported by the server, if any
    pub fn sqlstate(&self) -> Option<String> {
        let source = match self {
            DbError::Conflict { source, .. }
            | DbError::Constraint { source, .. }
            | DbError::Query { source, .. } => source,
            DbError::MissingTable {
                source: Some(source),
                ..
            }
            | DbError::Connectivity {
                source: Some(source),
                ..
            } => source,
            DbError::RetriesExhausted { source, .. } => return source.sqlstate(),
            _ => return None,
        };
        match source {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    pub fn mapping(record: &str, message: impl Into<String>) -> Self {
        DbError::Mapping {
            record: record.to_string(),
            message: message.into(),
        }
    }

    pub fn conversion(field: &str, source: ConversionError) -> Self {
        DbError::Conversion {
            field: field.to_string(),
            source,
        }
    }

    /// Classify a driver error raised while running `operation` against `table`
    pub fn from_sqlx(table: &str, operation: &str, sql: &str, err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        };

        if let Some(code) = code {
            return match classify_sqlstate(&code) {
                SqlStateClass::Conflict(conflict) => DbError::Conflict {
                    conflict,
                    table: table.to_string(),
                    operation: operation.to_string(),
                    source: err,
                },
                SqlStateClass::Constraint => DbError::Constraint {
                    table: table.to_string(),
                    operation: operation.to_string(),
                    source: err,
                },
                SqlStateClass::Connectivity => DbError::Connectivity {
                    message: format!("{} on '{}' lost its connection", operation, table),
                    source: Some(err),
                },
                SqlStateClass::MissingTable => DbError::MissingTable {
                    table: table.to_string(),
                    source: Some(err),
                },
                SqlStateClass::Other => DbError::Query {
                    table: table.to_string(),
                    operation: operation.to_string(),
                    sql: sql.to_string(),
                    source: err,
                },
            };
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DbError::Connectivity {
                message: format!("{} on '{}' could not reach the database", operation, table),
                source: Some(err),
            },
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => DbError::Mapping {
                record: table.to_string(),
                message: format!("{} failed to decode a row: {}", operation, err),
            },
            other => DbError::Query {
                table: table.to_string(),
                operation: operation.to_string(),
                sql: sql.to_string(),
                source: other,
            },
        }
    }

    /// Error for driver failures outside a specific table, e.g. BEGIN or COMMIT
    pub fn connection(operation: &str, err: sqlx::Error) -> Self {
        Self::from_sqlx("<connection>", operation, operation, err)
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlstate_classification() {
        assert_eq!(
            classify_sqlstate("40001"),
            SqlStateClass::Conflict(ConflictKind::Serialization)
        );
        assert_eq!(
            classify_sqlstate("40P01"),
            SqlStateClass::Conflict(ConflictKind::Deadlock)
        );
        assert_eq!(classify_sqlstate("23505"), SqlStateClass::Constraint);
        assert_eq!(classify_sqlstate("23503"), SqlStateClass::Constraint);
        assert_eq!(classify_sqlstate("08006"), SqlStateClass::Connectivity);
        assert_eq!(classify_sqlstate("57P01"), SqlStateClass::Connectivity);
        assert_eq!(classify_sqlstate("42P01"), SqlStateClass::MissingTable);
        assert_eq!(classify_sqlstate("42601"), SqlStateClass::Other);
    }

    #[test]
    fn test_driver_variants() {
        let err = DbError::from_sqlx("items", "insert", "INSERT ...", sqlx::Error::PoolTimedOut);
        assert_eq!(err.class(), ErrorClass::Connectivity);

        let err = DbError::from_sqlx(
            "items",
            "select",
            "SELECT ...",
            sqlx::Error::ColumnNotFound("name".to_string()),
        );
        assert_eq!(err.class(), ErrorClass::Configuration);

        let err = DbError::from_sqlx("items", "select", "SELECT ...", sqlx::Error::RowNotFound);
        assert_eq!(err.class(), ErrorClass::Statement);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_exhausted_keeps_source_class() {
        let err = DbError::RetriesExhausted {
            attempts: 3,
            source: Box::new(DbError::NotFound {
                table: "items".to_string(),
                id: 4,
            }),
        };
        assert_eq!(err.class(), ErrorClass::Data);
        assert!(!err.is_transient());
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_data_errors() {
        let err = DbError::NotPersisted {
            table: "items".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Data);
        assert_eq!(err.sqlstate(), None);
    }
}
