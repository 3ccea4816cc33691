//! # RecordHaus
//!
//! Record persistence for PostgreSQL: table mappings derived from plain
//! structs, composable SELECT and DELETE queries, pooled connections with a
//! known session state and transactions that retry on serialization conflicts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recordhaus::prelude::*;
//!
//! #[record]
//! #[table(name = "customers")]
//! pub struct Customer {
//!     pub id: RecordId,
//!     pub name: String,
//!     #[field(insert_timestamp)]
//!     pub created_at: Option<DateTime<Utc>>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let services = DbServices::new(&config).await?;
//!     services.ensure_table::<Customer>(false).await?;
//!
//!     let mut customer = Customer {
//!         name: "Ada".to_string(),
//!         ..Default::default()
//!     };
//!     services.store_object(&mut customer).await?;
//!     println!("Stored customer {}", customer.id);
//!
//!     let found = services
//!         .retrieve_list(&SelectQuery::<Customer>::new().where_clause("name = ?", vec!["Ada".into()]))
//!         .await?;
//!     println!("Found {} customers", found.len());
//!
//!     Ok(())
//! }
//! ```

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

pub mod core;
pub mod datasource;
pub mod migration;
pub mod prelude;
pub mod retry;
pub mod session;

// Re-export the main public types for convenience
pub use core::DbServices;
pub use datasource::{DataSource, PooledConnection};
pub use session::DbSession;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, IsolationLevel, RetryConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use record_store;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use futures;
pub use sqlx;
