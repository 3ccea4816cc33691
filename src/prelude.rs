//! Convenience re-exports for common RecordHaus usage
//!
//! # Example
//!
//! ```rust
//! use recordhaus::prelude::*;
//!
//! // Records, queries, the facade and the config types are now in scope
//! ```

// Core RecordHaus components
pub use crate::core::DbServices;
pub use crate::datasource::{DataSource, PooledConnection};
pub use crate::session::DbSession;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, IsolationLevel, RetryConfig};

// Re-export commonly used record-store types for convenience
pub use record_store::prelude::*;

// Re-export record_store module for macro-generated code
pub use record_store;

// Common external dependencies
pub use futures::future::{BoxFuture, FutureExt};
pub use sqlx;
pub use tokio;
