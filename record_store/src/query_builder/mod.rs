//! Query builder utilities
//!
//! Builders render SQL with `?` placeholders and keep the values in
//! placeholder order. `SqlStatement` numbers the placeholders for PostgreSQL.

mod core;
pub mod delete;
pub mod filter;
pub mod join;
pub mod ordering;
pub mod select;
pub mod statement;


pub use delete::DeleteQuery;
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use join::{JoinClause, JoinCondition, JoinType};
pub use ordering::SortOrder;
pub use select::SelectQuery;
pub use statement::{build_query, SqlStatement};
