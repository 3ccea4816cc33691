//! DELETE query builder

use crate::errors::{DbError, DbResult};
use crate::query_builder::core::QueryCore;
use crate::query_builder::filter::QueryFilter;
use crate::query_builder::select::SelectQuery;
use crate::query_builder::statement::SqlStatement;
use crate::traits::Record;
use crate::validation::ValidatedTableName;
use std::fmt;
use std::marker::PhantomData;
use type_mapping::SqlValue;

/// `DELETE FROM "table" [AS alias] [WHERE ...]`
pub struct DeleteQuery<T = ()> {
    core: QueryCore,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> DeleteQuery<T> {
    pub fn new() -> Self {
        Self {
            core: QueryCore::new(T::table_name()),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Default for DeleteQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeleteQuery<T> {
    pub fn from_table(table: &str) -> DbResult<Self> {
        ValidatedTableName::new(table).map_err(|e| {
            DbError::Configuration(format!("invalid table name '{}': {}", table, e))
        })?;
        Ok(Self {
            core: QueryCore::new(table),
            _record: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        self.core.table()
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.core.set_alias(alias);
        self
    }

    pub fn where_clause(
        mut self,
        fragment: &str,
        params: impl IntoIterator<Item = SqlValue>,
    ) -> Self {
        self.core.add_where(fragment, params);
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.core.add_filter(&filter);
        self
    }

    pub fn where_in_subquery<S>(mut self, column: &str, subquery: &SelectQuery<S>) -> Self {
        self.core.inherit_error(subquery.core());
        self.core.add_where(
            format!("{} IN ({})", column, subquery.query_string()),
            subquery.query_parameters(),
        );
        self
    }

    pub fn separator(mut self, separator: &str) -> Self {
        self.core.set_separator(separator);
        self
    }

    pub fn query_string(&self) -> String {
        let mut clauses = vec![format!("DELETE FROM {}", self.core.table_clause())];
        clauses.extend(self.core.where_clause());
        clauses.join(self.core.separator())
    }

    pub fn query_parameters(&self) -> Vec<SqlValue> {
        self.core.where_params().to_vec()
    }

    pub fn statement(&self) -> DbResult<SqlStatement> {
        if let Some(err) = self.core.error() {
            return Err(err);
        }
        Ok(SqlStatement::new(self.query_string(), self.query_parameters()))
    }
}

impl<T> Clone for DeleteQuery<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DeleteQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteQuery")
            .field("sql", &self.query_string())
            .field("params", &self.query_parameters())
            .finish()
    }
}
