//! SELECT query builder
//!
//! Clauses are appended in call order and rendered as
//! `SELECT … FROM … JOIN … WHERE … GROUP BY … ORDER BY … LIMIT … OFFSET … suffix`.
//! Parameters come out in the order their placeholders appear: SELECT list,
//! then JOINs, then WHERE.

use crate::errors::{DbError, DbResult};
use crate::query_builder::core::QueryCore;
use crate::query_builder::filter::QueryFilter;
use crate::query_builder::join::JoinClause;
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::statement::SqlStatement;
use crate::traits::Record;
use crate::validation::ValidatedTableName;
use std::fmt;
use std::marker::PhantomData;
use type_mapping::SqlValue;

pub struct SelectQuery<T = ()> {
    core: QueryCore,
    select_fragments: Vec<String>,
    select_params: Vec<SqlValue>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    suffix: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SelectQuery<T> {
    /// Query on the table of record type `T`
    pub fn new() -> Self {
        Self::with_core(QueryCore::new(T::table_name()))
    }
}

impl<T: Record> Default for SelectQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SelectQuery<T> {
    /// Query on any table
    pub fn from_table(table: &str) -> DbResult<Self> {
        ValidatedTableName::new(table).map_err(|e| {
            DbError::Configuration(format!("invalid table name '{}': {}", table, e))
        })?;
        Ok(Self::with_core(QueryCore::new(table)))
    }

    fn with_core(core: QueryCore) -> Self {
        Self {
            core,
            select_fragments: Vec::new(),
            select_params: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            suffix: Vec::new(),
            limit: None,
            offset: None,
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        self.core.table()
    }

    pub(crate) fn core(&self) -> &QueryCore {
        &self.core
    }

    /// Name the table in FROM; later fragments refer to it by this alias
    pub fn alias(mut self, alias: &str) -> Self {
        self.core.set_alias(alias);
        self
    }

    /// Add an expression to the SELECT list, verbatim
    pub fn select(mut self, expression: &str) -> Self {
        self.select_fragments.push(expression.to_string());
        self
    }

    /// Add `(sub-select) AS alias` to the SELECT list
    pub fn select_subquery<S>(mut self, subquery: &SelectQuery<S>, alias: &str) -> Self {
        self.core.check_identifier(alias);
        self.core.inherit_error(&subquery.core);
        self.select_fragments
            .push(format!("({}) AS {}", subquery.query_string(), alias));
        self.select_params.extend(subquery.query_parameters());
        self
    }

    /// Add a WHERE fragment with `?` placeholders and the values for them
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

    /// `column IN (sub-select)`
    pub fn where_in_subquery<S>(mut self, column: &str, subquery: &SelectQuery<S>) -> Self {
        self.core.inherit_error(&subquery.core);
        self.core.add_where(
            format!("{} IN ({})", column, subquery.query_string()),
            subquery.query_parameters(),
        );
        self
    }

    /// Add a raw JOIN fragment with `?` placeholders and the values for them
    pub fn join(mut self, fragment: &str, params: impl IntoIterator<Item = SqlValue>) -> Self {
        self.core.add_join(fragment, params);
        self
    }

    pub fn join_on(mut self, join: JoinClause) -> Self {
        if let Some(alias) = &join.alias {
            self.core.check_identifier(alias);
        }
        self.core.add_join(join.to_sql(), Vec::new());
        self
    }

    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    /// Append a sort key; keys apply in call order
    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order_by
            .push(format!("{} {}", column, order.to_sql()));
        self
    }

    /// Trailing text such as `FOR UPDATE`
    pub fn suffix(mut self, text: &str) -> Self {
        self.suffix.push(text.to_string());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Clause separator, a single space by default; `"\n"` helps when reading logs
    pub fn separator(mut self, separator: &str) -> Self {
        self.core.set_separator(separator);
        self
    }

    /// The SQL text with `?` placeholders
    pub fn query_string(&self) -> String {
        let select_list = if self.select_fragments.is_empty() {
            format!("{}.*", self.core.table_ref())
        } else {
            self.select_fragments.join(", ")
        };

        let mut clauses = vec![
            format!("SELECT {}", select_list),
            format!("FROM {}", self.core.table_clause()),
        ];
        clauses.extend(self.core.join_clause());
        clauses.extend(self.core.where_clause());
        if !self.group_by.is_empty() {
            clauses.push(format!("GROUP BY {}", self.group_by.join(", ")));
        }
        if !self.order_by.is_empty() {
            clauses.push(format!("ORDER BY {}", self.order_by.join(", ")));
        }
        if let Some(limit) = self.limit {
            clauses.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            clauses.push(format!("OFFSET {}", offset));
        }
        clauses.extend(self.suffix.iter().cloned());

        clauses.join(self.core.separator())
    }

    /// Values for the placeholders of `query_string`, in order
    pub fn query_parameters(&self) -> Vec<SqlValue> {
        let mut params = Vec::with_capacity(
            self.select_params.len()
                + self.core.join_params().len()
                + self.core.where_params().len(),
        );
        params.extend_from_slice(&self.select_params);
        params.extend_from_slice(self.core.join_params());
        params.extend_from_slice(self.core.where_params());
        params
    }

    /// Rendered statement, or the first invalid identifier passed to the builder
    pub fn statement(&self) -> DbResult<SqlStatement> {
        if let Some(err) = self.core.error() {
            return Err(err);
        }
        Ok(SqlStatement::new(self.query_string(), self.query_parameters()))
    }
}

impl<T> Clone for SelectQuery<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            select_fragments: self.select_fragments.clone(),
            select_params: self.select_params.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            suffix: self.suffix.clone(),
            limit: self.limit,
            offset: self.offset,
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SelectQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("sql", &self.query_string())
            .field("params", &self.query_parameters())
            .finish()
    }
}
