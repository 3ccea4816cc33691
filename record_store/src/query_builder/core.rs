//! State shared by the SELECT and DELETE builders

use crate::errors::DbError;
use crate::query_builder::filter::QueryFilter;
use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};
use type_mapping::SqlValue;

/// Table, alias and WHERE/JOIN fragments with their parameters
#[derive(Debug, Clone)]
pub struct QueryCore {
    table: String,
    alias: Option<String>,
    where_fragments: Vec<String>,
    where_params: Vec<SqlValue>,
    join_fragments: Vec<String>,
    join_params: Vec<SqlValue>,
    separator: String,
    /// First invalid identifier passed to the builder, reported when the query runs
    invalid: Option<ValidationError>,
}

impl QueryCore {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            alias: None,
            where_fragments: Vec::new(),
            where_params: Vec::new(),
            join_fragments: Vec::new(),
            join_params: Vec::new(),
            separator: " ".to_string(),
            invalid: ValidatedTableName::new(table).err(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn set_separator(&mut self, separator: &str) {
        self.separator = separator.to_string();
    }

    pub fn set_alias(&mut self, alias: &str) {
        self.check_identifier(alias);
        self.alias = Some(alias.to_string());
    }

    /// Record the first invalid identifier
    pub fn check_identifier(&mut self, name: &str) {
        if self.invalid.is_none() {
            self.invalid = ValidatedFieldName::new(name).err();
        }
    }

    pub fn inherit_error(&mut self, other: &QueryCore) {
        if self.invalid.is_none() {
            self.invalid = other.invalid.clone();
        }
    }

    pub fn error(&self) -> Option<DbError> {
        self.invalid.as_ref().map(|e| {
            DbError::Configuration(format!("invalid identifier in query on '{}': {}", self.table, e))
        })
    }

    /// Alias if set, otherwise the quoted table name
    pub fn table_ref(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => crate::validation::quote_identifier(&self.table),
        }
    }

    /// `"table"` or `"table" AS alias`
    pub fn table_clause(&self) -> String {
        let quoted = crate::validation::quote_identifier(&self.table);
        match &self.alias {
            Some(alias) => format!("{} AS {}", quoted, alias),
            None => quoted,
        }
    }

    pub fn add_where(&mut self, fragment: impl Into<String>, params: impl IntoIterator<Item = SqlValue>) {
        self.where_fragments.push(fragment.into());
        self.where_params.extend(params);
    }

    pub fn add_filter(&mut self, filter: &QueryFilter) {
        let mut params = Vec::new();
        let fragment = filter.to_sql(&mut params);
        self.add_where(fragment, params);
    }

    pub fn add_join(&mut self, fragment: impl Into<String>, params: impl IntoIterator<Item = SqlValue>) {
        self.join_fragments.push(fragment.into());
        self.join_params.extend(params);
    }

    /// `WHERE a` for one fragment, `WHERE (a) AND (b)` for several
    pub fn where_clause(&self) -> Option<String> {
        match self.where_fragments.as_slice() {
            [] => None,
            [single] => Some(format!("WHERE {}", single)),
            many => {
                let parts: Vec<String> = many.iter().map(|f| format!("({})", f)).collect();
                Some(format!("WHERE {}", parts.join(" AND ")))
            }
        }
    }

    pub fn join_clause(&self) -> Option<String> {
        if self.join_fragments.is_empty() {
            None
        } else {
            Some(self.join_fragments.join(&self.separator))
        }
    }

    pub fn where_params(&self) -> &[SqlValue] {
        &self.where_params
    }

    pub fn join_params(&self) -> &[SqlValue] {
        &self.join_params
    }
}
