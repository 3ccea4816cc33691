//! Typed JOIN clauses
//!
//! The joined table name and `USING` columns are quoted. `ON` operands and
//! aliases are written as given, so they may be qualified (`o.customer_id`).

use crate::validation::quote_identifier;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    /// FULL OUTER JOIN
    Full,
    /// Cartesian product, takes no condition
    Cross,
}

impl JoinType {
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// `ON left = right`
    On { left: String, right: String },
    /// `USING (a, b)`
    Using(Vec<String>),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub condition: JoinCondition,
}

impl JoinClause {
    fn with_condition(join_type: JoinType, table: impl Into<String>, condition: JoinCondition) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            condition,
        }
    }

    /// `<join> "table" ON left = right`
    pub fn new_on(
        join_type: JoinType,
        table: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        let condition = JoinCondition::On {
            left: left.into(),
            right: right.into(),
        };
        Self::with_condition(join_type, table, condition)
    }

    /// `<join> "table" USING ("a", "b")`
    pub fn new_using<C, I>(join_type: JoinType, table: impl Into<String>, columns: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = C>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        Self::with_condition(join_type, table, JoinCondition::Using(columns))
    }

    pub fn cross(table: impl Into<String>) -> Self {
        Self::with_condition(JoinType::Cross, table, JoinCondition::None)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name other fragments use for the joined table
    pub fn table_ref(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.join_type.to_sql(), quote_identifier(&self.table))?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        match &self.condition {
            JoinCondition::On { left, right } => write!(f, " ON {} = {}", left, right),
            JoinCondition::Using(columns) => {
                let quoted: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
                write!(f, " USING ({})", quoted.join(", "))
            }
            JoinCondition::None => Ok(()),
        }
    }
}
