//! Structured WHERE conditions
//!
//! Filters render to a fragment with `?` placeholders plus the values bound
//! to them, in placeholder order.

use type_mapping::SqlValue;

/// Query condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    Like,      // LIKE
    ILike,     // ILIKE (case insensitive)
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

/// Single condition in WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    /// Column expression, inserted verbatim
    pub field: String,
    pub operator: QueryOperator,
    pub values: Vec<SqlValue>,
}

/// Logical operators for combining conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Query filter that can be nested
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition(QueryCondition),
    Group {
        operator: LogicalOperator,
        filters: Vec<QueryFilter>,
    },
}

impl QueryFilter {
    pub fn condition(field: &str, operator: QueryOperator, values: Vec<SqlValue>) -> Self {
        Self::Condition(QueryCondition {
            field: field.to_string(),
            operator,
            values,
        })
    }

    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    pub fn eq(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Eq, vec![value.into()])
    }

    pub fn ne(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Ne, vec![value.into()])
    }

    pub fn gt(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Gt, vec![value.into()])
    }

    pub fn gte(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Gte, vec![value.into()])
    }

    pub fn lt(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Lt, vec![value.into()])
    }

    pub fn lte(field: &str, value: impl Into<SqlValue>) -> Self {
        Self::condition(field, QueryOperator::Lte, vec![value.into()])
    }

    pub fn like(field: &str, pattern: &str) -> Self {
        Self::condition(field, QueryOperator::Like, vec![pattern.into()])
    }

    pub fn ilike(field: &str, pattern: &str) -> Self {
        Self::condition(field, QueryOperator::ILike, vec![pattern.into()])
    }

    pub fn in_values<V: Into<SqlValue>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::condition(
            field,
            QueryOperator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn not_in_values<V: Into<SqlValue>>(
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::condition(
            field,
            QueryOperator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, Vec::new())
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, Vec::new())
    }

    /// Render the filter, appending its values to `params`
    pub fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            QueryFilter::Condition(condition) => condition.to_sql(params),
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    // Neutral element of the operator
                    return match operator {
                        LogicalOperator::And => "1=1".to_string(),
                        LogicalOperator::Or => "1=0".to_string(),
                    };
                }

                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|f| f.to_sql(params))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
        }
    }
}

impl QueryCondition {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let field = &self.field;

        let comparison = match self.operator {
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "!=",
            QueryOperator::Gt => ">",
            QueryOperator::Gte => ">=",
            QueryOperator::Lt => "<",
            QueryOperator::Lte => "<=",
            QueryOperator::Like => "LIKE",
            QueryOperator::ILike => "ILIKE",
            QueryOperator::IsNull => return format!("{} IS NULL", field),
            QueryOperator::IsNotNull => return format!("{} IS NOT NULL", field),
            QueryOperator::In | QueryOperator::NotIn => {
                let negated = self.operator == QueryOperator::NotIn;
                if self.values.is_empty() {
                    // Nothing is IN an empty list, everything is NOT IN it
                    return if negated { "1=1" } else { "1=0" }.to_string();
                }
                let placeholders = vec!["?"; self.values.len()].join(", ");
                params.extend(self.values.iter().cloned());
                let keyword = if negated { "NOT IN" } else { "IN" };
                return format!("{} {} ({})", field, keyword, placeholders);
            }
        };

        match self.values.first() {
            // Comparing with NULL never matches, use IS [NOT] NULL instead
            Some(value) if value.is_null() => match self.operator {
                QueryOperator::Eq => format!("{} IS NULL", field),
                QueryOperator::Ne => format!("{} IS NOT NULL", field),
                _ => "1=0".to_string(),
            },
            Some(value) => {
                params.push(value.clone());
                format!("{} {} ?", field, comparison)
            }
            None => "1=0".to_string(),
        }
    }
}
