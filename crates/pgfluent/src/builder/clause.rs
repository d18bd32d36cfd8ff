//! Accumulated clauses: predicates, order terms, columns and pagination.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;

/// Boolean connector joining a predicate to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// One WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: String,
    pub value: Value,
    pub connector: Connector,
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse `asc`/`desc`, ignoring case.
    pub fn parse(direction: &str) -> OrmResult<Self> {
        match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(OrmError::InvalidOrderDirection(direction.to_string())),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Direction,
}

/// A condition supplied in bulk to `where_conditions`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Eq(String, Value),
    /// `column <operator> value`
    Op(String, String, Value),
}

impl Condition {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Condition::Eq(column.to_string(), value.into())
    }

    pub fn op(column: &str, operator: &str, value: impl Into<Value>) -> Self {
        Condition::Op(column.to_string(), operator.to_string(), value.into())
    }
}

impl<V: Into<Value>> From<(&str, V)> for Condition {
    fn from((column, value): (&str, V)) -> Self {
        Condition::eq(column, value)
    }
}

impl<V: Into<Value>> From<(&str, &str, V)> for Condition {
    fn from((column, operator, value): (&str, &str, V)) -> Self {
        Condition::op(column, operator, value)
    }
}

/// Everything a SELECT/DELETE needs besides the table name.
#[derive(Debug, Clone, PartialEq)]
pub struct Clauses {
    pub columns: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub orders: Vec<OrderTerm>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Default for Clauses {
    fn default() -> Self {
        Self {
            columns: vec!["*".to_string()],
            predicates: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl Clauses {
    /// Append a predicate as-is.
    pub fn add_predicate(
        &mut self,
        column: &str,
        operator: &str,
        value: Value,
        connector: Connector,
    ) {
        self.predicates.push(Predicate {
            column: column.to_string(),
            operator: operator.to_string(),
            value,
            connector,
        });
    }

    pub fn add_order(&mut self, column: &str, direction: Direction) {
        self.orders.push(OrderTerm {
            column: column.to_string(),
            direction,
        });
    }

    /// Negative values leave the current limit untouched.
    pub fn set_limit(&mut self, n: i64) {
        if let Ok(n) = u64::try_from(n) {
            self.limit = Some(n);
        }
    }

    /// Negative values leave the current offset untouched.
    pub fn set_offset(&mut self, n: i64) {
        if let Ok(n) = u64::try_from(n) {
            self.offset = Some(n);
        }
    }

    /// Replace the selected columns; an empty selection means `*`.
    pub fn set_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleared = clear_columns(columns);
        self.columns = if cleared.is_empty() {
            vec!["*".to_string()]
        } else {
            cleared
        };
    }
}

/// Split a comma-separated column list.
pub fn split_columns(columns: &str) -> Vec<String> {
    clear_columns(columns.split(','))
}

/// Drop absent entries (empty or single-space) from a column list and trim the rest.
pub fn clear_columns<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .filter_map(|c| {
            let c: &str = c.as_ref();
            let trimmed = c.trim();
            (!Value::from(c).is_absent() && !trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_case_insensitive() {
        assert_eq!(Direction::parse("ASC").unwrap(), Direction::Asc);
        assert_eq!(Direction::parse("Desc").unwrap(), Direction::Desc);
        assert!(matches!(
            Direction::parse("sideways"),
            Err(OrmError::InvalidOrderDirection(d)) if d == "sideways"
        ));
    }

    #[test]
    fn negative_limit_and_offset_are_ignored() {
        let mut c = Clauses::default();
        c.set_limit(10);
        c.set_limit(-1);
        c.set_offset(-5);
        assert_eq!(c.limit, Some(10));
        assert_eq!(c.offset, None);
    }

    #[test]
    fn columns_drop_blank_entries() {
        assert_eq!(split_columns("id, ,name,"), vec!["id", "name"]);
        let mut c = Clauses::default();
        c.set_columns(["", " "]);
        assert_eq!(c.columns, vec!["*"]);
        c.set_columns(["id", "email"]);
        assert_eq!(c.columns, vec!["id", "email"]);
    }
}
