//! SQL rendering.
//!
//! The builder renders a portable text form: `?` for positional parameters
//! (WHERE, DELETE) and `:name` for named ones (INSERT, UPDATE). The text is
//! converted to Postgres `$n` placeholders by [`Statement::to_postgres`] right
//! before execution.

use crate::builder::clause::{Clauses, OrderTerm, Predicate};
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// What a statement does; reported with every execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Select => "select",
            StatementKind::Count => "count",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        })
    }
}

/// Values bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// One value per `?`, in order.
    Positional(Vec<Value>),
    /// One value per `:name`.
    Named(Record),
}

impl Params {
    pub fn len(&self) -> usize {
        match self {
            Params::Positional(values) => values.len(),
            Params::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Params::Named(_))
    }
}

/// A rendered statement and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Params,
}

impl Statement {
    /// Number of `?` placeholders outside string literals.
    pub fn placeholder_count(&self) -> usize {
        let mut count = 0;
        scan(&self.sql, self.params.is_named(), |token| {
            if matches!(token, Token::Positional) {
                count += 1;
            }
        });
        count
    }

    /// Rewrite to `$n` placeholders and return the values in binding order.
    ///
    /// Each `?` takes the next positional value. A `:name` gets the index of
    /// its first appearance, so repeating a name reuses the same parameter.
    pub fn to_postgres(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut sql = String::with_capacity(self.sql.len() + 8);
        let mut values = Vec::with_capacity(self.params.len());
        let mut named_index: HashMap<String, usize> = HashMap::new();
        let mut next_positional = 0usize;
        let mut failure = None;

        scan(&self.sql, self.params.is_named(), |token| match token {
            Token::Text(text) => sql.push_str(text),
            Token::Positional => {
                let value = match &self.params {
                    Params::Positional(params) => params.get(next_positional).cloned(),
                    Params::Named(_) => None,
                };
                next_positional += 1;
                match value {
                    Some(value) => {
                        values.push(value);
                        sql.push('$');
                        sql.push_str(&values.len().to_string());
                    }
                    None => {
                        failure.get_or_insert_with(|| {
                            format!("no value bound for placeholder #{next_positional}")
                        });
                    }
                }
            }
            Token::Named("") => {
                failure.get_or_insert_with(|| "placeholder ':' has no name".to_string());
            }
            Token::Named(name) => {
                if let Some(idx) = named_index.get(name) {
                    sql.push('$');
                    sql.push_str(&idx.to_string());
                    return;
                }
                let value = match &self.params {
                    Params::Named(params) => params.get(name).cloned(),
                    Params::Positional(_) => None,
                };
                match value {
                    Some(value) => {
                        values.push(value);
                        named_index.insert(name.to_string(), values.len());
                        sql.push('$');
                        sql.push_str(&values.len().to_string());
                    }
                    None => {
                        failure.get_or_insert_with(|| format!("no value bound for :{name}"));
                    }
                }
            }
        });

        match failure {
            Some(message) => Err(OrmError::StatementExecution(message)),
            None => Ok((sql, values)),
        }
    }
}

enum Token<'a> {
    Text(&'a str),
    Positional,
    Named(&'a str),
}

/// Split SQL into literal text and placeholders, skipping quoted strings and `::` casts.
///
/// `:name` is only recognized when `named` is set; a name runs over
/// alphanumeric characters (any script) and `_`. A `:` with no name after it
/// yields an empty `Named` token.
fn scan<'a>(sql: &'a str, named: bool, mut visit: impl FnMut(Token<'a>)) {
    let bytes = sql.as_bytes();
    let mut in_literal = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_literal {
            if b == b'\'' {
                in_literal = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' => {
                in_literal = true;
                i += 1;
            }
            b'?' => {
                visit(Token::Text(&sql[start..i]));
                visit(Token::Positional);
                i += 1;
                start = i;
            }
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            b':' if named => {
                let name_start = i + 1;
                let end = sql[name_start..]
                    .char_indices()
                    .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
                    .map_or(sql.len(), |(offset, _)| name_start + offset);
                visit(Token::Text(&sql[start..i]));
                visit(Token::Named(&sql[name_start..end]));
                i = end;
                start = i;
            }
            _ => i += 1,
        }
    }
    visit(Token::Text(&sql[start..]));
}

/// `WHERE a = ? AND b > ?`, or empty without predicates.
pub fn where_clause(predicates: &[Predicate]) -> String {
    let mut out = String::new();
    for predicate in predicates {
        if out.is_empty() {
            out.push_str("WHERE ");
        } else {
            out.push(' ');
            out.push_str(predicate.connector.as_sql());
            out.push(' ');
        }
        out.push_str(&predicate.column);
        out.push(' ');
        out.push_str(&predicate.operator);
        out.push_str(" ?");
    }
    out
}

/// `ORDER BY ...`, or empty without terms.
///
/// A term followed by one with the same direction leaves its direction to
/// that next term: `a ASC, b ASC` renders as `a, b ASC`.
pub fn order_clause(orders: &[OrderTerm]) -> String {
    if orders.is_empty() {
        return String::new();
    }
    let segments: Vec<String> = orders
        .iter()
        .enumerate()
        .map(|(idx, term)| match orders.get(idx + 1) {
            Some(next) if next.direction == term.direction => term.column.clone(),
            _ => format!("{} {}", term.column, term.direction),
        })
        .collect();
    format!("ORDER BY {}", segments.join(", "))
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn predicate_values(predicates: &[Predicate]) -> Vec<Value> {
    predicates.iter().map(|p| p.value.clone()).collect()
}

fn select_sql(table: &str, clauses: &Clauses) -> String {
    let head = format!("SELECT {} FROM {}", clauses.columns.join(", "), table);
    let wheres = where_clause(&clauses.predicates);
    let orders = order_clause(&clauses.orders);
    let limit = match clauses.limit {
        Some(n) if n > 0 => format!("LIMIT {n}"),
        _ => String::new(),
    };
    let offset = match clauses.offset {
        Some(n) if n > 0 => format!("OFFSET {n}"),
        _ => String::new(),
    };
    join_parts(&[&head, &wheres, &orders, &limit, &offset])
}

/// `SELECT <cols> FROM <table> [WHERE] [ORDER BY] [LIMIT] [OFFSET]`
///
/// LIMIT and OFFSET are only emitted when greater than zero.
pub fn select(table: &str, clauses: &Clauses) -> Statement {
    Statement {
        kind: StatementKind::Select,
        sql: select_sql(table, clauses),
        params: Params::Positional(predicate_values(&clauses.predicates)),
    }
}

/// Number of matching rows, honoring limit and offset through a subquery.
pub fn count(table: &str, clauses: &Clauses) -> Statement {
    let paginated = clauses.limit.is_some_and(|n| n > 0) || clauses.offset.is_some_and(|n| n > 0);
    let sql = if paginated {
        format!("SELECT COUNT(*) FROM ({}) AS matched", select_sql(table, clauses))
    } else {
        let head = format!("SELECT COUNT(*) FROM {table}");
        join_parts(&[&head, &where_clause(&clauses.predicates)])
    };
    Statement {
        kind: StatementKind::Count,
        sql,
        params: Params::Positional(predicate_values(&clauses.predicates)),
    }
}

/// `DELETE FROM <table> [WHERE]`
pub fn delete(table: &str, predicates: &[Predicate]) -> Statement {
    let head = format!("DELETE FROM {table}");
    Statement {
        kind: StatementKind::Delete,
        sql: join_parts(&[&head, &where_clause(predicates)]),
        params: Params::Positional(predicate_values(predicates)),
    }
}

/// `INSERT INTO <table> (a, b) VALUES (:a, :b)` in payload order.
pub fn insert(table: &str, payload: Record) -> Statement {
    let columns: Vec<&str> = payload.keys().map(String::as_str).collect();
    let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    Statement {
        kind: StatementKind::Insert,
        sql,
        params: Params::Named(payload),
    }
}

/// `UPDATE <table> SET a = :a WHERE <pk> = <literal>`
///
/// The primary key never appears in SET; its value is inlined as a literal.
pub fn update(table: &str, primary_key: &str, key: &Value, mut payload: Record) -> Statement {
    payload.shift_remove(primary_key);
    let sets: Vec<String> = payload.keys().map(|c| format!("{c} = :{c}")).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        table,
        sets.join(", "),
        primary_key,
        key.to_sql_literal()
    );
    Statement {
        kind: StatementKind::Update,
        sql,
        params: Params::Named(payload),
    }
}
