//! Operator allow-list and operator/value validation.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Operators accepted in a predicate, lowercase.
pub const OPERATORS: &[&str] = &[
    "=",
    "<",
    ">",
    "<=",
    ">=",
    "<>",
    "!=",
    "<=>",
    "like",
    "like binary",
    "not like",
    "ilike",
    "&",
    "|",
    "^",
    "<<",
    ">>",
    "rlike",
    "not rlike",
    "regexp",
    "not regexp",
    "~",
    "~*",
    "!~",
    "!~*",
    "similar to",
    "not similar to",
    "not ilike",
    "~~*",
    "!~~*",
];

/// Operators that may be paired with NULL.
const NULL_SAFE: &[&str] = &["=", "<>", "!="];

/// Normalize an operator for emission: inner whitespace collapsed, keywords uppercased.
///
/// Fails with [`OrmError::InvalidOperator`] for anything outside [`OPERATORS`].
pub fn normalize_operator(operator: &str) -> OrmResult<String> {
    let collapsed = operator.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_ascii_lowercase();
    if OPERATORS.contains(&lower.as_str()) {
        Ok(collapsed.to_ascii_uppercase())
    } else {
        Err(OrmError::InvalidOperator(operator.to_string()))
    }
}

/// Whether `operator` can never match when compared against `value`.
pub fn is_invalid_combination(operator: &str, value: &Value) -> bool {
    let lower = operator.to_ascii_lowercase();
    value.is_null()
        && OPERATORS.contains(&lower.as_str())
        && !NULL_SAFE.contains(&lower.as_str())
}

/// Resolve the `(value, operator)` pair of a predicate.
///
/// With `used_default_equality` the operator is `=` unconditionally. Otherwise
/// the operator must be known, and NULL is only accepted by `=`, `<>` and `!=`.
pub fn prepare_value_and_operator(
    value: Value,
    operator: &str,
    used_default_equality: bool,
) -> OrmResult<(Value, String)> {
    if used_default_equality {
        return Ok((value, "=".to_string()));
    }
    let operator = normalize_operator(operator)?;
    if is_invalid_combination(&operator, &value) {
        return Err(OrmError::invalid_combination(operator));
    }
    Ok((value, operator))
}
