use std::cmp::Ordering;

use regex::Regex;

use crate::errinput;
use crate::error::Result;
use crate::sql::parser::ast::{Expression, Operator};
use crate::sql::types::schema::Table;
use crate::sql::types::{Row, Value};

/// The scope an expression is evaluated in: the table its column references
/// resolve against. Column values themselves come from the row passed to
/// evaluate().
#[derive(Clone, Copy, Default)]
pub struct Scope<'a> {
    /// The table name, if evaluating against a table.
    table: Option<&'a str>,
    /// The table alias, if any.
    alias: Option<&'a str>,
    /// The table schema. If None for a table scope, the table is schemaless
    /// and columns missing from a row evaluate to NULL.
    schema: Option<&'a Table>,
}

impl<'a> Scope<'a> {
    /// A scope without a table, for constant expressions. Any column
    /// reference is an error.
    pub fn constant() -> Self {
        Self::default()
    }

    /// A scope for rows of the given table.
    pub fn table(table: &'a str, alias: Option<&'a str>, schema: Option<&'a Table>) -> Self {
        Self { table: Some(table), alias, schema }
    }

    /// Evaluates an expression against a row, following SQL three-valued
    /// logic: NULL propagates through operators, except where the result is
    /// known regardless of the unknown value (e.g. FALSE AND NULL).
    pub fn evaluate(&self, expr: &Expression, row: &Row) -> Result<Value> {
        use Value::*;
        Ok(match expr {
            Expression::All => return errinput!("* is not valid in this context"),
            Expression::Literal(literal) => literal.clone().into(),
            Expression::Column(table, column) => self.lookup(table.as_deref(), column, row)?,
            Expression::Operator(operator) => match operator {
                // Logical operators. Non-boolean operands use their truth
                // value, as in MySQL.
                Operator::And(lhs, rhs) => {
                    match (truth(self.evaluate(lhs, row)?), truth(self.evaluate(rhs, row)?)) {
                        (Some(false), _) | (_, Some(false)) => Boolean(false),
                        (Some(true), Some(true)) => Boolean(true),
                        _ => Null,
                    }
                }
                Operator::Or(lhs, rhs) => {
                    match (truth(self.evaluate(lhs, row)?), truth(self.evaluate(rhs, row)?)) {
                        (Some(true), _) | (_, Some(true)) => Boolean(true),
                        (Some(false), Some(false)) => Boolean(false),
                        _ => Null,
                    }
                }
                Operator::Not(expr) => truth(self.evaluate(expr, row)?).map(|b| !b).into(),

                // Comparison operators.
                Operator::Equal(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_eq)?,
                Operator::NotEqual(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_ne)?,
                Operator::GreaterThan(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_gt)?,
                Operator::GreaterThanOrEqual(lhs, rhs) => {
                    self.compare(lhs, rhs, row, Ordering::is_ge)?
                }
                Operator::LessThan(lhs, rhs) => self.compare(lhs, rhs, row, Ordering::is_lt)?,
                Operator::LessThanOrEqual(lhs, rhs) => {
                    self.compare(lhs, rhs, row, Ordering::is_le)?
                }
                Operator::IsNull(expr) => Boolean(self.evaluate(expr, row)?.is_null()),
                Operator::In(expr, list) => {
                    let value = self.evaluate(expr, row)?;
                    if value.is_null() {
                        return Ok(Null);
                    }
                    let mut result = Boolean(false);
                    for item in list {
                        match compare(&value, &self.evaluate(item, row)?) {
                            Some(Ordering::Equal) => return Ok(Boolean(true)),
                            Some(_) => {}
                            None => result = Null,
                        }
                    }
                    result
                }

                // Mathematical operators.
                Operator::Add(lhs, rhs) => arithmetic(
                    self.evaluate(lhs, row)?,
                    self.evaluate(rhs, row)?,
                    i64::checked_add,
                    |lhs, rhs| lhs + rhs,
                )?,
                Operator::Subtract(lhs, rhs) => arithmetic(
                    self.evaluate(lhs, row)?,
                    self.evaluate(rhs, row)?,
                    i64::checked_sub,
                    |lhs, rhs| lhs - rhs,
                )?,
                Operator::Multiply(lhs, rhs) => arithmetic(
                    self.evaluate(lhs, row)?,
                    self.evaluate(rhs, row)?,
                    i64::checked_mul,
                    |lhs, rhs| lhs * rhs,
                )?,
                // Division always yields a float, and NULL when dividing by
                // zero, as in MySQL.
                Operator::Divide(lhs, rhs) => {
                    match (numeric(self.evaluate(lhs, row)?), numeric(self.evaluate(rhs, row)?)) {
                        (Some(lhs), Some(rhs)) => {
                            let (lhs, rhs) = (as_float(&lhs), as_float(&rhs));
                            if rhs == 0.0 { Null } else { Float(lhs / rhs) }
                        }
                        _ => Null,
                    }
                }
                Operator::Remainder(lhs, rhs) => {
                    match (numeric(self.evaluate(lhs, row)?), numeric(self.evaluate(rhs, row)?)) {
                        (Some(Integer(_)), Some(Integer(0))) => Null,
                        (Some(Integer(lhs)), Some(Integer(rhs))) => {
                            lhs.checked_rem(rhs).map(Integer).unwrap_or(Integer(0))
                        }
                        (Some(lhs), Some(rhs)) => {
                            let (lhs, rhs) = (as_float(&lhs), as_float(&rhs));
                            if rhs == 0.0 { Null } else { Float(lhs % rhs) }
                        }
                        _ => Null,
                    }
                }
                Operator::Negate(expr) => match numeric(self.evaluate(expr, row)?) {
                    Some(Integer(i)) => match i.checked_neg() {
                        Some(i) => Integer(i),
                        None => return errinput!("integer overflow"),
                    },
                    Some(Float(f)) => Float(-f),
                    _ => Null,
                },
                Operator::Identity(expr) => numeric(self.evaluate(expr, row)?).unwrap_or(Null),

                // String operators.
                Operator::Like(lhs, rhs) => {
                    match (self.evaluate(lhs, row)?, self.evaluate(rhs, row)?) {
                        (Null, _) | (_, Null) => Null,
                        (value, pattern) => {
                            Boolean(like_regex(&pattern.to_string())?.is_match(&value.to_string()))
                        }
                    }
                }
            },
        })
    }

    /// Evaluates an expression as a row filter. Only TRUE keeps the row; FALSE
    /// and NULL reject it.
    pub fn matches(&self, expr: Option<&Expression>, row: &Row) -> Result<bool> {
        let Some(expr) = expr else { return Ok(true) };
        Ok(truth(self.evaluate(expr, row)?).unwrap_or(false))
    }

    /// Looks up a column value in the row.
    fn lookup(&self, table: Option<&str>, column: &str, row: &Row) -> Result<Value> {
        if let Some(table) = table {
            if Some(table) != self.alias && Some(table) != self.table {
                return errinput!("unknown table {table}");
            }
        }
        if let Some(value) = row.get(column) {
            return Ok(value.clone());
        }
        match (self.table, self.schema) {
            (Some(_), None) => Ok(Value::Null),
            (Some(table), Some(_)) => errinput!("unknown column {column} in table {table}"),
            (None, _) => errinput!("unknown column {column}"),
        }
    }

    /// Evaluates and compares two expressions, returning NULL if either is
    /// NULL or they can't be compared.
    fn compare(
        &self,
        lhs: &Expression,
        rhs: &Expression,
        row: &Row,
        predicate: fn(Ordering) -> bool,
    ) -> Result<Value> {
        let (lhs, rhs) = (self.evaluate(lhs, row)?, self.evaluate(rhs, row)?);
        Ok(compare(&lhs, &rhs).map(predicate).into())
    }
}

/// Returns the truth value of a value, or None for NULL.
pub fn truth(value: Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Boolean(b) => Some(b),
        value => match numeric(value) {
            Some(Value::Integer(i)) => Some(i != 0),
            Some(Value::Float(f)) => Some(f != 0.0),
            _ => None,
        },
    }
}

/// Compares two values the way MySQL does: numbers compare numerically,
/// booleans as 0 or 1, and strings compared with numbers are converted to
/// numbers. Returns None if either value is NULL.
fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    use Value::*;
    match (lhs, rhs) {
        (Null, _) | (_, Null) => None,
        (String(lhs), String(rhs)) => Some(lhs.cmp(rhs)),
        (Boolean(lhs), Boolean(rhs)) => Some(lhs.cmp(rhs)),
        (Integer(lhs), Integer(rhs)) => Some(lhs.cmp(rhs)),
        (lhs, rhs) => {
            let (lhs, rhs) = (numeric(lhs.clone())?, numeric(rhs.clone())?);
            match (lhs, rhs) {
                (Integer(lhs), Integer(rhs)) => Some(lhs.cmp(&rhs)),
                (lhs, rhs) => as_float(&lhs).partial_cmp(&as_float(&rhs)),
            }
        }
    }
}

/// Converts a value to a number (integer or float), or None for NULL.
/// Booleans become 0 or 1, and strings are parsed leniently.
fn numeric(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Boolean(b) => Some(Value::Integer(b as i64)),
        v @ (Value::Integer(_) | Value::Float(_)) => Some(v),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Some(Value::Integer(i)),
            Err(_) => Some(Value::Float(s.trim().parse().unwrap_or(0.0))),
        },
    }
}

/// Returns a numeric value as a float.
fn as_float(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        _ => 0.0,
    }
}

/// Applies an arithmetic operator. Integers use checked arithmetic, and
/// any float operand makes the result a float.
fn arithmetic(
    lhs: Value,
    rhs: Value,
    integer_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    Ok(match (numeric(lhs), numeric(rhs)) {
        (Some(Value::Integer(lhs)), Some(Value::Integer(rhs))) => match integer_op(lhs, rhs) {
            Some(i) => Value::Integer(i),
            None => return errinput!("integer overflow"),
        },
        (Some(lhs), Some(rhs)) => Value::Float(float_op(as_float(&lhs), as_float(&rhs))),
        _ => Value::Null,
    })
}

/// Converts a LIKE pattern into an anchored, case-insensitive regex. % matches
/// any sequence of characters and _ any single character; a backslash escapes
/// the next character.
fn like_regex(pattern: &str) -> Result<Regex> {
    let mut regex = String::from("(?is)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(c) => regex.push_str(&regex::escape(&c.to_string())),
                None => regex.push_str(&regex::escape("\\")),
            },
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    Ok(Regex::new(&regex)?)
}
