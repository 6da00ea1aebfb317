//! Executes parsed statements against a server's in-memory tables.
//!
//! Each executable statement implements [`Execute`]. Statements take the
//! server lock once, for the duration of the statement, and either apply in
//! full or not at all.

mod expression;
mod select;
mod write;

pub use expression::Scope;

use std::cmp::Ordering;

use crate::connection::Connection;
use crate::errinput;
use crate::error::Result;
use crate::sql::parser::ast::{Direction, Expression, TableName};
use crate::sql::types::{Row, Value};

/// A statement that can be executed against a connection.
pub trait Execute {
    /// The statement result: rows for queries, or an affected row count for
    /// writes.
    type Output;

    /// Executes the statement.
    fn execute(self, conn: &Connection) -> Result<Self::Output>;
}

/// Resolves a table name to a (database, table) pair, using the connection's
/// current database if the name is unqualified.
fn resolve<'a>(conn: &'a Connection, table: &'a TableName) -> (&'a str, &'a str) {
    (table.database.as_deref().unwrap_or(conn.database()), &table.name)
}

/// Evaluates a LIMIT or OFFSET expression, which must be a constant
/// non-negative integer.
fn evaluate_count(expr: &Expression, clause: &str) -> Result<usize> {
    match Scope::constant().evaluate(expr, &Row::new())? {
        Value::Integer(n) if n >= 0 => Ok(n as usize),
        value => errinput!("invalid {clause} value {}", value.to_sql()),
    }
}

/// Sorts items by the given ORDER BY expressions. The sort is stable, so
/// items that compare equal keep their original order. NULL sorts before any
/// other value.
fn order_by<T>(
    items: Vec<T>,
    order: &[(Expression, Direction)],
    key: impl Fn(&T, &Expression) -> Result<Value>,
) -> Result<Vec<T>> {
    if order.is_empty() {
        return Ok(items);
    }
    let mut keyed = items
        .into_iter()
        .map(|item| {
            let keys = order.iter().map(|(expr, _)| key(&item, expr)).collect::<Result<Vec<_>>>()?;
            Ok((keys, item))
        })
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b)
            .zip(order)
            .map(|((a, b), (_, direction))| match direction {
                Direction::Ascending => a.sort_cmp(b),
                Direction::Descending => b.sort_cmp(a),
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

/// Finds the rows matched by an UPDATE or DELETE, returning their indexes in
/// processing order: filtered by WHERE, sorted by ORDER BY, and truncated to
/// LIMIT.
fn target_rows(
    scope: &Scope,
    rows: &[Row],
    r#where: Option<&Expression>,
    order: &[(Expression, Direction)],
    limit: Option<&Expression>,
) -> Result<Vec<usize>> {
    let mut matched = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if scope.matches(r#where, row)? {
            matched.push(index);
        }
    }
    let mut matched = order_by(matched, order, |index, expr| scope.evaluate(expr, &rows[*index]))?;
    if let Some(limit) = limit {
        matched.truncate(evaluate_count(limit, "LIMIT")?);
    }
    Ok(matched)
}
