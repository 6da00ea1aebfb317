use itertools::Itertools as _;

use super::{Execute, Scope, resolve, target_rows};
use crate::connection::Connection;
use crate::error::Result;
use crate::server::TableData;
use crate::sql::parser::ast;
use crate::sql::types::{Row, Value};
use crate::{errdata, errinput};

impl Execute for ast::Insert {
    type Output = u64;

    /// Inserts rows into a table, returning the number of rows inserted.
    fn execute(self, conn: &Connection) -> Result<u64> {
        let (database, name) = resolve(conn, &self.table);
        let strict = conn.server().config().strict_sql;
        if let Some(column) = self.columns.iter().flatten().duplicates().next() {
            return errinput!("column {column} specified multiple times");
        }

        // Values can't refer to columns, so evaluate them up front.
        let scope = Scope::constant();
        let values = self
            .values
            .iter()
            .map(|row| row.iter().map(|expr| scope.evaluate(expr, &Row::new())).collect())
            .collect::<Result<Vec<Vec<Value>>>>()?;

        conn.server().write_table(database, name, |data| {
            let columns = match (&self.columns, &data.schema) {
                (Some(columns), _) => columns.clone(),
                (None, Some(schema)) => schema.columns.iter().map(|c| c.name.clone()).collect(),
                (None, None) => {
                    return errinput!("column list required for schemaless table {name}");
                }
            };
            let count = values.len() as u64;
            for (i, values) in values.into_iter().enumerate() {
                if values.len() != columns.len() {
                    return errinput!("column count doesn't match value count at row {}", i + 1);
                }
                // Start from the column defaults, if there is a schema.
                let mut row = data.schema.as_ref().map(|s| s.default_row()).unwrap_or_default();
                row.extend(columns.iter().cloned().zip(values));
                let row = prepare_row(data, row, None, strict)?;
                data.rows.push(row);
            }
            Ok(count)
        })
    }
}

impl Execute for ast::Update {
    type Output = u64;

    /// Updates rows in a table. Following MySQL, returns the number of rows
    /// that actually changed, not the number of rows matched.
    fn execute(self, conn: &Connection) -> Result<u64> {
        let (database, name) = resolve(conn, &self.table);
        let strict = conn.server().config().strict_sql;

        conn.server().write_table(database, name, |data| {
            let schema = data.schema.clone();
            if let Some(schema) = &schema {
                for column in self.set.keys() {
                    schema.get_column(column)?;
                }
            }
            let scope = Scope::table(name, None, schema.as_ref());
            let targets = target_rows(
                &scope,
                &data.rows,
                self.r#where.as_ref(),
                &self.order_by,
                self.limit.as_ref(),
            )?;

            let mut count = 0;
            for index in targets {
                // SET expressions see the original row, not earlier
                // assignments.
                let original = data.rows[index].clone();
                let mut row = original.clone();
                for (column, expr) in &self.set {
                    let value = match expr {
                        Some(expr) => scope.evaluate(expr, &original)?,
                        None => match &schema {
                            Some(schema) => {
                                schema.get_column(column)?.default.clone().unwrap_or(Value::Null)
                            }
                            None => Value::Null,
                        },
                    };
                    row.insert(column.clone(), value);
                }
                let row = prepare_row(data, row, Some(index), strict)?;
                if row != original {
                    data.rows[index] = row;
                    count += 1;
                }
            }
            Ok(count)
        })
    }
}

impl Execute for ast::Delete {
    type Output = u64;

    /// Deletes rows from a table, returning the number of rows deleted.
    fn execute(self, conn: &Connection) -> Result<u64> {
        let (database, name) = resolve(conn, &self.table);
        conn.server().write_table(database, name, |data| {
            let scope = Scope::table(name, None, data.schema.as_ref());
            let mut targets = target_rows(
                &scope,
                &data.rows,
                self.r#where.as_ref(),
                &self.order_by,
                self.limit.as_ref(),
            )?;
            targets.sort_unstable();
            let mut index = 0;
            data.rows.retain(|_| {
                let keep = targets.binary_search(&index).is_err();
                index += 1;
                keep
            });
            Ok(targets.len() as u64)
        })
    }
}

/// Prepares a row for writing to the table at the given index, or as a new
/// row if None. For tables with a schema, this fills in auto-increment
/// values, validates and coerces the row, and checks unique constraints.
/// Schemaless rows are written as is.
fn prepare_row(data: &mut TableData, row: Row, index: Option<usize>, strict: bool) -> Result<Row> {
    if data.schema.is_none() {
        return Ok(row);
    }
    let row = fill_auto_increment(data, row)?;
    let Some(schema) = &data.schema else {
        return Ok(row);
    };
    let row = schema.validate_row(row, strict)?;

    for column in schema.columns.iter().filter(|c| c.unique || c.primary_key) {
        let value = &row[&column.name];
        if value.is_null() {
            continue;
        }
        let duplicate = data
            .rows
            .iter()
            .enumerate()
            .any(|(i, other)| Some(i) != index && other.get(&column.name) == Some(value));
        if duplicate {
            let key = if column.primary_key { "PRIMARY" } else { column.name.as_str() };
            return errdata!("Duplicate entry '{value}' for key '{key}'");
        }
    }

    // Explicit auto-increment values move the counter forward.
    for column in schema.columns.iter().filter(|c| c.auto_increment) {
        if let Some(Value::Integer(value)) = row.get(&column.name) {
            data.auto_increment = data.auto_increment.max(*value);
        }
    }
    Ok(row)
}

/// Replaces missing or NULL auto-increment column values with the next value
/// from the table's counter. The counter is at least the column's current
/// maximum, so explicitly inserted ids are never handed out again.
fn fill_auto_increment(data: &mut TableData, mut row: Row) -> Result<Row> {
    let Some(schema) = &data.schema else {
        return Ok(row);
    };
    for column in schema.columns.iter().filter(|c| c.auto_increment) {
        if !row.get(&column.name).is_none_or(Value::is_null) {
            continue;
        }
        let max = data
            .rows
            .iter()
            .filter_map(|r| match r.get(&column.name) {
                Some(Value::Integer(i)) => Some(*i),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        let Some(next) = data.auto_increment.max(max).checked_add(1) else {
            return errdata!("Failed to read auto-increment value for column {}", column.name);
        };
        data.auto_increment = next;
        row.insert(column.name.clone(), Value::Integer(next));
    }
    Ok(row)
}
