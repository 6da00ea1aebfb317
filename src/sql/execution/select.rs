use super::{Execute, Scope, evaluate_count, order_by, resolve};
use crate::connection::Connection;
use crate::errinput;
use crate::error::Result;
use crate::sql::parser::ast::{self, Expression};
use crate::sql::types::schema::Table;
use crate::sql::types::{Dataset, Row, Value};

impl Execute for ast::Select {
    type Output = Dataset;

    fn execute(self, conn: &Connection) -> Result<Dataset> {
        let Some((table, alias)) = &self.from else {
            // Without a FROM clause, select from a single empty row.
            return self.query(&Scope::constant(), None, &[Row::new()]);
        };
        let (database, name) = resolve(conn, table);
        conn.server().read_table(database, name, |data| {
            let schema = data.and_then(|d| d.schema.as_ref());
            let rows = data.map(|d| d.rows.as_slice()).unwrap_or_default();
            self.query(&Scope::table(name, alias.as_deref(), schema), schema, rows)
        })
    }
}

impl ast::Select {
    /// Runs the query over the given source rows: filter, project, sort, and
    /// finally apply the offset and limit.
    fn query(&self, scope: &Scope, schema: Option<&Table>, rows: &[Row]) -> Result<Dataset> {
        let mut results = Vec::new();
        for row in rows {
            if scope.matches(self.r#where.as_ref(), row)? {
                results.push((row, self.project(scope, schema, row)?));
            }
        }

        // ORDER BY can refer to both source columns and output labels, with
        // output labels taking precedence.
        let results = order_by(results, &self.order_by, |(source, output), expr| {
            let mut row = (*source).clone();
            row.extend(output.iter().map(|(k, v)| (k.clone(), v.clone())));
            scope.evaluate(expr, &row)
        })?;

        let offset = self.offset.as_ref().map(|e| evaluate_count(e, "OFFSET")).transpose()?;
        let limit = self.limit.as_ref().map(|e| evaluate_count(e, "LIMIT")).transpose()?;
        Ok(results
            .into_iter()
            .map(|(_, output)| output)
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Projects a source row into an output row.
    fn project(&self, scope: &Scope, schema: Option<&Table>, row: &Row) -> Result<Row> {
        let mut output = Row::with_capacity(self.select.len());
        for (expr, alias) in &self.select {
            match (expr, alias) {
                (Expression::All, _) if self.from.is_none() => return errinput!("no tables used"),
                // With a schema, * yields all columns in schema order.
                (Expression::All, _) => match schema {
                    Some(schema) => output.extend(schema.columns.iter().map(|column| {
                        let value = row.get(&column.name).cloned().unwrap_or(Value::Null);
                        (column.name.clone(), value)
                    })),
                    None => output.extend(row.iter().map(|(k, v)| (k.clone(), v.clone()))),
                },
                (expr, Some(alias)) => {
                    output.insert(alias.clone(), scope.evaluate(expr, row)?);
                }
                (expr @ Expression::Column(_, column), None) => {
                    output.insert(column.clone(), scope.evaluate(expr, row)?);
                }
                (expr, None) => {
                    output.insert(expr.to_string(), scope.evaluate(expr, row)?);
                }
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::server::Server;
    use crate::sql::parser::Parser;
    use pretty_assertions::assert_eq;

    fn connection() -> Result<Connection> {
        let server = Arc::new(Server::new("test", Config::default()));
        server.load_schema(
            "app",
            "CREATE TABLE users (id INT PRIMARY KEY, name TEXT, age INT);",
        )?;
        server.write_table("app", "users", |data| {
            let users = [(1, "ann", Some(30i64)), (2, "bob", None), (3, "cat", Some(25))];
            for (id, name, age) in users {
                data.rows.push(
                    [
                        ("id".to_string(), Value::Integer(id)),
                        ("name".to_string(), Value::from(name)),
                        ("age".to_string(), Value::from(age)),
                    ]
                    .into_iter()
                    .collect(),
                );
            }
            Ok(())
        })?;
        Ok(Server::connect(&server, "app"))
    }

    fn select(conn: &Connection, sql: &str) -> Result<Vec<Vec<(String, Value)>>> {
        let ast::Statement::Select(select) = Parser::parse(sql)? else {
            panic!("expected select");
        };
        Ok(select.execute(conn)?.into_iter().map(|row| row.into_iter().collect()).collect())
    }

    fn row(values: &[(&str, Value)]) -> Vec<(String, Value)> {
        values.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn select_all() -> Result<()> {
        let conn = connection()?;
        let rows = select(&conn, "SELECT * FROM users WHERE id = 2")?;
        assert_eq!(
            rows,
            vec![row(&[("id", Value::Integer(2)), ("name", "bob".into()), ("age", Value::Null)])]
        );
        Ok(())
    }

    #[test]
    fn select_labels() -> Result<()> {
        let conn = connection()?;
        let rows = select(&conn, "SELECT u.name, age + 1, id AS uid FROM users u WHERE id = 1")?;
        assert_eq!(
            rows,
            vec![row(&[
                ("name", "ann".into()),
                ("age + 1", Value::Integer(31)),
                ("uid", Value::Integer(1)),
            ])]
        );
        Ok(())
    }

    #[test]
    fn select_order_limit() -> Result<()> {
        let conn = connection()?;
        let names = |sql: &str| -> Result<Vec<Value>> {
            Ok(select(&conn, sql)?.into_iter().map(|row| row[0].1.clone()).collect())
        };
        // NULL sorts first.
        assert_eq!(
            names("SELECT name FROM users ORDER BY age")?,
            vec![Value::from("bob"), Value::from("cat"), Value::from("ann")]
        );
        assert_eq!(
            names("SELECT name, age AS a FROM users ORDER BY a DESC LIMIT 2")?,
            vec![Value::from("ann"), Value::from("cat")]
        );
        assert_eq!(
            names("SELECT name FROM users ORDER BY id LIMIT 1, 1")?,
            vec![Value::from("bob")]
        );
        assert_eq!(
            names("SELECT name FROM users ORDER BY id LIMIT 5 OFFSET 2")?,
            vec![Value::from("cat")]
        );
        Ok(())
    }

    #[test]
    fn select_without_from() -> Result<()> {
        let conn = connection()?;
        assert_eq!(
            select(&conn, "SELECT 1 + 1, 'x' AS y")?,
            vec![row(&[("1 + 1", Value::Integer(2)), ("y", "x".into())])]
        );
        assert!(select(&conn, "SELECT *").is_err());
        assert!(select(&conn, "SELECT id").is_err());
        Ok(())
    }

    #[test]
    fn select_missing_table() -> Result<()> {
        let conn = connection()?;
        assert_eq!(select(&conn, "SELECT * FROM nothing")?, Vec::<Vec<(String, Value)>>::new());
        assert!(select(&conn, "SELECT missing FROM users").is_err());
        Ok(())
    }
}
