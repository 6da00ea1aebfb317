use std::sync::Arc;

use log::{debug, warn};

use crate::error::Result;
use crate::server::Server;
use crate::sql::processor;
use crate::sql::types::{Dataset, Row};

/// A connection to a mock server, with a current database. Connections are
/// cheap, and any number can be open against the same server.
#[derive(Clone)]
pub struct Connection {
    server: Arc<Server>,
    database: String,
}

impl Connection {
    /// Creates a connection to the given server and database.
    pub fn new(server: Arc<Server>, database: impl Into<String>) -> Self {
        Self { server, database: database.into() }
    }

    /// Executes a single SQL statement.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        debug!("[{}/{}] {}", self.server.name(), self.database, sql.trim());
        match processor::process(sql, self) {
            Ok((rows, affected_rows)) => Ok(QueryResult { rows, affected_rows }),
            Err(err) => {
                warn!("[{}/{}] Statement failed: {err}", self.server.name(), self.database);
                Err(err)
            }
        }
    }

    /// Switches the current database.
    pub fn select_db(&mut self, database: impl Into<String>) {
        self.database = database.into();
    }

    /// Returns the current database.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the server.
    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }
}

/// The result of a statement: the selected rows for a query, or the number of
/// affected rows for a write. No-op statements return neither.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    rows: Dataset,
    affected_rows: u64,
}

impl QueryResult {
    /// Returns the selected rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows inserted, updated, or deleted.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Consumes the result, returning the selected rows.
    pub fn into_rows(self) -> Dataset {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sql::types::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn select_db() -> Result<()> {
        let server = Arc::new(Server::new("test", Config::default()));
        let mut conn = Server::connect(&server, "one");
        assert_eq!(conn.query("INSERT INTO t (id) VALUES (1), (2)")?.affected_rows(), 2);

        conn.select_db("two");
        assert_eq!(conn.database(), "two");
        assert!(conn.query("SELECT * FROM t")?.rows().is_empty());
        assert_eq!(conn.query("SELECT * FROM one.t WHERE id = 2")?.into_rows().len(), 1);

        assert_eq!(server.tables("one")?, vec!["t"]);
        assert!(Arc::ptr_eq(conn.server(), &server));
        Ok(())
    }

    #[test]
    fn query_result() -> Result<()> {
        let conn = Server::connect(&Arc::new(Server::new("test", Config::default())), "app");
        let result = conn.query("SELECT 1 AS one")?;
        assert_eq!(result.affected_rows(), 0);
        assert_eq!(result.rows()[0].get("one"), Some(&Value::Integer(1)));
        assert_eq!(conn.query("SET NAMES utf8mb4")?, QueryResult::default());
        Ok(())
    }
}
