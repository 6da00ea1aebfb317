use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::config::Config;
use crate::connection::Connection;
use crate::error::Result;
use crate::sql::execution::Scope;
use crate::sql::parser::{Parser, ast};
use crate::sql::types::schema::{Column, Table};
use crate::sql::types::Row;
use crate::{errdata, errinput};

/// Tables by name, for a single database.
type Tables = BTreeMap<String, TableData>;

/// Databases by name.
type Databases = BTreeMap<String, Tables>;

/// The stored contents of a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableData {
    /// The table schema. None if the table is schemaless, i.e. it was created
    /// implicitly by a write rather than loaded from a schema.
    pub schema: Option<Table>,
    /// The table rows, in insertion order.
    pub rows: Vec<Row>,
    /// The last auto-increment value handed out. Never decreases, except on
    /// reset, so deleted ids aren't reused.
    pub auto_increment: i64,
}

impl TableData {
    fn new(schema: Option<Table>) -> Self {
        Self { schema, rows: Vec::new(), auto_increment: 0 }
    }
}

/// Mutable server state, guarded by the server mutex.
#[derive(Default)]
struct State {
    databases: Databases,
    snapshots: HashMap<String, Databases>,
}

/// An in-memory mock database server. Holds any number of databases, each
/// with any number of tables. Statements are executed via a [`Connection`].
///
/// All state is behind a single mutex, which executors hold for the duration
/// of a statement, so statements are atomic with respect to each other. A
/// failed write leaves the table untouched.
pub struct Server {
    name: String,
    config: Config,
    state: Mutex<State>,
}

impl Server {
    /// Creates a new, empty server.
    pub fn new(name: impl Into<String>, config: Config) -> Self {
        Self { name: name.into(), config, state: Mutex::new(State::default()) }
    }

    /// Opens a connection to the given database. The database doesn't have to
    /// exist.
    pub fn connect(server: &Arc<Server>, database: impl Into<String>) -> Connection {
        Connection::new(server.clone(), database)
    }

    /// Returns the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a table in the given database. Errors if the table already
    /// has a schema.
    pub fn create_table(&self, database: &str, schema: Table) -> Result<()> {
        schema.validate()?;
        let mut state = self.state.lock()?;
        let tables = state.databases.entry(database.to_string()).or_default();
        if tables.get(&schema.name).is_some_and(|t| t.schema.is_some()) {
            return errinput!("table {database}.{} already exists", schema.name);
        }
        debug!("Creating table {database}.{}", schema.name);
        tables.insert(schema.name.clone(), TableData::new(Some(schema)));
        Ok(())
    }

    /// Loads a schema into the given database, as a sequence of
    /// semicolon-separated CREATE TABLE statements. The schema is parsed in
    /// full before any table is created.
    pub fn load_schema(&self, database: &str, ddl: &str) -> Result<()> {
        let mut tables = Vec::new();
        for statement in Parser::parse_many(ddl)? {
            let ast::Statement::CreateTable { name, columns } = statement else {
                return errinput!("unexpected {} statement in schema", statement.kind());
            };
            let columns = columns.into_iter().map(Self::build_column).collect::<Result<_>>()?;
            tables.push(Table { name, columns });
        }
        for table in tables {
            self.create_table(database, table)?;
        }
        Ok(())
    }

    /// Builds a schema column from a CREATE TABLE column definition.
    fn build_column(column: ast::Column) -> Result<Column> {
        let default = match column.default {
            Some(expr) => {
                let value = Scope::constant().evaluate(&expr, &Row::new())?;
                Some(value.coerce(column.datatype, true)?)
            }
            None => None,
        };
        let nullable = column.nullable.unwrap_or(!column.primary_key);
        if column.primary_key && nullable {
            return errdata!("primary key {} cannot be nullable", column.name);
        }
        Ok(Column {
            name: column.name,
            datatype: column.datatype,
            primary_key: column.primary_key,
            nullable,
            default,
            unique: column.unique || column.primary_key,
            auto_increment: column.auto_increment,
        })
    }

    /// Lists the tables in the given database, in name order.
    pub fn tables(&self, database: &str) -> Result<Vec<String>> {
        let state = self.state.lock()?;
        Ok(state.databases.get(database).map(|t| t.keys().cloned().collect()).unwrap_or_default())
    }

    /// Returns the schema of the given table, if it has one.
    pub fn schema(&self, database: &str, table: &str) -> Result<Option<Table>> {
        let state = self.state.lock()?;
        Ok(state.databases.get(database).and_then(|t| t.get(table)).and_then(|t| t.schema.clone()))
    }

    /// Deletes all rows and resets auto-increment counters, keeping table
    /// schemas. Schemaless tables are removed entirely. Snapshots are kept.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        for tables in state.databases.values_mut() {
            tables.retain(|_, table| table.schema.is_some());
            for table in tables.values_mut() {
                table.rows.clear();
                table.auto_increment = 0;
            }
        }
        debug!("Reset server {}", self.name);
        Ok(())
    }

    /// Saves the full data state under the given name, replacing any existing
    /// snapshot with that name.
    pub fn snapshot(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        let databases = state.databases.clone();
        state.snapshots.insert(name.to_string(), databases);
        debug!("Saved snapshot {name}");
        Ok(())
    }

    /// Restores the data state saved under the given name. The snapshot is
    /// kept, and can be restored again.
    pub fn restore(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        let Some(databases) = state.snapshots.get(name).cloned() else {
            return errinput!("snapshot {name} not found");
        };
        state.databases = databases;
        debug!("Restored snapshot {name}");
        Ok(())
    }

    /// Reads a table, holding the server lock while the closure runs. A
    /// missing table is passed as None, unless the server requires schemas.
    pub(crate) fn read_table<T>(
        &self,
        database: &str,
        table: &str,
        f: impl FnOnce(Option<&TableData>) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.lock()?;
        let data = state.databases.get(database).and_then(|t| t.get(table));
        if data.is_none() && self.config.strict_schema {
            return errinput!("table {database}.{table} not found in schema");
        }
        f(data)
    }

    /// Writes a table, holding the server lock while the closure runs. The
    /// closure operates on a copy of the table, which only replaces the stored
    /// table if the closure succeeds. A missing table is created schemaless,
    /// unless the server requires schemas, and only kept if rows were written
    /// to it.
    pub(crate) fn write_table<T>(
        &self,
        database: &str,
        table: &str,
        f: impl FnOnce(&mut TableData) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock()?;
        let tables = state.databases.entry(database.to_string()).or_default();
        let (mut data, exists) = match tables.get(table) {
            Some(data) => (data.clone(), true),
            None if self.config.strict_schema => {
                return errinput!("table {database}.{table} not found in schema");
            }
            None => (TableData::new(None), false),
        };
        let result = f(&mut data)?;
        if exists || !data.rows.is_empty() {
            if !exists {
                debug!("Creating schemaless table {database}.{table}");
            }
            tables.insert(table.to_string(), data);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sql::types::{DataType, Value};
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = "
        CREATE TABLE users (
            id INT PRIMARY KEY AUTO_INCREMENT,
            name VARCHAR(64) NOT NULL,
            active BOOLEAN DEFAULT TRUE
        );
        CREATE TABLE `Audit` (id INT PRIMARY KEY, message TEXT);
    ";

    fn server(config: Config) -> Result<Arc<Server>> {
        let server = Arc::new(Server::new("test", config));
        server.load_schema("app", SCHEMA)?;
        Ok(server)
    }

    #[test]
    fn load_schema() -> Result<()> {
        let server = server(Config::default())?;
        assert_eq!(server.tables("app")?, vec!["Audit".to_string(), "users".to_string()]);
        assert_eq!(server.tables("other")?, Vec::<String>::new());

        let users = server.schema("app", "users")?.expect("users schema");
        let id = users.get_column("id")?;
        assert!(id.primary_key && id.unique && id.auto_increment && !id.nullable);
        let name = users.get_column("name")?;
        assert_eq!((name.datatype, name.nullable), (DataType::String, false));
        assert_eq!(users.get_column("active")?.default, Some(Value::Boolean(true)));

        let error = server.load_schema("app", "CREATE TABLE users (id INT)").expect_err("exists");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        let error = server.load_schema("app", "SELECT 1").expect_err("not ddl");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn load_schema_invalid_default() {
        let server = Server::new("test", Config::default());
        assert!(server.load_schema("app", "CREATE TABLE t (id INT DEFAULT 'x')").is_err());
        assert!(server.load_schema("app", "CREATE TABLE t (id INT PRIMARY KEY NULL)").is_err());
        assert_eq!(server.tables("app").map(|t| t.len()), Ok(0));
    }

    #[test]
    fn write_table() -> Result<()> {
        let server = server(Config::default())?;

        // A failed write leaves the table unchanged.
        let result: Result<()> = server.write_table("app", "users", |data| {
            data.rows.push(Row::new());
            errinput!("failed")
        });
        assert!(result.is_err());
        server.read_table("app", "users", |data| {
            assert_eq!(data.map(|d| d.rows.len()), Some(0));
            Ok(())
        })?;

        // Missing tables are only kept once rows are written.
        server.write_table("app", "empty", |_| Ok(()))?;
        server.write_table("app", "events", |data| {
            data.rows.push(Row::new());
            Ok(())
        })?;
        assert_eq!(server.tables("app")?, vec!["Audit", "events", "users"]);
        assert_eq!(server.schema("app", "events")?, None);
        server.read_table("app", "missing", |data| {
            assert!(data.is_none());
            Ok(())
        })
    }

    #[test]
    fn strict_schema() -> Result<()> {
        let server = server(Config::strict())?;
        let error = server.write_table("app", "events", |_| Ok(())).expect_err("unknown table");
        assert_eq!(
            error,
            crate::error::Error::InvalidInput("table app.events not found in schema".into())
        );
        assert!(server.read_table("app", "events", |_| Ok(())).is_err());
        assert!(server.read_table("app", "users", |_| Ok(())).is_ok());
        Ok(())
    }

    #[test]
    fn reset_snapshot_restore() -> Result<()> {
        let server = server(Config::default())?;
        let insert = |table: &str| {
            server.write_table("app", table, |data| {
                data.rows.push(Row::new());
                data.auto_increment += 1;
                Ok(())
            })
        };
        let count = |table: &str| server.read_table("app", table, |d| Ok(d.map(|d| d.rows.len())));

        insert("users")?;
        insert("events")?;
        server.snapshot("one")?;
        insert("users")?;
        assert_eq!(count("users")?, Some(2));

        server.restore("one")?;
        assert_eq!(count("users")?, Some(1));
        assert_eq!(count("events")?, Some(1));

        server.reset()?;
        assert_eq!(count("users")?, Some(0));
        assert_eq!(count("events")?, None);
        server.read_table("app", "users", |d| {
            assert_eq!(d.map(|d| d.auto_increment), Some(0));
            Ok(())
        })?;

        // Snapshots survive a reset, and can be restored repeatedly.
        server.restore("one")?;
        server.restore("one")?;
        assert_eq!(count("users")?, Some(1));
        assert!(server.restore("two").is_err());
        Ok(())
    }
}
