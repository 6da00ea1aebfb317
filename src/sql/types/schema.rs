use itertools::Itertools as _;

use super::{DataType, Row, Value};
use crate::errdata;
use crate::error::Result;
use crate::sql::parser::format_ident;

/// A table schema, which specifies its data structure and constraints.
///
/// Tables can't change after they are created. There is no ALTER TABLE, and
/// CREATE TABLE is only accepted when loading a schema into a server, not as a
/// query.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// The table name. Unique per database, case-sensitive.
    pub name: String,
    /// The table columns, in order.
    pub columns: Vec<Column>,
}

/// A table column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Column name. Unique within the table.
    pub name: String,
    /// Column datatype.
    pub datatype: DataType,
    /// Whether the column is the table's primary key. Implies unique and not
    /// nullable.
    pub primary_key: bool,
    /// Whether the column allows null values.
    pub nullable: bool,
    /// The column's default value, used when an INSERT omits the column or an
    /// UPDATE sets it to DEFAULT. None means NULL.
    pub default: Option<Value>,
    /// Whether the column only allows unique values, ignoring NULLs.
    pub unique: bool,
    /// Whether missing or NULL values are filled from a per-table counter.
    /// Only valid for integer columns.
    pub auto_increment: bool,
}

impl Table {
    /// Validates the table schema.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return errdata!("table {} has no columns", self.name);
        }
        if self.columns.iter().filter(|c| c.primary_key).count() > 1 {
            return errdata!("multiple primary keys in table {}", self.name);
        }
        if let Some(name) = self.columns.iter().map(|c| &c.name).duplicates().next() {
            return errdata!("duplicate column {name} in table {}", self.name);
        }
        for column in &self.columns {
            if column.primary_key && column.nullable {
                return errdata!("primary key {} cannot be nullable", column.name);
            }
            if column.auto_increment && column.datatype != DataType::Integer {
                return errdata!("auto_increment column {} must be an integer", column.name);
            }
            match column.default.as_ref().map(|v| v.datatype()) {
                None => {}
                Some(None) if column.nullable => {}
                Some(None) => {
                    return errdata!("invalid NULL default for non-nullable column {}", column.name)
                }
                Some(Some(datatype)) if datatype != column.datatype => {
                    return errdata!(
                        "invalid datatype {datatype} for {} column {} default",
                        column.datatype,
                        column.name
                    )
                }
                Some(Some(_)) => {}
            }
        }
        Ok(())
    }

    /// Looks up a column by name.
    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| errdata!("unknown column {name} in table {}", self.name))
    }

    /// Returns an empty row for the table with every column set to its
    /// default value.
    pub fn default_row(&self) -> Row {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.default.clone().unwrap_or(Value::Null)))
            .collect()
    }

    /// Validates a row against the schema, coercing values to the column
    /// datatypes. The row must contain exactly the table's columns, and is
    /// returned in schema column order.
    pub fn validate_row(&self, mut row: Row, strict: bool) -> Result<Row> {
        if let Some(name) = row.keys().find(|name| !self.columns.iter().any(|c| &c.name == *name))
        {
            return errdata!("unknown column {name} in table {}", self.name);
        }
        let mut validated = Row::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = row.swap_remove(&column.name).unwrap_or(Value::Null);
            let value = value.coerce(column.datatype, strict)?;
            if value.is_null() && !column.nullable {
                return errdata!("column {} cannot be null", column.name);
            }
            validated.insert(column.name.clone(), value);
        }
        Ok(validated)
    }

    /// Generates a CREATE TABLE statement for the table.
    pub fn to_sql(&self) -> String {
        format!(
            "CREATE TABLE {} (\n{}\n)",
            format_ident(&self.name),
            self.columns.iter().map(|c| format!("  {}", c.to_sql())).join(",\n")
        )
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl Column {
    /// Creates a nullable column with no constraints.
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            primary_key: false,
            nullable: true,
            default: None,
            unique: false,
            auto_increment: false,
        }
    }

    /// Generates the column definition of a CREATE TABLE statement.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", format_ident(&self.name), self.datatype);
        if self.primary_key {
            sql += " PRIMARY KEY";
        }
        if !self.nullable && !self.primary_key {
            sql += " NOT NULL";
        }
        if let Some(default) = &self.default {
            sql += &format!(" DEFAULT {}", default.to_sql());
        }
        if self.unique && !self.primary_key {
            sql += " UNIQUE";
        }
        if self.auto_increment {
            sql += " AUTO_INCREMENT";
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn users() -> Table {
        Table {
            name: "users".into(),
            columns: vec![
                Column {
                    primary_key: true,
                    nullable: false,
                    auto_increment: true,
                    ..Column::new("id", DataType::Integer)
                },
                Column { nullable: false, ..Column::new("name", DataType::String) },
                Column {
                    default: Some(Value::Integer(0)),
                    ..Column::new("age", DataType::Integer)
                },
            ],
        }
    }

    #[test]
    fn validate() {
        assert_eq!(users().validate(), Ok(()));

        let mut table = users();
        table.columns[1].primary_key = true;
        assert_eq!(table.validate().map_err(|e| e.kind()), Err(ErrorKind::InvalidData));

        let mut table = users();
        table.columns[1].auto_increment = true;
        assert!(table.validate().is_err());

        let mut table = users();
        table.columns.push(Column::new("age", DataType::Float));
        assert!(table.validate().is_err());
    }

    #[test]
    fn validate_row() {
        let table = users();
        let row: Row =
            [("name".to_string(), Value::from("ann")), ("id".to_string(), Value::Integer(1))]
                .into_iter()
                .collect();
        let row = table.validate_row(row, true).expect("valid row");
        assert_eq!(row.keys().collect_vec(), vec!["id", "name", "age"]);
        assert_eq!(row["age"], Value::Null);

        let row: Row = [("id".to_string(), Value::Integer(1))].into_iter().collect();
        assert!(table.validate_row(row, true).is_err(), "name is not nullable");

        let row: Row =
            [("id".to_string(), Value::Integer(1)), ("nope".to_string(), Value::Integer(1))]
                .into_iter()
                .collect();
        assert!(table.validate_row(row, true).is_err(), "unknown column");
    }

    #[test]
    fn to_sql() {
        assert_eq!(
            users().to_sql(),
            "CREATE TABLE users (\n  \
               id INTEGER PRIMARY KEY AUTO_INCREMENT,\n  \
               name STRING NOT NULL,\n  \
               age INTEGER DEFAULT 0\n)"
        );
    }
}
