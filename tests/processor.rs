//! Tests for the statement processor's contract: classification, parse error
//! wrapping, and result normalization.

#![warn(clippy::all)]

use std::sync::Arc;

use dbmock::error::{Error, ErrorKind, Result};
use dbmock::sql::processor::process;
use dbmock::{Config, Connection, Server};
use pretty_assertions::assert_eq;

fn connection() -> Result<Connection> {
    let server = Arc::new(Server::new("test", Config::default()));
    server.load_schema("app", "CREATE TABLE t (id INT PRIMARY KEY)")?;
    Ok(Server::connect(&server, "app"))
}

#[test]
fn begin_is_noop() -> Result<()> {
    let conn = connection()?;
    assert_eq!(process("BEGIN", &conn)?, (Vec::new(), 0));
    // No-ops are never parsed, so trailing garbage is ignored.
    assert_eq!(process("begin ) garbage (", &conn)?, (Vec::new(), 0));
    Ok(())
}

#[test]
fn rollback_fails() -> Result<()> {
    let conn = connection()?;
    let error = process("ROLLBACK", &conn).expect_err("rollback should fail");
    assert_eq!(error.kind(), ErrorKind::NotImplemented);
    assert!(error.to_string().contains("Transactions are not yet supported"));
    Ok(())
}

#[test]
fn malformed_select_fails_with_sql() -> Result<()> {
    let conn = connection()?;
    let error = process("SELECT 1 FROM", &conn).expect_err("parse should fail");
    assert_eq!(error.kind(), ErrorKind::ParseFailure);
    assert!(error.to_string().contains("SELECT 1 FROM"), "{error}");
    assert_eq!(
        error.to_string(),
        "DB Mock InvalidInput error: unexpected end of input in SQL query: SELECT 1 FROM"
    );
    Ok(())
}

#[test]
fn empty_input_fails_to_parse() -> Result<()> {
    let conn = connection()?;
    for sql in ["", " \t\n"] {
        let error = process(sql, &conn).expect_err("parse should fail");
        let Error::ParseFailure { sql: text, .. } = &error else {
            panic!("expected parse failure, got {error}");
        };
        assert_eq!(text, sql);
    }
    Ok(())
}

#[test]
fn insert_returns_count() -> Result<()> {
    let conn = connection()?;
    assert_eq!(process("INSERT INTO t VALUES (1)", &conn)?, (Vec::new(), 1));
    Ok(())
}

#[test]
fn select_returns_rows() -> Result<()> {
    let conn = connection()?;
    process("INSERT INTO t VALUES (1), (2)", &conn)?;
    let (rows, count) = process("SELECT * FROM t", &conn)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(count, 0);
    assert_eq!(conn.query("SELECT * FROM t")?.into_rows(), rows);
    Ok(())
}

#[test]
fn classification_is_repeatable() -> Result<()> {
    let conn = connection()?;
    for sql in ["COMMIT", "SET x = 1", "SELECT 1"] {
        assert_eq!(process(sql, &conn)?, process(sql, &conn)?);
    }
    let kind = |sql: &str| process(sql, &conn).map_err(|e| e.kind());
    for sql in ["ROLLBACK", "SELEC 1"] {
        assert_eq!(kind(sql), kind(sql));
    }
    Ok(())
}
