//! The statement processor: the entry point that takes raw SQL text, parses
//! it, and dispatches it to the appropriate executor.

use crate::connection::Connection;
use crate::errnotimpl;
use crate::error::{Error, Result};
use crate::sql::execution::Execute as _;
use crate::sql::parser::{Parser, ast};
use crate::sql::types::Dataset;

/// How a statement is handled, decided from its leading keyword alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    /// Accepted and ignored, without parsing.
    NoOp,
    /// Rejected as not implemented, with the given message.
    Unsupported(&'static str),
    /// Parsed and executed.
    Parse,
}

/// Leading keywords that are handled without parsing, matched as a whole word
/// so that e.g. SETTINGS is parsed rather than ignored. Session settings and
/// transaction boundaries have no effect on the mock, but ROLLBACK would
/// change what later reads observe, so it is rejected rather than ignored.
const SPECIAL_KEYWORDS: [(&str, Class); 4] = [
    ("SET", Class::NoOp),
    ("BEGIN", Class::NoOp),
    ("COMMIT", Class::NoOp),
    ("ROLLBACK", Class::Unsupported("Transactions are not yet supported")),
];

/// Classifies a statement by its leading keyword, ignoring case and leading
/// whitespace. The keyword must be a whole word: BEGIN WORK and COMMIT; match,
/// but SETTINGS does not.
pub fn classify(sql: &str) -> Class {
    let sql = sql.trim_start();
    for (keyword, class) in SPECIAL_KEYWORDS {
        let Some(prefix) = sql.get(..keyword.len()) else {
            continue;
        };
        let boundary = sql[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_');
        if prefix.eq_ignore_ascii_case(keyword) && boundary {
            return class;
        }
    }
    Class::Parse
}

/// Processes a single SQL statement against the connection. Returns the
/// selected rows and a zero count for queries, or no rows and the affected
/// row count for writes. No-op statements return neither.
pub fn process(sql: &str, conn: &Connection) -> Result<(Dataset, u64)> {
    match classify(sql) {
        Class::NoOp => return Ok((Vec::new(), 0)),
        Class::Unsupported(message) => return errnotimpl!("{message}"),
        Class::Parse => {}
    }

    let statement = Parser::parse(sql).map_err(|err| Error::parse_failure(err, sql))?;

    Ok(match statement {
        ast::Statement::Select(select) => (select.execute(conn)?, 0),
        ast::Statement::Insert(insert) => (Vec::new(), insert.execute(conn)?),
        ast::Statement::Update(update) => (Vec::new(), update.execute(conn)?),
        ast::Statement::Delete(delete) => (Vec::new(), delete.execute(conn)?),
        statement @ ast::Statement::CreateTable { .. } => {
            return errnotimpl!("Unhandled query type: {}", statement.kind());
        }
    })
}
