//! The SQL engine: parsing, execution, and the statement processor that ties
//! them together.

pub mod execution;
pub mod parser;
pub mod processor;
pub mod types;

pub use parser::{Parser, ast};
pub use processor::process;
pub use types::{Dataset, Row, Value};
