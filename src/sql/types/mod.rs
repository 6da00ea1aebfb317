//! SQL data types, values, rows, and table schemas.

pub mod schema;
mod value;

pub use value::{DataType, Dataset, Row, Value};
