#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod error;
pub mod server;
pub mod sql;

pub use config::Config;
pub use connection::{Connection, QueryResult};
pub use error::{Error, ErrorKind, Result};
pub use server::Server;
