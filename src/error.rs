/// dbmock errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Invalid data, typically a value of the wrong type or a violated
    /// constraint when writing a row.
    InvalidData(String),
    /// Invalid user input, typically parser or query errors.
    InvalidInput(String),
    /// An IO error.
    IO(String),
    /// The statement is valid SQL, but the mock does not support it.
    NotImplemented(String),
    /// The statement could not be parsed. Carries the underlying parser error
    /// kind and message along with the full SQL text, so that a failing test
    /// can be diagnosed from the error alone.
    ParseFailure { kind: ErrorKind, message: String, sql: String },
}

/// The kind of an error, without its payload. Allows callers to tell errors
/// apart without matching on the full enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidData,
    InvalidInput,
    IO,
    NotImplemented,
    ParseFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::IO(msg) => write!(f, "io error: {msg}"),
            Error::NotImplemented(msg) => write!(f, "not implemented: {msg}"),
            Error::ParseFailure { kind, message, sql } => {
                write!(f, "DB Mock {kind} error: {message} in SQL query: {sql}")
            }
        }
    }
}

impl Error {
    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidData(_) => ErrorKind::InvalidData,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::IO(_) => ErrorKind::IO,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::ParseFailure { .. } => ErrorKind::ParseFailure,
        }
    }

    /// Returns the error message, without the kind prefix added by Display.
    pub fn message(&self) -> String {
        match self {
            Error::InvalidData(msg)
            | Error::InvalidInput(msg)
            | Error::IO(msg)
            | Error::NotImplemented(msg) => msg.clone(),
            Error::ParseFailure { .. } => self.to_string(),
        }
    }

    /// Wraps a parser error as a ParseFailure for the given SQL text.
    pub fn parse_failure(error: Error, sql: &str) -> Error {
        Error::ParseFailure { kind: error.kind(), message: error.message(), sql: sql.to_string() }
    }
}

/// Constructs an Error::InvalidData for the given format string.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => { $crate::error::Error::InvalidData(format!($($args)*)).into() };
}

/// Constructs an Error::InvalidInput for the given format string.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => { $crate::error::Error::InvalidInput(format!($($args)*)).into() };
}

/// Constructs an Error::NotImplemented for the given format string.
#[macro_export]
macro_rules! errnotimpl {
    ($($args:tt)*) => { $crate::error::Error::NotImplemented(format!($($args)*)).into() };
}

/// A dbmock Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<log::ParseLevelError> for Error {
    fn from(err: log::ParseLevelError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for Error {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::IO(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_failure_embeds_context() {
        let inner = Error::InvalidInput("unexpected end of input".into());
        let error = Error::parse_failure(inner, "SELECT 1 FROM");
        assert_eq!(error.kind(), ErrorKind::ParseFailure);
        assert_eq!(
            error.to_string(),
            "DB Mock InvalidInput error: unexpected end of input in SQL query: SELECT 1 FROM"
        );
    }

    #[test]
    fn macros() {
        let result: Result<()> = errnotimpl!("unhandled {}", "thing");
        assert_eq!(result, Err(Error::NotImplemented("unhandled thing".into())));
        let error: Error = errinput!("bad {}", 1);
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }
}
