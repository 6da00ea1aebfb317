//! Server configuration.

use serde::Deserialize;

use crate::error::Result;

/// Mock server configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Config {
    /// If true, statements against tables without a loaded schema fail. If
    /// false, such tables are created schemaless on first write.
    pub strict_schema: bool,
    /// If true, values that don't match a column's datatype are rejected
    /// instead of converted, like MySQL's STRICT_ALL_TABLES mode.
    pub strict_sql: bool,
    /// The log level, used by the shell binary.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self { strict_schema: false, strict_sql: false, log_level: "info".to_string() }
    }
}

impl Config {
    /// Loads the configuration from defaults, then the given file if any
    /// (format by extension), then DBMOCK_ environment variables.
    pub fn load(file: Option<&str>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("strict_schema", defaults.strict_schema)?
            .set_default("strict_sql", defaults.strict_sql)?
            .set_default("log_level", defaults.log_level)?;
        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file));
        }
        Ok(builder
            .add_source(config::Environment::with_prefix("DBMOCK"))
            .build()?
            .try_deserialize()?)
    }

    /// Returns a strict configuration, which rejects unknown tables and
    /// mismatched values.
    pub fn strict() -> Self {
        Self { strict_schema: true, strict_sql: true, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn load_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("dbmock-config-{}.toml", std::process::id()));
        std::fs::write(&path, "strict_sql = true\nlog_level = \"debug\"\n")?;
        let config = Config::load(path.to_str());
        std::fs::remove_file(&path)?;
        assert_eq!(
            config?,
            Config { strict_schema: false, strict_sql: true, log_level: "debug".into() }
        );
        Ok(())
    }

    #[test]
    fn load_missing_file() {
        assert!(Config::load(Some("/nonexistent/dbmock.toml")).is_err());
    }
}
