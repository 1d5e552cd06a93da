use std::{path::Path, str::FromStr, time::Duration};

use dotenvy::dotenv;
use sqlx::sqlite::SqliteConnectOptions;

use crate::{Error, Result};

/// Environment variable holding the database URL.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Environment variable toggling automatic table creation.
pub const AUTO_CREATE_TABLES_VAR: &str = "MINI_ORM_AUTO_CREATE_TABLES";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// An sqlx SQLite URL, e.g. `sqlite://data.db?mode=rwc`. Treated as opaque by the engine.
    pub database_url: String,
    /// Create a missing table on the first `persist` of its entity type.
    pub auto_create_tables: bool,
    /// How long a statement waits for a locked database before giving up.
    pub busy_timeout: Duration,
}

impl EngineConfig {
    pub fn new(database_url: impl Into<String>, auto_create_tables: bool) -> Self {
        Self {
            database_url: database_url.into(),
            auto_create_tables,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Configuration for a database file at `path`, created on first connect if missing.
    pub fn for_database_file(path: impl AsRef<Path>) -> Self {
        Self::new(
            format!("sqlite://{}?mode=rwc", path.as_ref().display()),
            true,
        )
    }

    /// Read the configuration from the `DATABASE_URL` and `MINI_ORM_AUTO_CREATE_TABLES`
    /// environment variables, or from a corresponding `.env` file.
    ///
    /// # Errors
    ///
    /// If `DATABASE_URL` is missing or not UTF-8, or the auto-create flag is not a boolean.
    pub fn from_env() -> Result<Self> {
        let Some(database_url) = database_url() else {
            return Err(Error::configuration(format!(
                "missing database URL, set the `{DATABASE_URL_VAR}` environment variable"
            )));
        };

        let auto_create_tables = match std::env::var(AUTO_CREATE_TABLES_VAR) {
            Ok(value) => parse_flag(&value)?,
            Err(std::env::VarError::NotPresent) => true,
            Err(e) => {
                return Err(Error::configuration(format!(
                    "`{AUTO_CREATE_TABLES_VAR}` is unreadable: {e}"
                )));
            }
        };

        Ok(Self::new(database_url, auto_create_tables))
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Parse the URL into sqlx connect options.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the URL is not an SQLite URL or names an in-memory database,
    /// [`Error::Database`] if sqlx rejects it.
    pub fn connect_options(&self) -> Result<SqliteConnectOptions> {
        if !self.database_url.to_lowercase().starts_with("sqlite:") {
            return Err(Error::configuration(format!(
                "`{}` is not an SQLite database URL",
                self.database_url
            )));
        }

        if is_in_memory(&self.database_url) {
            return Err(Error::configuration(format!(
                "`{}` is an in-memory database, which does not outlive a single operation; use a database file instead",
                self.database_url
            )));
        }

        Ok(SqliteConnectOptions::from_str(&self.database_url)?.busy_timeout(self.busy_timeout))
    }
}

/// Attempt to retrieve the database URL from the `DATABASE_URL` environment variable, or from a
/// corresponding `.env` file.
#[must_use]
pub fn database_url() -> Option<String> {
    let _ = dotenv();

    std::env::var(DATABASE_URL_VAR).ok()
}

/// Every operation opens its own connection, and an in-memory database lives only as long as
/// the connection that created it.
fn is_in_memory(database_url: &str) -> bool {
    let url = database_url.to_lowercase();

    url.contains(":memory:")
        || url
            .split_once('?')
            .is_some_and(|(_, params)| params.split('&').any(|e| e == "mode=memory"))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(Error::configuration(format!(
            "`{AUTO_CREATE_TABLES_VAR}` must be a boolean, got `{other}`"
        ))),
    }
}
