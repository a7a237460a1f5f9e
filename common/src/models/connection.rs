//! Connection configuration models.
//!
//! Contains the named connection parameters and the supported backends.

use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Database type enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL database.
    MySQL,
    /// PostgreSQL database.
    Postgres,
    /// SQLite database.
    SQLite,
}

impl DbType {
    /// Whether `driver` is a sqlx driver name able to serve this backend.
    pub fn accepts_driver(&self, driver: &str) -> bool {
        let driver = driver.trim().to_lowercase();
        match self {
            DbType::MySQL => driver == "mysql",
            DbType::Postgres => driver == "postgres" || driver == "postgresql",
            DbType::SQLite => driver == "sqlite",
        }
    }
}

impl FromStr for DbType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(DbType::MySQL),
            "postgres" | "postgresql" => Ok(DbType::Postgres),
            "sqlite" => Ok(DbType::SQLite),
            other => Err(AppError::UnsupportedDatabaseType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySQL => write!(f, "mysql"),
            DbType::Postgres => write!(f, "postgres"),
            DbType::SQLite => write!(f, "sqlite"),
        }
    }
}

/// Config keys of a connection section paired with the struct field that holds them,
/// in the order they are checked.
pub const REQUIRED_FIELDS: [(&str, &str); 6] = [
    ("type", "db_type"),
    ("dbname", "dbname"),
    ("user", "user"),
    ("pass", "pass"),
    ("host", "host"),
    ("driver", "driver"),
];

/// Parameters of one named connection (`db.default`, `db.logserver`).
///
/// Every field is required; missing keys deserialize to empty strings and are
/// rejected by [`ConnectionConfig::check`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ConnectionConfig {
    /// Backend kind (`mysql`, `postgres`, `sqlite`).
    #[serde(rename = "type", default)]
    #[validate(length(min = 1))]
    pub db_type: String,
    /// Database name, or file path / `:memory:` for sqlite.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub dbname: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub user: String,
    /// Database password (not serialized).
    #[serde(default, skip_serializing)]
    #[validate(length(min = 1))]
    pub pass: String,
    /// Host, optionally with `:port`.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub host: String,
    /// sqlx driver name used to connect.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub driver: String,
}

impl ConnectionConfig {
    /// Validates the section named `connection` and resolves its backend.
    ///
    /// # Errors
    /// `AppError::Configuration` naming the first missing key, or
    /// `AppError::UnsupportedDatabaseType` when `type`/`driver` are not usable.
    pub fn check(&self, connection: &str) -> AppResult<DbType> {
        if let Err(errors) = self.validate() {
            let fields = errors.field_errors();
            let missing = REQUIRED_FIELDS
                .iter()
                .find(|(_, field)| fields.contains_key(*field))
                .map(|(key, _)| *key)
                .unwrap_or("unknown");
            return Err(AppError::configuration(connection, missing));
        }

        let db_type: DbType = self.db_type.parse()?;
        if !db_type.accepts_driver(&self.driver) {
            return Err(AppError::UnsupportedDatabaseType(format!(
                "driver '{}' cannot serve {} connection '{}'",
                self.driver, db_type, connection
            )));
        }
        Ok(db_type)
    }

    /// Builds the sqlx connection URL for an already checked config.
    ///
    /// Credentials and the database name are percent-encoded; `host` is used
    /// as given and may carry a `:port` suffix.
    pub fn connection_url(&self, db_type: DbType) -> String {
        let user = encode(&self.user);
        let pass = encode(&self.pass);
        let dbname = encode(&self.dbname);
        match db_type {
            DbType::MySQL => format!("mysql://{}:{}@{}/{}", user, pass, self.host, dbname),
            DbType::Postgres => {
                format!("postgres://{}:{}@{}/{}", user, pass, self.host, dbname)
            }
            DbType::SQLite if self.dbname == ":memory:" => "sqlite::memory:".to_string(),
            DbType::SQLite => format!("sqlite:{}?mode=rwc", self.dbname),
        }
    }
}

fn encode(part: &str) -> String {
    utf8_percent_encode(part, NON_ALPHANUMERIC).to_string()
}
