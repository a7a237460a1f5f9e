//! Error types shared by the installer.

use thiserror::Error;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Installer error taxonomy.
///
/// Every variant is fatal to the current install/migrate run.
#[derive(Debug, Error)]
pub enum AppError {
    /// A whole named connection section is absent from the configuration.
    #[error("{connection} database parameters are not defined in config file")]
    MissingConnection { connection: String },

    /// A required connection parameter is absent or empty.
    #[error("{connection} database parameter '{field}' is not defined in config file")]
    Configuration { connection: String, field: String },

    /// The configured backend or driver is not supported.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// The configuration file could not be read or parsed.
    #[error("config file error: {0}")]
    ConfigFile(String),

    /// A lookup enum is registered inconsistently.
    #[error("enum configuration error: {0}")]
    EnumConfiguration(String),

    /// A resolver yielded a model the catalog does not know.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// The `models` overrides route models to connections that cannot serve them.
    #[error("model routing error: {0}")]
    ModelRouting(String),

    /// No connection is registered under the requested name.
    #[error("connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    #[error("database query error: {0}")]
    DatabaseQuery(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl AppError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingConnection { .. } | AppError::Configuration { .. } => {
                "CONFIGURATION_ERROR"
            }
            AppError::UnsupportedDatabaseType(_) => "UNSUPPORTED_DATABASE_TYPE",
            AppError::ConfigFile(_) => "CONFIG_FILE_ERROR",
            AppError::EnumConfiguration(_) => "ENUM_CONFIGURATION_ERROR",
            AppError::UnknownModel(_) => "UNKNOWN_MODEL",
            AppError::ModelRouting(_) => "MODEL_ROUTING_ERROR",
            AppError::ConnectionNotFound(_) => "CONNECTION_NOT_FOUND",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::PasswordHash(_) => "PASSWORD_HASH_ERROR",
        }
    }

    /// Builds a configuration error for `field` of the `connection` section.
    pub fn configuration(connection: impl Into<String>, field: impl Into<String>) -> Self {
        AppError::Configuration {
            connection: connection.into(),
            field: field.into(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseQuery(e.to_string())
    }
}
