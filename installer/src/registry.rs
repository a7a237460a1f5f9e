//! Named database connections.
//!
//! Opens the `default` and `logserver` pools from an explicit configuration
//! and hands out per-model mappers bound to the right SQL dialect.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::{AnyPool, ConnectOptions};

use common::config::{AppConfig, DEFAULT_CONNECTION};
use common::errors::{AppError, AppResult};
use common::models::{ConnectionConfig, DbType, Entity};

use crate::dialect::Dialect;
use crate::mapper::Mapper;

/// Statements slower than this are logged at WARN.
const SLOW_STATEMENT: Duration = Duration::from_secs(1);

/// A live, named connection pool.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    name: String,
    pool: AnyPool,
    dialect: Dialect,
}

impl ConnectionHandle {
    pub fn new(name: impl Into<String>, pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            name: name.into(),
            pool,
            dialect,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Mapper for `E` on this connection.
    pub fn mapper<E: Entity>(&self) -> Mapper<E> {
        Mapper::new(self.dialect)
    }
}

/// Connection handles keyed by name.
pub struct ConnectionRegistry {
    handles: HashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Validates every named connection, then opens them.
    ///
    /// Nothing is opened when any section is incomplete, so a bad config
    /// never leads to partial writes.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let checked = config.db.check()?;

        sqlx::any::install_default_drivers();

        let mut handles = HashMap::with_capacity(checked.len());
        for (name, connection, db_type) in checked {
            let pool = Self::open_pool(config, name, connection, db_type).await?;
            tracing::info!(
                connection = name,
                db_type = %db_type,
                driver = %connection.driver,
                dbname = %connection.dbname,
                "Database connection established"
            );
            handles.insert(
                name.to_string(),
                ConnectionHandle::new(name, pool, Dialect::new(db_type)),
            );
        }

        let registry = Self { handles };
        tracing::debug!(connections = ?registry.names(), "Connection registry ready");
        Ok(registry)
    }

    async fn open_pool(
        config: &AppConfig,
        name: &str,
        connection: &ConnectionConfig,
        db_type: DbType,
    ) -> AppResult<AnyPool> {
        let url = connection.connection_url(db_type);
        let options = AnyConnectOptions::from_str(&url)
            .map_err(|e| AppError::DatabaseConnection(format!("{}: {}", name, e)))?
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, SLOW_STATEMENT);

        let mut pool_options = AnyPoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));
        pool_options = match db_type {
            // An in-memory database lives only as long as its single connection.
            DbType::SQLite if connection.dbname == ":memory:" => pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
            DbType::SQLite => pool_options.max_connections(1),
            DbType::MySQL | DbType::Postgres => {
                pool_options.max_connections(config.max_connections)
            }
        };

        pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseConnection(format!("{}: {}", name, e)))
    }

    /// Returns the handle registered under `name`.
    pub fn get(&self, name: &str) -> AppResult<&ConnectionHandle> {
        self.handles
            .get(name)
            .ok_or_else(|| AppError::ConnectionNotFound(name.to_string()))
    }

    /// The application (`default`) connection.
    pub fn default_connection(&self) -> AppResult<&ConnectionHandle> {
        self.get(DEFAULT_CONNECTION)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
