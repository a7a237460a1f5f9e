//! Helpers shared by unit tests.

use std::str::FromStr;

use common::config::AppConfig;
use common::models::{ConnectionConfig, DbType};
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::AnyPool;

use crate::dialect::Dialect;

pub fn sqlite_memory() -> ConnectionConfig {
    ConnectionConfig {
        db_type: "sqlite".into(),
        dbname: ":memory:".into(),
        user: "installer".into(),
        pass: "installer".into(),
        host: "localhost".into(),
        driver: "sqlite".into(),
    }
}

/// Config with both connections on separate in-memory sqlite databases.
pub fn memory_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.db.default = Some(sqlite_memory());
    config.db.logserver = Some(sqlite_memory());
    config
}

pub async fn memory_pool() -> (AnyPool, Dialect) {
    sqlx::any::install_default_drivers();
    let options = AnyConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    (pool, Dialect::new(DbType::SQLite))
}
