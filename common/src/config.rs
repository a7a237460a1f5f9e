//! Installer configuration.
//!
//! Loaded from a JSON file (`INSTALLER_CONFIG`, default `config/installer.json`)
//! and then overridden by environment variables:
//!
//! - `DB_<CONNECTION>_<KEY>` for connection parameters, e.g. `DB_LOGSERVER_HOST`
//! - `DB_MAX_CONNECTIONS`, `DB_CONNECT_TIMEOUT_SECS` for pool sizing
//! - `ADMIN_PASSWORD` for the seeded administrator's password

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::connection::{ConnectionConfig, DbType, REQUIRED_FIELDS};

/// Name of the application connection.
pub const DEFAULT_CONNECTION: &str = "default";
/// Name of the log-server connection.
pub const LOGSERVER_CONNECTION: &str = "logserver";

const CONFIG_PATH_ENV: &str = "INSTALLER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/installer.json";

/// The `db` section: both named connections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub default: Option<ConnectionConfig>,
    #[serde(default)]
    pub logserver: Option<ConnectionConfig>,
}

impl DatabaseSettings {
    fn section_mut(&mut self, name: &str) -> Option<&mut Option<ConnectionConfig>> {
        match name {
            DEFAULT_CONNECTION => Some(&mut self.default),
            LOGSERVER_CONNECTION => Some(&mut self.logserver),
            _ => None,
        }
    }

    /// Validates both connections, in order, before anything is opened.
    ///
    /// # Errors
    /// `AppError::MissingConnection` when a section is absent, otherwise the
    /// first error reported by [`ConnectionConfig::check`].
    pub fn check(&self) -> AppResult<Vec<(&'static str, &ConnectionConfig, DbType)>> {
        let mut checked = Vec::with_capacity(2);
        for (name, section) in [
            (DEFAULT_CONNECTION, self.default.as_ref()),
            (LOGSERVER_CONNECTION, self.logserver.as_ref()),
        ] {
            let config = section.ok_or_else(|| AppError::MissingConnection {
                connection: name.to_string(),
            })?;
            let db_type = config.check(name)?;
            checked.push((name, config, db_type));
        }
        Ok(checked)
    }
}

/// Identity of the administrator created on first install.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role_name: String,
    pub status_message: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            user_name: "backslash".to_string(),
            email: "user@backslash.dev".to_string(),
            password: "123456".to_string(),
            first_name: "Michael".to_string(),
            last_name: "James".to_string(),
            role_name: "Backslash Admin".to_string(),
            status_message: "New Backslash User".to_string(),
        }
    }
}

/// Installer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db: DatabaseSettings,
    /// Model identifier → connection name, overriding the catalog's routing.
    pub models: HashMap<String, String>,
    pub admin: AdminSettings,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db: DatabaseSettings::default(),
            models: HashMap::new(),
            admin: AdminSettings::default(),
            max_connections: 5,
            connect_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Loads the config file and applies environment overrides.
    ///
    /// A missing default config file is not an error; an explicitly named one is.
    pub fn load() -> AppResult<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| AppError::ConfigFile(format!("{path}: {e}")))?;
            tracing::info!(path = %path, "Loaded config file");
            Self::from_json(&content)?
        } else if explicit.is_some() {
            return Err(AppError::ConfigFile(format!("{path}: file not found")));
        } else {
            tracing::info!(path = %path, "No config file, using environment only");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses a JSON config document.
    pub fn from_json(content: &str) -> AppResult<Self> {
        serde_json::from_str(content).map_err(|e| AppError::ConfigFile(e.to_string()))
    }

    /// Applies overrides read through `lookup` (normally the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for name in [DEFAULT_CONNECTION, LOGSERVER_CONNECTION] {
            for (key, _) in REQUIRED_FIELDS {
                let var = format!("DB_{}_{}", name.to_uppercase(), key.to_uppercase());
                let Some(value) = lookup(&var) else {
                    continue;
                };
                let Some(section) = self.db.section_mut(name) else {
                    continue;
                };
                let section = section.get_or_insert_with(ConnectionConfig::default);
                match key {
                    "type" => section.db_type = value,
                    "dbname" => section.dbname = value,
                    "user" => section.user = value,
                    "pass" => section.pass = value,
                    "host" => section.host = value,
                    _ => section.driver = value,
                }
            }
        }

        if let Some(v) = lookup("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.max_connections = v;
        }
        if let Some(v) = lookup("DB_CONNECT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.connect_timeout_secs = v;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            self.admin.password = password;
        }
    }
}
