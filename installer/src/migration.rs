//! Entity migrations.
//!
//! Resolvers name the models to migrate; the model catalog says which table
//! each one owns and which connection it lives on.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use common::config::{DEFAULT_CONNECTION, LOGSERVER_CONNECTION};
use common::errors::{AppError, AppResult};
use common::models::{
    Entity, LogSession, PermissionRecord, Role, RolePermission, TableSchema, User, UserDetail,
    UserRole, UserStatus, UserStatusTypeRecord,
};

use crate::mapper::{migrate_table, TableChange};
use crate::registry::{ConnectionHandle, ConnectionRegistry};

/// Base model name that resolvers may report but which owns no table.
pub const BASE_MODEL: &str = "BaseModel";

/// Yields the model names a component needs migrated.
pub trait DependencyResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self) -> BTreeSet<String>;
}

/// Models of the user-management component.
pub struct UserManagementResolver;

impl DependencyResolver for UserManagementResolver {
    fn name(&self) -> &'static str {
        "user-management"
    }

    fn resolve(&self) -> BTreeSet<String> {
        [
            User::MODEL,
            UserDetail::MODEL,
            UserStatus::MODEL,
            UserStatusTypeRecord::MODEL,
            Role::MODEL,
            PermissionRecord::MODEL,
            RolePermission::MODEL,
            UserRole::MODEL,
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

/// Models stored on the log server.
pub struct LogServerResolver;

impl DependencyResolver for LogServerResolver {
    fn name(&self) -> &'static str {
        "logserver"
    }

    fn resolve(&self) -> BTreeSet<String> {
        BTreeSet::from([LogSession::MODEL.to_string()])
    }
}

/// Catalog entry for one model.
#[derive(Debug, Clone, Copy)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub schema: &'static TableSchema,
    /// Target connection; `None` means `default`.
    pub database: Option<&'static str>,
}

/// Model identifier → table schema and target connection.
#[derive(Debug, Default)]
pub struct ModelCatalog {
    models: BTreeMap<&'static str, ModelDescriptor>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `E` on `database`, or on `default` when `None`.
    pub fn register<E: Entity>(mut self, database: Option<&'static str>) -> Self {
        self.models.insert(
            E::MODEL,
            ModelDescriptor {
                name: E::MODEL,
                schema: E::schema(),
                database,
            },
        );
        self
    }

    /// Every model shipped with the installer.
    pub fn standard() -> Self {
        Self::new()
            .register::<User>(None)
            .register::<UserDetail>(None)
            .register::<UserStatus>(None)
            .register::<UserStatusTypeRecord>(None)
            .register::<Role>(None)
            .register::<PermissionRecord>(None)
            .register::<RolePermission>(None)
            .register::<UserRole>(None)
            .register::<LogSession>(Some(LOGSERVER_CONNECTION))
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Connection `name` lives on: config override, then catalog, then `default`.
    pub fn connection_for<'a>(
        &'a self,
        name: &str,
        overrides: &'a HashMap<String, String>,
    ) -> AppResult<&'a str> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| AppError::UnknownModel(name.to_string()))?;
        Ok(overrides
            .get(name)
            .map(String::as_str)
            .or(descriptor.database)
            .unwrap_or(DEFAULT_CONNECTION))
    }

    /// Rejects overrides naming unknown models or connections outside `connections`.
    pub fn check_overrides(
        &self,
        overrides: &HashMap<String, String>,
        connections: &[&str],
    ) -> AppResult<()> {
        let mut sorted: Vec<_> = overrides.iter().collect();
        sorted.sort();
        for (model, connection) in sorted {
            if !self.contains(model) {
                return Err(AppError::UnknownModel(model.clone()));
            }
            if !connections.contains(&connection.as_str()) {
                return Err(AppError::ConnectionNotFound(connection.clone()));
            }
        }
        Ok(())
    }
}

/// Outcome of a migration run, by model name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub created: Vec<String>,
    pub altered: Vec<String>,
    pub unchanged: Vec<String>,
}

impl MigrationReport {
    pub fn total(&self) -> usize {
        self.created.len() + self.altered.len() + self.unchanged.len()
    }
}

/// Applies model migrations on their target connections.
pub struct MigrationRunner<'a> {
    registry: &'a ConnectionRegistry,
    catalog: &'a ModelCatalog,
    overrides: &'a HashMap<String, String>,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(
        registry: &'a ConnectionRegistry,
        catalog: &'a ModelCatalog,
        overrides: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            registry,
            catalog,
            overrides,
        }
    }

    /// Connection a model migrates on.
    pub fn target_connection(&self, model: &str) -> AppResult<&'a str> {
        self.catalog.connection_for(model, self.overrides)
    }

    /// Handle of the connection `model` migrates on; rows of the model are
    /// written through the same handle.
    pub fn handle_for(&self, model: &str) -> AppResult<&'a ConnectionHandle> {
        self.registry.get(self.target_connection(model)?)
    }

    /// Migrates every named model except [`BASE_MODEL`]. The first failure aborts.
    pub async fn migrate_entities(
        &self,
        mut models: BTreeSet<String>,
    ) -> AppResult<MigrationReport> {
        models.remove(BASE_MODEL);

        let mut report = MigrationReport::default();
        for name in models {
            let descriptor = self
                .catalog
                .get(&name)
                .ok_or_else(|| AppError::UnknownModel(name.clone()))?;
            let connection = self.target_connection(&name)?;
            let handle = self.registry.get(connection)?;

            let mut conn = handle.pool().acquire().await?;
            let change = migrate_table(&mut conn, handle.dialect(), descriptor.schema).await?;
            tracing::debug!(
                model = descriptor.name,
                connection,
                db_type = %handle.dialect().db_type(),
                table = descriptor.schema.table,
                change = ?change,
                "Model migrated"
            );

            match change {
                TableChange::Created => report.created.push(name),
                TableChange::Altered(columns) => {
                    tracing::info!(model = %name, columns = ?columns, "Columns added");
                    report.altered.push(name)
                }
                TableChange::Unchanged => report.unchanged.push(name),
            }
        }

        tracing::info!(
            created = report.created.len(),
            altered = report.altered.len(),
            unchanged = report.unchanged.len(),
            "Entity migration finished"
        );
        Ok(report)
    }
}
