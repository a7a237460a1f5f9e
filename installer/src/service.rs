//! 安装服务模块
//!
//! 按顺序执行：实体迁移 → 枚举表初始化 → 管理员账户初始化。

use std::collections::BTreeSet;

use async_trait::async_trait;

use common::config::{AppConfig, DEFAULT_CONNECTION, LOGSERVER_CONNECTION};
use common::errors::AppResult;

use crate::admin_seeder::{seed_connection, AdminSeedOutcome, AdminSeeder};
use crate::enum_seeder::EnumRegistry;
use crate::migration::{
    DependencyResolver, LogServerResolver, MigrationReport, MigrationRunner, ModelCatalog,
    UserManagementResolver,
};
use crate::registry::{ConnectionHandle, ConnectionRegistry};

/// 一次完整安装的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub migration: MigrationReport,
    pub enum_rows: usize,
    pub admin: AdminSeedOutcome,
}

/// 安装服务 Trait
#[async_trait]
pub trait InstallerTrait: Send + Sync {
    /// 完整安装
    async fn install(&self) -> AppResult<InstallReport>;

    /// 迁移所有解析器声明的实体
    async fn migrate(&self) -> AppResult<MigrationReport>;

    /// 迁移指定实体
    async fn migrate_entities(&self, models: BTreeSet<String>) -> AppResult<MigrationReport>;

    /// 按名称获取连接
    fn connection(&self, name: &str) -> AppResult<&ConnectionHandle>;
}

/// 安装程序
pub struct Installer {
    config: AppConfig,
    registry: ConnectionRegistry,
    catalog: ModelCatalog,
    enums: EnumRegistry,
    resolvers: Vec<Box<dyn DependencyResolver>>,
}

impl Installer {
    /// 校验配置、模型路由与枚举注册后建立连接；任何写入之前失败
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let catalog = ModelCatalog::standard();
        let enums = EnumRegistry::standard();
        enums.validate(&catalog)?;

        // models 覆盖只能指向已知模型与已配置的连接
        catalog.check_overrides(&config.models, &[DEFAULT_CONNECTION, LOGSERVER_CONNECTION])?;
        seed_connection(&catalog, &config.models)?;

        let registry = ConnectionRegistry::connect(&config).await?;
        Ok(Self::from_parts(config, registry, catalog, enums)
            .add_resolver(UserManagementResolver)
            .add_resolver(LogServerResolver))
    }

    /// 由已构建的组件组装，不附带解析器
    pub fn from_parts(
        config: AppConfig,
        registry: ConnectionRegistry,
        catalog: ModelCatalog,
        enums: EnumRegistry,
    ) -> Self {
        Self {
            config,
            registry,
            catalog,
            enums,
            resolvers: Vec::new(),
        }
    }

    pub fn add_resolver(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// 按模型选择连接：配置覆盖 → 模型声明 → `default`
    fn router(&self) -> MigrationRunner<'_> {
        MigrationRunner::new(&self.registry, &self.catalog, &self.config.models)
    }

    /// 所有解析器声明的实体并集
    pub fn resolve_models(&self) -> BTreeSet<String> {
        let mut models = BTreeSet::new();
        for resolver in &self.resolvers {
            let resolved = resolver.resolve();
            tracing::debug!(
                resolver = resolver.name(),
                models = resolved.len(),
                "Dependencies resolved"
            );
            models.extend(resolved);
        }
        models
    }
}

#[async_trait]
impl InstallerTrait for Installer {
    async fn install(&self) -> AppResult<InstallReport> {
        let migration = self.migrate().await?;

        let router = self.router();
        let enum_rows = self.enums.seed_all(&router).await?;

        let admin_handle = self
            .registry
            .get(seed_connection(&self.catalog, &self.config.models)?)?;
        let admin = AdminSeeder::new(admin_handle, &self.config.admin).seed().await?;

        tracing::info!(
            migrated = migration.total(),
            enum_rows,
            "Installation complete"
        );
        Ok(InstallReport {
            migration,
            enum_rows,
            admin,
        })
    }

    async fn migrate(&self) -> AppResult<MigrationReport> {
        self.migrate_entities(self.resolve_models()).await
    }

    async fn migrate_entities(&self, models: BTreeSet<String>) -> AppResult<MigrationReport> {
        self.router().migrate_entities(models).await
    }

    fn connection(&self, name: &str) -> AppResult<&ConnectionHandle> {
        self.registry.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_seeder::SEEDED_MODELS;
    use crate::test_support::{memory_config, sqlite_memory};
    use common::errors::AppError;
    use common::models::{Entity, LogSession, PermissionRecord, User, UserStatusTypeRecord};
    use uuid::Uuid;

    async fn table_count(handle: &ConnectionHandle, table: Option<&str>) -> i64 {
        let sql = match table {
            Some(_) => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            None => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
        };
        let mut query = sqlx::query_scalar::<sqlx::Any, i64>(sql);
        if let Some(table) = table {
            query = query.bind(table.to_string());
        }
        query.fetch_one(handle.pool()).await.unwrap()
    }

    async fn count<E: Entity>(installer: &Installer, connection: &str) -> i64 {
        let handle = installer.connection(connection).unwrap();
        let mut conn = handle.pool().acquire().await.unwrap();
        handle.mapper::<E>().count(&mut conn, &[]).await.unwrap()
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let installer = Installer::new(memory_config()).await.unwrap();

        let first = installer.install().await.unwrap();
        assert_eq!(first.migration.created.len(), 9);
        assert_eq!(first.enum_rows, 11);
        assert!(matches!(first.admin, AdminSeedOutcome::Created { .. }));

        let second = installer.install().await.unwrap();
        assert!(second.migration.created.is_empty());
        assert_eq!(second.migration.unchanged.len(), 9);
        assert!(matches!(second.admin, AdminSeedOutcome::AlreadyPresent { .. }));

        assert_eq!(count::<User>(&installer, DEFAULT_CONNECTION).await, 1);
        assert_eq!(count::<PermissionRecord>(&installer, DEFAULT_CONNECTION).await, 7);
        assert_eq!(count::<UserStatusTypeRecord>(&installer, DEFAULT_CONNECTION).await, 4);
        assert_eq!(count::<LogSession>(&installer, LOGSERVER_CONNECTION).await, 0);
    }

    #[tokio::test]
    async fn test_resolvers_are_unioned() {
        let installer = Installer::new(memory_config()).await.unwrap();
        let models = installer.resolve_models();
        assert_eq!(models.len(), 9);
        assert!(models.contains("LogSession"));
        assert!(models.contains("User"));
    }

    #[tokio::test]
    async fn test_missing_logserver_host_fails_before_writes() {
        let mut config = memory_config();
        if let Some(logserver) = config.db.logserver.as_mut() {
            logserver.host.clear();
        }
        let err = Installer::new(config).await.err().unwrap();
        assert!(matches!(
            err,
            AppError::Configuration { ref connection, ref field }
                if connection == "logserver" && field == "host"
        ));
    }

    #[tokio::test]
    async fn test_migrate_only_skips_seeding() {
        let installer = Installer::new(memory_config()).await.unwrap();
        installer.migrate().await.unwrap();
        assert_eq!(count::<User>(&installer, DEFAULT_CONNECTION).await, 0);
        assert_eq!(count::<PermissionRecord>(&installer, DEFAULT_CONNECTION).await, 0);
    }

    #[tokio::test]
    async fn test_rerouted_lookup_model_is_seeded_on_its_connection() {
        let mut config = memory_config();
        config
            .models
            .insert(PermissionRecord::MODEL.to_string(), LOGSERVER_CONNECTION.to_string());
        let installer = Installer::new(config).await.unwrap();

        installer.install().await.unwrap();
        assert_eq!(count::<PermissionRecord>(&installer, LOGSERVER_CONNECTION).await, 7);
        let default = installer.connection(DEFAULT_CONNECTION).unwrap();
        assert_eq!(table_count(default, Some("permissions")).await, 0);
    }

    #[tokio::test]
    async fn test_rerouted_admin_models_are_seeded_on_their_connection() {
        let mut config = memory_config();
        for model in SEEDED_MODELS {
            config
                .models
                .insert(model.to_string(), LOGSERVER_CONNECTION.to_string());
        }
        let installer = Installer::new(config).await.unwrap();

        let report = installer.install().await.unwrap();
        assert!(matches!(report.admin, AdminSeedOutcome::Created { .. }));
        assert_eq!(count::<User>(&installer, LOGSERVER_CONNECTION).await, 1);
        let default = installer.connection(DEFAULT_CONNECTION).unwrap();
        assert_eq!(table_count(default, Some("users")).await, 0);
    }

    #[tokio::test]
    async fn test_split_admin_models_are_rejected() {
        let mut config = memory_config();
        config.models.insert("UserRole".to_string(), LOGSERVER_CONNECTION.to_string());
        let err = Installer::new(config).await.err().unwrap();
        assert!(matches!(err, AppError::ModelRouting(_)));
    }

    #[tokio::test]
    async fn test_bad_override_fails_before_any_table_is_written() {
        let path = std::env::temp_dir().join(format!("installer-{}.db", Uuid::new_v4()));
        let mut config = memory_config();
        let mut default = sqlite_memory();
        default.dbname = path.to_string_lossy().into_owned();
        config.db.default = Some(default);

        let mut bad = config.clone();
        bad.models.insert("Role".to_string(), "reporting".to_string());
        let err = Installer::new(bad).await.err().unwrap();
        assert!(matches!(err, AppError::ConnectionNotFound(ref name) if name == "reporting"));

        let mut unknown = config.clone();
        unknown
            .models
            .insert("Invoice".to_string(), DEFAULT_CONNECTION.to_string());
        let err = Installer::new(unknown).await.err().unwrap();
        assert!(matches!(err, AppError::UnknownModel(ref name) if name == "Invoice"));

        let installer = Installer::new(config).await.unwrap();
        let handle = installer.connection(DEFAULT_CONNECTION).unwrap();
        assert_eq!(table_count(handle, None).await, 0);

        drop(installer);
        let _ = std::fs::remove_file(&path);
    }
}
