//! First administrator.
//!
//! Creates the admin user, its profile and status, the admin role granted every
//! permission, and the user→role link. The whole sequence runs in one
//! transaction and is skipped when the admin user name already exists.

use std::collections::HashMap;

use chrono::{Months, Utc};

use common::config::AdminSettings;
use common::enums::{LookupEnum, Permission, UserStatusType};
use common::errors::{AppError, AppResult};
use common::models::{Entity, Role, RolePermission, User, UserDetail, UserRole, UserStatus};
use common::utils::hash_password;

use crate::migration::ModelCatalog;
use crate::registry::ConnectionHandle;
use crate::users::UserManagementService;

/// Age given to the seeded admin's date of birth.
const ADMIN_AGE_MONTHS: u32 = 30 * 12;

/// Models the admin seed writes, all inside one transaction.
pub const SEEDED_MODELS: [&str; 6] = [
    User::MODEL,
    UserDetail::MODEL,
    UserStatus::MODEL,
    Role::MODEL,
    RolePermission::MODEL,
    UserRole::MODEL,
];

/// Connection the admin seed runs on.
///
/// # Errors
/// `AppError::ModelRouting` when the seeded models are routed to different
/// connections, since one transaction cannot span them.
pub fn seed_connection<'a>(
    catalog: &'a ModelCatalog,
    overrides: &'a HashMap<String, String>,
) -> AppResult<&'a str> {
    let target = catalog.connection_for(User::MODEL, overrides)?;
    for model in &SEEDED_MODELS[1..] {
        let connection = catalog.connection_for(model, overrides)?;
        if connection != target {
            return Err(AppError::ModelRouting(format!(
                "{} is routed to '{}' but {} is routed to '{}'; \
                 admin records must share one connection",
                model,
                connection,
                User::MODEL,
                target
            )));
        }
    }
    Ok(target)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminSeedOutcome {
    AlreadyPresent {
        user_id: Option<i64>,
    },
    Created {
        user_id: i64,
        role_id: i64,
        permissions: usize,
    },
}

pub struct AdminSeeder<'a> {
    handle: &'a ConnectionHandle,
    settings: &'a AdminSettings,
}

impl<'a> AdminSeeder<'a> {
    pub fn new(handle: &'a ConnectionHandle, settings: &'a AdminSettings) -> Self {
        Self { handle, settings }
    }

    pub async fn seed(&self) -> AppResult<AdminSeedOutcome> {
        let service = UserManagementService::new(self.handle.dialect());
        let mut tx = self.handle.pool().begin().await?;

        if let Some(existing) = service
            .get_user_by_user_name(&mut tx, &self.settings.user_name)
            .await?
        {
            tracing::info!(
                user_name = %self.settings.user_name,
                "Admin user already present, skipping"
            );
            tx.rollback().await?;
            return Ok(AdminSeedOutcome::AlreadyPresent {
                user_id: existing.id,
            });
        }

        let now = Utc::now();
        let today = now.date_naive();

        let mut user = User {
            id: None,
            user_name: self.settings.user_name.clone(),
            email: self.settings.email.clone(),
            password: hash_password(&self.settings.password).await?,
            registration_date: now,
            approved: true,
            active: true,
        };
        let user_id = service.insert_user(&mut tx, &mut user).await?;

        let mut detail = UserDetail {
            id: None,
            user_id,
            first_name: self.settings.first_name.clone(),
            last_name: self.settings.last_name.clone(),
            date_of_birth: today
                .checked_sub_months(Months::new(ADMIN_AGE_MONTHS))
                .unwrap_or(today),
        };
        service.insert_user_details(&mut tx, &mut detail).await?;

        let mut status = UserStatus {
            id: None,
            user_id,
            user_status_type_id: UserStatusType::Active.value(),
            date_from: now,
            message: Some(self.settings.status_message.clone()),
        };
        service.insert_user_status(&mut tx, &mut status).await?;

        let mut role = Role {
            id: None,
            name: self.settings.role_name.clone(),
            active: true,
            protected: true,
            weight: 0,
        };
        let role_id = service.insert_role(&mut tx, &mut role).await?;

        let grants = self.handle.mapper::<RolePermission>();
        for permission in Permission::members() {
            let existing = grants
                .first(
                    &mut tx,
                    &[
                        ("permission_id", permission.value().into()),
                        ("role_id", role_id.into()),
                    ],
                )
                .await?;
            let mut grant = existing.unwrap_or(RolePermission {
                id: None,
                role_id,
                permission_id: permission.value(),
                protected: true,
            });
            grant.protected = true;
            grants.save(&mut tx, &mut grant).await?;
        }

        let links = self.handle.mapper::<UserRole>();
        let mut link = links
            .first(&mut tx, &[("user_id", user_id.into()), ("role_id", role_id.into())])
            .await?
            .unwrap_or(UserRole {
                id: None,
                user_id,
                role_id,
            });
        links.save(&mut tx, &mut link).await?;

        tx.commit().await?;

        let permissions = Permission::members().len();
        tracing::info!(
            user_id,
            role_id,
            permissions,
            user_name = %self.settings.user_name,
            "Admin user and role seeded"
        );
        Ok(AdminSeedOutcome::Created {
            user_id,
            role_id,
            permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{DependencyResolver, MigrationRunner, UserManagementResolver};
    use crate::registry::ConnectionRegistry;
    use crate::test_support::memory_config;
    use common::utils::verify_password;

    async fn migrated() -> ConnectionRegistry {
        let registry = ConnectionRegistry::connect(&memory_config()).await.unwrap();
        let catalog = ModelCatalog::standard();
        let overrides = HashMap::new();
        MigrationRunner::new(&registry, &catalog, &overrides)
            .migrate_entities(UserManagementResolver.resolve())
            .await
            .unwrap();
        registry
    }

    async fn count<E: Entity>(handle: &ConnectionHandle) -> i64 {
        let mut conn = handle.pool().acquire().await.unwrap();
        handle.mapper::<E>().count(&mut conn, &[]).await.unwrap()
    }

    #[tokio::test]
    async fn test_seeds_admin_once() {
        let registry = migrated().await;
        let handle = registry.default_connection().unwrap();
        let settings = AdminSettings::default();
        let seeder = AdminSeeder::new(handle, &settings);

        let first = seeder.seed().await.unwrap();
        let AdminSeedOutcome::Created {
            user_id,
            permissions,
            ..
        } = first
        else {
            panic!("expected a fresh admin, got {first:?}");
        };
        assert_eq!(permissions, 7);

        let second = seeder.seed().await.unwrap();
        assert_eq!(
            second,
            AdminSeedOutcome::AlreadyPresent {
                user_id: Some(user_id)
            }
        );

        assert_eq!(count::<User>(handle).await, 1);
        assert_eq!(count::<UserDetail>(handle).await, 1);
        assert_eq!(count::<UserStatus>(handle).await, 1);
        assert_eq!(count::<Role>(handle).await, 1);
        assert_eq!(count::<RolePermission>(handle).await, 7);
        assert_eq!(count::<UserRole>(handle).await, 1);
    }

    #[tokio::test]
    async fn test_seeded_records_carry_admin_identity() {
        let registry = migrated().await;
        let handle = registry.default_connection().unwrap();
        let settings = AdminSettings::default();
        AdminSeeder::new(handle, &settings).seed().await.unwrap();

        let mut conn = handle.pool().acquire().await.unwrap();
        let user = UserManagementService::new(handle.dialect())
            .get_user_by_user_name(&mut conn, "backslash")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(user.password, "123456");
        assert!(verify_password("123456", &user.password).await.unwrap());

        let user_id = user.id.unwrap();
        let detail = handle
            .mapper::<UserDetail>()
            .first(&mut conn, &[("user_id", user_id.into())])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.first_name, "Michael");
        assert_eq!(detail.last_name, "James");

        let status = handle
            .mapper::<UserStatus>()
            .first(&mut conn, &[("user_id", user_id.into())])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.user_status_type_id, UserStatusType::Active.value());
        assert_eq!(status.message.as_deref(), Some("New Backslash User"));

        let role = handle
            .mapper::<Role>()
            .first(&mut conn, &[("name", "Backslash Admin".into())])
            .await
            .unwrap()
            .unwrap();
        assert!(role.protected);
        for permission in Permission::members() {
            let granted = handle
                .mapper::<RolePermission>()
                .count(
                    &mut conn,
                    &[
                        ("role_id", role.id.unwrap().into()),
                        ("permission_id", permission.value().into()),
                    ],
                )
                .await
                .unwrap();
            assert_eq!(granted, 1, "{permission:?} not granted");
        }
    }

    #[test]
    fn test_seed_connection_follows_overrides() {
        let catalog = ModelCatalog::standard();

        let none = HashMap::new();
        assert_eq!(seed_connection(&catalog, &none).unwrap(), "default");

        let all: HashMap<String, String> = SEEDED_MODELS
            .iter()
            .map(|m| (m.to_string(), "logserver".to_string()))
            .collect();
        assert_eq!(seed_connection(&catalog, &all).unwrap(), "logserver");

        let split = HashMap::from([(Role::MODEL.to_string(), "logserver".to_string())]);
        assert!(matches!(
            seed_connection(&catalog, &split),
            Err(AppError::ModelRouting(msg)) if msg.starts_with("Role is routed to 'logserver'")
        ));
    }

    #[tokio::test]
    async fn test_failure_rolls_back_everything() {
        let registry = ConnectionRegistry::connect(&memory_config()).await.unwrap();
        let handle = registry.default_connection().unwrap();
        let catalog = ModelCatalog::standard();
        let overrides = HashMap::new();
        // user_roles is left out so the final step fails
        let mut models = UserManagementResolver.resolve();
        models.remove(UserRole::MODEL);
        MigrationRunner::new(&registry, &catalog, &overrides)
            .migrate_entities(models)
            .await
            .unwrap();

        let settings = AdminSettings::default();
        assert!(AdminSeeder::new(handle, &settings).seed().await.is_err());

        assert_eq!(count::<User>(handle).await, 0);
        assert_eq!(count::<Role>(handle).await, 0);
        assert_eq!(count::<RolePermission>(handle).await, 0);
    }
}
