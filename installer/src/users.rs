//! User-management operations.
//!
//! Thin create/read calls over the data mapper. Each takes the connection it
//! runs on, so callers decide whether they run inside a transaction.

use sqlx::AnyConnection;

use common::errors::AppResult;
use common::models::{Role, User, UserDetail, UserStatus};

use crate::dialect::Dialect;
use crate::mapper::Mapper;

pub struct UserManagementService {
    dialect: Dialect,
}

impl UserManagementService {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub async fn get_user_by_user_name(
        &self,
        conn: &mut AnyConnection,
        user_name: &str,
    ) -> AppResult<Option<User>> {
        Mapper::<User>::new(self.dialect)
            .first(conn, &[("user_name", user_name.into())])
            .await
    }

    /// Inserts a user; the password must already be hashed.
    pub async fn insert_user(&self, conn: &mut AnyConnection, user: &mut User) -> AppResult<i64> {
        let id = Mapper::<User>::new(self.dialect).insert(conn, user).await?;
        tracing::info!(user_id = id, user_name = %user.user_name, "User created");
        Ok(id)
    }

    pub async fn insert_user_details(
        &self,
        conn: &mut AnyConnection,
        detail: &mut UserDetail,
    ) -> AppResult<i64> {
        Mapper::<UserDetail>::new(self.dialect).insert(conn, detail).await
    }

    pub async fn insert_user_status(
        &self,
        conn: &mut AnyConnection,
        status: &mut UserStatus,
    ) -> AppResult<i64> {
        Mapper::<UserStatus>::new(self.dialect).insert(conn, status).await
    }

    pub async fn insert_role(&self, conn: &mut AnyConnection, role: &mut Role) -> AppResult<i64> {
        let id = Mapper::<Role>::new(self.dialect).insert(conn, role).await?;
        tracing::info!(role_id = id, role = %role.name, "Role created");
        Ok(id)
    }
}
