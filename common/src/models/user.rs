//! User-management models.
//!
//! Users, their profile details and status history, roles, and the link
//! records granting permissions to roles and roles to users.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;

use super::entity::{
    get_bool, get_date, get_datetime, Column, ColumnType, Entity, KeyKind, SqlValue, TableSchema,
};

static USERS: TableSchema = TableSchema {
    table: "users",
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    columns: &[
        Column::new("user_name", ColumnType::Text),
        Column::new("email", ColumnType::Text),
        Column::new("password", ColumnType::Text),
        Column::new("registration_date", ColumnType::Timestamp),
        Column::new("approved", ColumnType::Bool),
        Column::new("active", ColumnType::Bool),
    ],
};

/// Application user account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub user_name: String,
    pub email: String,
    /// Argon2 PHC hash, never the clear-text password.
    pub password: String,
    pub registration_date: DateTime<Utc>,
    pub approved: bool,
    pub active: bool,
}

impl Entity for User {
    const MODEL: &'static str = "User";

    fn schema() -> &'static TableSchema {
        &USERS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.user_name.as_str().into(),
            self.email.as_str().into(),
            self.password.as_str().into(),
            self.registration_date.into(),
            self.approved.into(),
            self.active.into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            user_name: row.try_get("user_name")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            registration_date: get_datetime(row, "registration_date")?,
            approved: get_bool(row, "approved")?,
            active: get_bool(row, "active")?,
        })
    }
}

static USER_DETAILS: TableSchema = TableSchema {
    table: "user_details",
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    columns: &[
        Column::new("user_id", ColumnType::BigInt),
        Column::new("first_name", ColumnType::Text),
        Column::new("last_name", ColumnType::Text),
        Column::new("date_of_birth", ColumnType::Date),
    ],
};

/// Profile details of a user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDetail {
    pub id: Option<i64>,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
}

impl Entity for UserDetail {
    const MODEL: &'static str = "UserDetail";

    fn schema() -> &'static TableSchema {
        &USER_DETAILS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.user_id.into(),
            self.first_name.as_str().into(),
            self.last_name.as_str().into(),
            self.date_of_birth.into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            user_id: row.try_get("user_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            date_of_birth: get_date(row, "date_of_birth")?,
        })
    }
}

static USER_STATUSES: TableSchema = TableSchema {
    table: "user_statuses",
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    columns: &[
        Column::new("user_id", ColumnType::BigInt),
        Column::new("user_status_type_id", ColumnType::BigInt),
        Column::new("date_from", ColumnType::Timestamp),
        Column::nullable("message", ColumnType::Text),
    ],
};

/// One entry of a user's status history.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStatus {
    pub id: Option<i64>,
    pub user_id: i64,
    pub user_status_type_id: i64,
    pub date_from: DateTime<Utc>,
    pub message: Option<String>,
}

impl Entity for UserStatus {
    const MODEL: &'static str = "UserStatus";

    fn schema() -> &'static TableSchema {
        &USER_STATUSES
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.user_id.into(),
            self.user_status_type_id.into(),
            self.date_from.into(),
            self.message.clone().into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            user_id: row.try_get("user_id")?,
            user_status_type_id: row.try_get("user_status_type_id")?,
            date_from: get_datetime(row, "date_from")?,
            message: row.try_get("message")?,
        })
    }
}

static ROLES: TableSchema = TableSchema {
    table: "roles",
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    columns: &[
        Column::new("name", ColumnType::Text),
        Column::new("active", ColumnType::Bool),
        Column::new("protected", ColumnType::Bool),
        Column::new("weight", ColumnType::BigInt),
    ],
};

/// Named set of permissions.
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub id: Option<i64>,
    pub name: String,
    pub active: bool,
    /// Protected roles cannot be edited or removed from the UI.
    pub protected: bool,
    pub weight: i64,
}

impl Entity for Role {
    const MODEL: &'static str = "Role";

    fn schema() -> &'static TableSchema {
        &ROLES
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.as_str().into(),
            self.active.into(),
            self.protected.into(),
            self.weight.into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            active: get_bool(row, "active")?,
            protected: get_bool(row, "protected")?,
            weight: row.try_get("weight")?,
        })
    }
}

static ROLE_PERMISSIONS: TableSchema = TableSchema {
    table: "role_permissions",
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    columns: &[
        Column::new("role_id", ColumnType::BigInt),
        Column::new("permission_id", ColumnType::BigInt),
        Column::new("protected", ColumnType::Bool),
    ],
};

/// Grant of one permission to one role, unique per (role_id, permission_id).
#[derive(Debug, Clone, PartialEq)]
pub struct RolePermission {
    pub id: Option<i64>,
    pub role_id: i64,
    pub permission_id: i64,
    pub protected: bool,
}

impl Entity for RolePermission {
    const MODEL: &'static str = "RolePermission";

    fn schema() -> &'static TableSchema {
        &ROLE_PERMISSIONS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.role_id.into(),
            self.permission_id.into(),
            self.protected.into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            role_id: row.try_get("role_id")?,
            permission_id: row.try_get("permission_id")?,
            protected: get_bool(row, "protected")?,
        })
    }
}

static USER_ROLES: TableSchema = TableSchema {
    table: "user_roles",
    key: "id",
    key_kind: KeyKind::AutoIncrement,
    columns: &[
        Column::new("user_id", ColumnType::BigInt),
        Column::new("role_id", ColumnType::BigInt),
    ],
};

/// Membership of a user in a role, unique per (user_id, role_id).
#[derive(Debug, Clone, PartialEq)]
pub struct UserRole {
    pub id: Option<i64>,
    pub user_id: i64,
    pub role_id: i64,
}

impl Entity for UserRole {
    const MODEL: &'static str = "UserRole";

    fn schema() -> &'static TableSchema {
        &USER_ROLES
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.user_id.into(), self.role_id.into()]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            user_id: row.try_get("user_id")?,
            role_id: row.try_get("role_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_follow_declared_columns() {
        let link = RolePermission {
            id: None,
            role_id: 7,
            permission_id: 3,
            protected: true,
        };
        let schema = RolePermission::schema();
        assert_eq!(link.values().len(), schema.columns.len());
        assert_eq!(link.values()[1], SqlValue::Int(Some(3)));
    }

    #[test]
    fn test_every_user_schema_uses_generated_keys() {
        for schema in [
            User::schema(),
            UserDetail::schema(),
            UserStatus::schema(),
            Role::schema(),
            RolePermission::schema(),
            UserRole::schema(),
        ] {
            assert_eq!(schema.key_kind, KeyKind::AutoIncrement, "{}", schema.table);
        }
    }
}
