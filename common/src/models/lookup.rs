//! Lookup table models.
//!
//! Rows of these tables mirror the members of a lookup enum; the primary key
//! is the enum's own integer value.

use sqlx::any::AnyRow;
use sqlx::Row;

use super::entity::{Column, ColumnType, Entity, KeyKind, SqlValue, TableSchema};

static PERMISSIONS: TableSchema = TableSchema {
    table: "permissions",
    key: "id",
    key_kind: KeyKind::Natural,
    columns: &[
        Column::new("name", ColumnType::Text),
        Column::new("caption", ColumnType::Text),
    ],
};

/// Stored permission code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRecord {
    pub id: i64,
    /// Enum key, e.g. `ManageUsers`.
    pub name: String,
    /// Display name, e.g. `Manage Users`.
    pub caption: String,
}

impl Entity for PermissionRecord {
    const MODEL: &'static str = "Permission";

    fn schema() -> &'static TableSchema {
        &PERMISSIONS
    }

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.as_str().into(), self.caption.as_str().into()]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            caption: row.try_get("caption")?,
        })
    }
}

static USER_STATUS_TYPES: TableSchema = TableSchema {
    table: "user_status_types",
    key: "id",
    key_kind: KeyKind::Natural,
    columns: &[
        Column::new("name", ColumnType::Text),
        Column::new("caption", ColumnType::Text),
    ],
};

/// Stored user status type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatusTypeRecord {
    pub id: i64,
    pub name: String,
    pub caption: String,
}

impl Entity for UserStatusTypeRecord {
    const MODEL: &'static str = "UserStatusType";

    fn schema() -> &'static TableSchema {
        &USER_STATUS_TYPES
    }

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.name.as_str().into(), self.caption.as_str().into()]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            caption: row.try_get("caption")?,
        })
    }
}
