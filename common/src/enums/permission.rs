//! Permission codes.

use super::{caption, LookupEnum};
use crate::models::PermissionRecord;

/// Permissions grantable to roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Permission {
    ViewUsers = 1,
    ManageUsers = 2,
    ViewRoles = 3,
    ManageRoles = 4,
    ManagePermissions = 5,
    ViewLogs = 6,
    ManageSettings = 7,
}

const MEMBERS: [Permission; 7] = [
    Permission::ViewUsers,
    Permission::ManageUsers,
    Permission::ViewRoles,
    Permission::ManageRoles,
    Permission::ManagePermissions,
    Permission::ViewLogs,
    Permission::ManageSettings,
];

impl LookupEnum for Permission {
    type Model = PermissionRecord;

    const NAME: &'static str = "Permission";

    fn members() -> &'static [Self] {
        &MEMBERS
    }

    fn key(self) -> &'static str {
        match self {
            Permission::ViewUsers => "ViewUsers",
            Permission::ManageUsers => "ManageUsers",
            Permission::ViewRoles => "ViewRoles",
            Permission::ManageRoles => "ManageRoles",
            Permission::ManagePermissions => "ManagePermissions",
            Permission::ViewLogs => "ViewLogs",
            Permission::ManageSettings => "ManageSettings",
        }
    }

    fn value(self) -> i64 {
        self as i64
    }

    fn build_record(self, existing: Option<PermissionRecord>) -> PermissionRecord {
        let mut record = existing.unwrap_or_else(|| PermissionRecord {
            id: self.value(),
            name: String::new(),
            caption: String::new(),
        });
        record.name = self.key().to_string();
        record.caption = caption(self.key());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_unique_and_ordered() {
        let values: Vec<i64> = Permission::members().iter().map(|p| p.value()).collect();
        assert_eq!(values, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_build_record_refreshes_existing_caption() {
        let stale = PermissionRecord {
            id: 2,
            name: "ManageUsers".into(),
            caption: "old".into(),
        };
        let record = Permission::ManageUsers.build_record(Some(stale));
        assert_eq!(record.id, 2);
        assert_eq!(record.caption, "Manage Users");
    }
}
