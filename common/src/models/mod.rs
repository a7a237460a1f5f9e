//! Shared data models.

pub mod connection;
pub mod entity;
pub mod log;
pub mod lookup;
pub mod user;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DbType};
pub use entity::{Column, ColumnType, Entity, KeyKind, SqlValue, TableSchema};
pub use log::LogSession;
pub use lookup::{PermissionRecord, UserStatusTypeRecord};
pub use user::{Role, RolePermission, User, UserDetail, UserRole, UserStatus};
