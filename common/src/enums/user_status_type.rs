//! User status types.

use super::{caption, LookupEnum};
use crate::models::UserStatusTypeRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum UserStatusType {
    Active = 1,
    Pending = 2,
    Suspended = 3,
    Deleted = 4,
}

const MEMBERS: [UserStatusType; 4] = [
    UserStatusType::Active,
    UserStatusType::Pending,
    UserStatusType::Suspended,
    UserStatusType::Deleted,
];

impl LookupEnum for UserStatusType {
    type Model = UserStatusTypeRecord;

    const NAME: &'static str = "UserStatusType";

    fn members() -> &'static [Self] {
        &MEMBERS
    }

    fn key(self) -> &'static str {
        match self {
            UserStatusType::Active => "Active",
            UserStatusType::Pending => "Pending",
            UserStatusType::Suspended => "Suspended",
            UserStatusType::Deleted => "Deleted",
        }
    }

    fn value(self) -> i64 {
        self as i64
    }

    fn build_record(self, existing: Option<UserStatusTypeRecord>) -> UserStatusTypeRecord {
        let mut record = existing.unwrap_or_else(|| UserStatusTypeRecord {
            id: self.value(),
            name: String::new(),
            caption: String::new(),
        });
        record.name = self.key().to_string();
        record.caption = caption(self.key());
        record
    }
}
