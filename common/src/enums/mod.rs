//! Lookup enumerations.
//!
//! Each enum here is mirrored one-to-one into a reference table whose primary
//! key is the member's integer value.

pub mod permission;
pub mod user_status_type;

pub use permission::Permission;
pub use user_status_type::UserStatusType;

use crate::models::Entity;

/// An in-code enumeration backed by a lookup table.
pub trait LookupEnum: Copy + Send + Sync + 'static {
    /// Record type stored for each member.
    type Model: Entity;

    /// Enum identifier used in logs and error messages.
    const NAME: &'static str;

    /// Members in canonical order.
    fn members() -> &'static [Self];

    fn key(self) -> &'static str;

    fn value(self) -> i64;

    /// Builds the record for this member, updating `existing` when the row is
    /// already stored.
    fn build_record(self, existing: Option<Self::Model>) -> Self::Model;
}

/// Turns a member key such as `ManageUsers` into `Manage Users`.
pub fn caption(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if i > 0 && ch.is_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_splits_words() {
        assert_eq!(caption("ManageUsers"), "Manage Users");
        assert_eq!(caption("Active"), "Active");
    }
}
