//! Users and credential checks.

mod password;
mod service;

pub use password::{Argon2Hasher, PasswordError, PasswordHasher};
pub use service::UserService;

use common::UserId;
use serde::Serialize;
use store::UserRow;

/// A registered user as seen outside the service.
///
/// The password hash never leaves `UserService`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.user_id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}
