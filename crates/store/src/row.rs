//! Row types for the `users` and `articles` tables.

use common::{ArticleId, UserId};

/// A stored user, including the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

/// Values for a user insert. The key is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub created_at: i64,
}

/// A stored article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRow {
    pub article_id: ArticleId,
    pub title: String,
    pub content: String,
    pub user_id: UserId,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

/// Values for an article insert. The key is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub user_id: UserId,
    pub created_at: i64,
}

/// Replacement title and content for an article update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleChanges {
    pub title: String,
    pub content: String,
}
