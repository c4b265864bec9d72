use async_trait::async_trait;

use crate::{ArticleChanges, ArticleId, ArticleRow, NewArticle, NewUser, Result, UserId, UserRow};

/// Access to the `users` table.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user and returns the stored row with its assigned key.
    ///
    /// Fails with `UniqueViolation` if the username is already taken.
    async fn insert_user(&self, user: NewUser) -> Result<UserRow>;

    /// Finds a user by exact, case-sensitive username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>>;
}

/// Access to the `articles` table.
///
/// Mutations carry the owning user so that the ownership predicate is
/// part of the statement itself. They return the number of rows affected.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Inserts an article and returns the stored row with its assigned key.
    async fn insert_article(&self, article: NewArticle) -> Result<ArticleRow>;

    /// Finds an article by key.
    async fn find_article(&self, article_id: ArticleId) -> Result<Option<ArticleRow>>;

    /// Replaces title and content of an article owned by `owner`.
    async fn update_article(
        &self,
        article_id: ArticleId,
        owner: UserId,
        changes: &ArticleChanges,
    ) -> Result<u64>;

    /// Deletes an article owned by `owner`.
    async fn delete_article(&self, article_id: ArticleId, owner: UserId) -> Result<u64>;

    /// Lists articles owned by `owner`, ordered by key ascending.
    async fn list_articles(&self, owner: UserId, offset: i64, limit: i64)
    -> Result<Vec<ArticleRow>>;
}
