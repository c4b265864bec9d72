use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    ArticleChanges, ArticleId, ArticleRow, NewArticle, NewUser, Result, StoreError, UserId,
    UserRow,
    store::{ArticleStore, UserStore},
};

/// PostgreSQL-backed storage.
///
/// Every round-trip is bounded by `query_timeout`; a statement that does
/// not finish in time fails with `StoreError::Timeout`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Connects a pool whose checkout is bounded by the same timeout as queries.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        query_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(query_timeout)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool, query_timeout))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn bounded<T, F>(&self, operation: &'static str, query: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(result) => result.map_err(map_database_error),
            Err(_) => {
                tracing::warn!(operation, timeout = ?self.query_timeout, "query timed out");
                Err(StoreError::Timeout {
                    operation,
                    after: self.query_timeout,
                })
            }
        }
    }

    fn row_to_user(row: PgRow) -> Result<UserRow> {
        Ok(UserRow {
            user_id: UserId::new(row.try_get("user_id")?),
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_article(row: PgRow) -> Result<ArticleRow> {
        Ok(ArticleRow {
            article_id: ArticleId::new(row.try_get("article_id")?),
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            user_id: UserId::new(row.try_get("user_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

fn map_database_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::UniqueViolation {
            constraint: db_err.constraint().unwrap_or_default().to_string(),
        };
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRow> {
        let user_id: i64 = self
            .bounded(
                "insert_user",
                sqlx::query_scalar(
                    r#"
                    INSERT INTO users (username, password_hash, created_at)
                    VALUES ($1, $2, $3)
                    RETURNING user_id
                    "#,
                )
                .bind(&user.username)
                .bind(&user.password_hash)
                .bind(user.created_at)
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(UserRow {
            user_id: UserId::new(user_id),
            username: user.username,
            password_hash: user.password_hash,
            created_at: user.created_at,
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        let row: Option<PgRow> = self
            .bounded(
                "find_user_by_username",
                sqlx::query(
                    r#"
                    SELECT user_id, username, password_hash, created_at
                    FROM users
                    WHERE username = $1
                    "#,
                )
                .bind(username)
                .fetch_optional(&self.pool),
            )
            .await?;

        row.map(Self::row_to_user).transpose()
    }
}

#[async_trait]
impl ArticleStore for PostgresStore {
    async fn insert_article(&self, article: NewArticle) -> Result<ArticleRow> {
        let article_id: i64 = self
            .bounded(
                "insert_article",
                sqlx::query_scalar(
                    r#"
                    INSERT INTO articles (title, content, user_id, created_at)
                    VALUES ($1, $2, $3, $4)
                    RETURNING article_id
                    "#,
                )
                .bind(&article.title)
                .bind(&article.content)
                .bind(article.user_id.as_i64())
                .bind(article.created_at)
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(ArticleRow {
            article_id: ArticleId::new(article_id),
            title: article.title,
            content: article.content,
            user_id: article.user_id,
            created_at: article.created_at,
        })
    }

    async fn find_article(&self, article_id: ArticleId) -> Result<Option<ArticleRow>> {
        let row: Option<PgRow> = self
            .bounded(
                "find_article",
                sqlx::query(
                    r#"
                    SELECT article_id, title, content, user_id, created_at
                    FROM articles
                    WHERE article_id = $1
                    "#,
                )
                .bind(article_id.as_i64())
                .fetch_optional(&self.pool),
            )
            .await?;

        row.map(Self::row_to_article).transpose()
    }

    async fn update_article(
        &self,
        article_id: ArticleId,
        owner: UserId,
        changes: &ArticleChanges,
    ) -> Result<u64> {
        let result = self
            .bounded(
                "update_article",
                sqlx::query(
                    r#"
                    UPDATE articles
                    SET title = $1, content = $2
                    WHERE article_id = $3 AND user_id = $4
                    "#,
                )
                .bind(&changes.title)
                .bind(&changes.content)
                .bind(article_id.as_i64())
                .bind(owner.as_i64())
                .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_article(&self, article_id: ArticleId, owner: UserId) -> Result<u64> {
        let result = self
            .bounded(
                "delete_article",
                sqlx::query("DELETE FROM articles WHERE article_id = $1 AND user_id = $2")
                    .bind(article_id.as_i64())
                    .bind(owner.as_i64())
                    .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_articles(
        &self,
        owner: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ArticleRow>> {
        let rows = self
            .bounded(
                "list_articles",
                sqlx::query(
                    r#"
                    SELECT article_id, title, content, user_id, created_at
                    FROM articles
                    WHERE user_id = $1
                    ORDER BY article_id ASC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(owner.as_i64())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool),
            )
            .await?;

        rows.into_iter().map(Self::row_to_article).collect()
    }
}
