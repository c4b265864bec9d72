use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    ArticleChanges, ArticleId, ArticleRow, NewArticle, NewUser, Result, StoreError, UserId,
    UserRow,
    store::{ArticleStore, UserStore},
};

#[derive(Default)]
struct Tables {
    users: Vec<UserRow>,
    articles: BTreeMap<ArticleId, ArticleRow>,
    last_user_id: i64,
    last_article_id: i64,
}

/// In-memory storage for testing and local runs.
///
/// Clones share the same tables, so one instance can back both services
/// the way a connection pool would.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored users.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Returns the number of stored articles.
    pub async fn article_count(&self) -> usize {
        self.tables.read().await.articles.len()
    }

    /// Clears all users and articles. Keys are not reused.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.users.clear();
        tables.articles.clear();
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRow> {
        let mut tables = self.tables.write().await;

        // Unique constraint simulation
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation {
                constraint: "users_username_key".to_string(),
            });
        }

        tables.last_user_id += 1;
        let row = UserRow {
            user_id: UserId::new(tables.last_user_id),
            username: user.username,
            password_hash: user.password_hash,
            created_at: user.created_at,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn insert_article(&self, article: NewArticle) -> Result<ArticleRow> {
        let mut tables = self.tables.write().await;
        tables.last_article_id += 1;
        let row = ArticleRow {
            article_id: ArticleId::new(tables.last_article_id),
            title: article.title,
            content: article.content,
            user_id: article.user_id,
            created_at: article.created_at,
        };
        tables.articles.insert(row.article_id, row.clone());
        Ok(row)
    }

    async fn find_article(&self, article_id: ArticleId) -> Result<Option<ArticleRow>> {
        Ok(self.tables.read().await.articles.get(&article_id).cloned())
    }

    async fn update_article(
        &self,
        article_id: ArticleId,
        owner: UserId,
        changes: &ArticleChanges,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        match tables.articles.get_mut(&article_id) {
            Some(row) if row.user_id == owner => {
                row.title.clone_from(&changes.title);
                row.content.clone_from(&changes.content);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_article(&self, article_id: ArticleId, owner: UserId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .articles
            .get(&article_id)
            .is_some_and(|row| row.user_id == owner);
        if owned {
            tables.articles.remove(&article_id);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn list_articles(
        &self,
        owner: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ArticleRow>> {
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        let tables = self.tables.read().await;
        Ok(tables
            .articles
            .values()
            .filter(|row| row.user_id == owner)
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }
}
