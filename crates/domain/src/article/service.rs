//! Article service providing CRUD with ownership checks.

use common::{ArticleId, UserId};
use store::{ArticleChanges, ArticleStore, NewArticle};

use crate::error::{ErrorCode, ServiceError};

use super::{Article, ArticlePatch, MAX_PAGE_SIZE, PageRequest};

/// Service for managing articles.
///
/// Edits and deletes are only allowed for the owning user. The ownership
/// predicate is checked up front and again by the mutating statement, so
/// an article that changes hands or disappears in between is reported as
/// not found rather than silently skipped.
pub struct ArticleService<S: ArticleStore> {
    store: S,
}

impl<S: ArticleStore> ArticleService<S> {
    /// Creates a new article service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an article owned by `user_id`.
    #[tracing::instrument(skip(self, content))]
    pub async fn create(
        &self,
        title: &str,
        content: &str,
        user_id: UserId,
    ) -> Result<Article, ServiceError> {
        if title.is_empty() {
            return Err(ErrorCode::TitleEmpty.into());
        }
        if content.is_empty() {
            return Err(ErrorCode::ContentEmpty.into());
        }

        let row = self
            .store
            .insert_article(NewArticle {
                title: title.to_string(),
                content: content.to_string(),
                user_id,
                created_at: chrono::Utc::now().timestamp(),
            })
            .await
            .map_err(|e| ServiceError::storage(ErrorCode::CreateFailed, e))?;

        metrics::counter!("articles_created_total").increment(1);
        Ok(row.into())
    }

    /// Loads an article by ID.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, article_id: ArticleId) -> Result<Article, ServiceError> {
        self.store
            .find_article(article_id)
            .await
            .map_err(|e| ServiceError::storage(ErrorCode::ServerError, e))?
            .map(Article::from)
            .ok_or_else(|| ErrorCode::ArticleNotFound.into())
    }

    /// Applies a patch to an article owned by `user_id`.
    ///
    /// If the patch leaves title and content as they are, the stored
    /// article is returned without writing.
    #[tracing::instrument(skip(self, patch))]
    pub async fn edit(
        &self,
        article_id: ArticleId,
        patch: ArticlePatch,
        user_id: UserId,
    ) -> Result<Article, ServiceError> {
        let article = self.view(article_id).await?;
        if article.user_id != user_id {
            return Err(ErrorCode::PermissionDenied.into());
        }

        let title = resolve(patch.title, &article.title, ErrorCode::TitleEmpty)?;
        let content = resolve(patch.content, &article.content, ErrorCode::ContentEmpty)?;
        if title == article.title && content == article.content {
            return Ok(article);
        }

        let changes = ArticleChanges { title, content };
        let affected = self
            .store
            .update_article(article_id, user_id, &changes)
            .await
            .map_err(|e| ServiceError::storage(ErrorCode::EditFailed, e))?;
        if affected == 0 {
            return Err(ErrorCode::ArticleNotFound.into());
        }

        metrics::counter!("articles_edited_total").increment(1);
        Ok(Article {
            title: changes.title,
            content: changes.content,
            ..article
        })
    }

    /// Deletes an article owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, article_id: ArticleId, user_id: UserId) -> Result<(), ServiceError> {
        let article = self.view(article_id).await?;
        if article.user_id != user_id {
            return Err(ErrorCode::PermissionDenied.into());
        }

        let affected = self
            .store
            .delete_article(article_id, user_id)
            .await
            .map_err(|e| ServiceError::storage(ErrorCode::DeleteFailed, e))?;
        if affected == 0 {
            return Err(ErrorCode::ArticleNotFound.into());
        }

        metrics::counter!("articles_deleted_total").increment(1);
        Ok(())
    }

    /// Lists one page of the articles owned by `user_id`, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Vec<Article>, ServiceError> {
        if page.size > MAX_PAGE_SIZE {
            return Err(ErrorCode::PageSizeTooBig.into());
        }
        if page.size < 1 {
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .list_articles(user_id, page.offset(), page.size)
            .await
            .map_err(|e| ServiceError::storage(ErrorCode::ServerError, e))?;

        Ok(rows.into_iter().map(Article::from).collect())
    }
}

fn resolve(
    requested: Option<String>,
    current: &str,
    empty_code: ErrorCode,
) -> Result<String, ServiceError> {
    match requested {
        None => Ok(current.to_string()),
        Some(value) if value.is_empty() => Err(empty_code.into()),
        Some(value) => Ok(value),
    }
}
